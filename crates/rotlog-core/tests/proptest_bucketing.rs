use chrono::{DateTime, FixedOffset, TimeZone};
use proptest::prelude::*;
use rotlog_core::pattern::{bucket, derive_glob, resolve};
use std::time::Duration;

const PATTERN: &str = "app-%Y%m%d%H%M%S.log";

fn instant(secs: i64, offset_hours: i32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(offset_hours * 3600)
        .expect("offset in range")
        .timestamp_opt(secs, 0)
        .single()
        .expect("unambiguous instant")
}

fn arb_period() -> impl Strategy<Value = Duration> {
    prop_oneof![
        Just(Duration::from_secs(60)),
        Just(Duration::from_secs(3600)),
        Just(Duration::from_secs(24 * 3600)),
        (1u64..=7 * 24 * 3600).prop_map(Duration::from_secs),
    ]
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(2000))]

    #[test]
    fn bucket_is_window_start(secs in 0i64..4_000_000_000, period in arb_period(), tz in -12i32..=14) {
        let now = instant(secs, tz);
        let start = bucket(&now, period);
        let period_secs = i64::try_from(period.as_secs()).expect("small period");

        prop_assert!(start <= now);
        prop_assert!(now.timestamp() - start.timestamp() < period_secs);
        prop_assert_eq!(start.timestamp().rem_euclid(period_secs), 0);
        prop_assert_eq!(start.offset(), now.offset());
    }

    #[test]
    fn same_window_same_name(secs in 0i64..4_000_000_000, period in arb_period(), step in 0u64..1_000_000) {
        let period_secs = period.as_secs();
        let now = instant(secs, 0);
        let start = bucket(&now, period).timestamp();
        let within = start + i64::try_from(step % period_secs).expect("small step");

        let a = resolve(&instant(start, 0), period, PATTERN).expect("resolve");
        let b = resolve(&instant(within, 0), period, PATTERN).expect("resolve");
        prop_assert_eq!(a, b);
    }

    #[test]
    fn distant_instants_get_different_names(secs in 0i64..4_000_000_000, period in arb_period(), windows in 1i64..100) {
        let period_secs = i64::try_from(period.as_secs()).expect("small period");
        let a = resolve(&instant(secs, 0), period, PATTERN).expect("resolve");
        let b = resolve(&instant(secs + windows * period_secs, 0), period, PATTERN).expect("resolve");
        prop_assert_ne!(a, b);
    }

    #[test]
    fn glob_has_no_directives_left(literal in "[a-z/._-]{0,12}") {
        let pattern = format!("{literal}%Y{literal}%m%d");
        let glob = derive_glob(&pattern);
        prop_assert!(!glob.contains('%'));
        prop_assert!(!glob.contains("**"));
    }
}
