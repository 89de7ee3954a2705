#![forbid(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use rotlog_core::config::{self, ClockKind, SinkConfig};
use rotlog_core::{FileRotated, RotatingFile};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "rotlog: pipe standard input into time-rotated files",
    long_about = None,
    after_help = "EXAMPLES:\n    # Hourly files with a stable alias, keep a week\n    my-server | rotlog '/var/log/app-%Y%m%d%H.log' --link /var/log/app.log \\\n        --rotation-period 1h --max-age 7d\n\n    # Options from a config file, echo input to stdout\n    my-server | rotlog --config rotlog.toml --tee"
)]
struct Cli {
    /// strftime filename pattern, e.g. `/var/log/app-%Y%m%d.log`.
    pattern: Option<String>,

    /// Read sink options from this TOML file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep a symlink at this path pointing at the active file.
    #[arg(short, long)]
    link: Option<PathBuf>,

    /// Delete rotated files older than this (e.g. `7d`, `48h`).
    #[arg(long, value_parser = humantime::parse_duration)]
    max_age: Option<Duration>,

    /// Length of each rotation window (e.g. `1h`, `1day`).
    #[arg(long, value_parser = humantime::parse_duration)]
    rotation_period: Option<Duration>,

    /// Name files using UTC instead of local time.
    #[arg(long)]
    utc: bool,

    /// Also copy every input line to standard output.
    #[arg(long)]
    tee: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Options given on the command line, as the highest-priority layer.
    fn overrides(&self) -> SinkConfig {
        SinkConfig {
            pattern: self.pattern.clone(),
            link_name: self.link.clone(),
            max_age: self.max_age,
            rotation_period: self.rotation_period,
            clock: self.utc.then_some(ClockKind::Utc),
        }
    }

    /// Command line, then `--config`, then the user config file.
    fn resolve_config(&self) -> anyhow::Result<SinkConfig> {
        let explicit = match &self.config {
            Some(path) => config::load_config(path)?,
            None => SinkConfig::default(),
        };
        let user = config::load_user_config()?;
        Ok(self.overrides().or(explicit).or(user))
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("ROTLOG_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "rotlog=debug,rotlog_core=debug,info"
        } else {
            "rotlog=info,warn"
        })
    });

    let format = env::var("ROTLOG_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // Standard output may carry `--tee` data; logs always go to stderr.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

/// Copy `input` into `sink` line by line until end of input.
///
/// Each line is handed to the sink in a single write so that concurrent
/// writers sharing the files never interleave partial lines.
fn pump(
    mut input: impl BufRead,
    sink: &RotatingFile,
    mut tee: Option<impl Write>,
) -> anyhow::Result<u64> {
    let mut line = Vec::with_capacity(4096);
    let mut lines = 0u64;
    loop {
        line.clear();
        let read = input
            .read_until(b'\n', &mut line)
            .context("Failed to read standard input")?;
        if read == 0 {
            break;
        }
        sink.write(&line)?;
        if let Some(out) = tee.as_mut() {
            out.write_all(&line).context("Failed to write standard output")?;
        }
        lines += 1;
    }
    if let Some(out) = tee.as_mut() {
        out.flush().context("Failed to flush standard output")?;
    }
    Ok(lines)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let sink = build_sink(&cli.resolve_config()?)?;
    info!(
        pattern = %sink.pattern(),
        period = %humantime::format_duration(sink.rotation_period()),
        link = ?sink.link_name(),
        max_age = ?sink.max_age(),
        "writing standard input"
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    let tee = cli.tee.then(|| stdout.lock());
    let result = pump(stdin.lock(), &sink, tee);

    sink.close()?;
    let lines = result?;
    debug!(lines, file = %sink.current_file_name(), "input closed");
    Ok(())
}

fn build_sink(cfg: &SinkConfig) -> anyhow::Result<RotatingFile> {
    let sink = cfg
        .builder()
        .and_then(|builder| {
            builder
                .handler(|event: &FileRotated| {
                    debug!(
                        previous = ?event.previous,
                        current = %event.current.display(),
                        "switched file"
                    );
                })
                .build()
        })
        .map_err(|err| {
            let hint = err.hint().map(|h| format!(" ({h})")).unwrap_or_default();
            anyhow::anyhow!("{err}{hint}")
        })?;
    Ok(sink)
}
