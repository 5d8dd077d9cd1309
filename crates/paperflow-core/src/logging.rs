//! Logging setup: env_logger behind indicatif so log lines don't tear progress bars

use indicatif::MultiProgress;

/// Dependencies that log chattily at info level (lance, datafusion, HTTP stack)
const NOISY_TARGETS: [&str; 5] = ["lance", "datafusion", "hyper", "reqwest", "duckdb"];

fn level_label(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    }
}

fn level_color(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    }
}

/// Logger that prints through indicatif MultiProgress to avoid mixing with progress bars.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.inner.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}{}\x1b[0m] {}",
            level_color(record.level()),
            level_label(record.level()),
            record.args()
        );
        self.multi.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Default filter string: our level, noisy dependencies capped at warn
fn default_filter(level: &str) -> String {
    let mut filter = level.to_string();
    if level != "warn" && level != "error" {
        for target in NOISY_TARGETS {
            filter.push_str(&format!(",{target}=warn"));
        }
    }
    filter
}

/// Initialize logging with optional TTY mode (indicatif integration).
///
/// `RUST_LOG` overrides the computed default. Returns `false` when a
/// logger was already installed, in which case that one stays in place.
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) -> bool {
    use std::io::Write;

    let level = if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let env = env_logger::Env::default().default_filter_or(default_filter(level));

    match multi {
        Some(multi) => {
            let logger = env_logger::Builder::from_env(env).build();
            let max_level = logger.filter();
            let installed =
                log::set_boxed_logger(Box::new(IndicatifLogger::new(logger, multi.clone()))).is_ok();
            if installed {
                log::set_max_level(max_level);
            }
            installed
        }
        None => {
            // Non-TTY: no ANSI colors, timestamp for log aggregation
            env_logger::Builder::from_env(env)
                .format(|buf, record| {
                    writeln!(
                        buf,
                        "{} [{}] {}",
                        buf.timestamp_seconds(),
                        level_label(record.level()),
                        record.args()
                    )
                })
                .try_init()
                .is_ok()
        }
    }
}
