//! Logging configuration for medswap.
//!
//! Sets up the tracing subscriber used by the `medswap` binary.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Suppress all output except errors.
    Quiet,
    /// Warnings and errors.
    #[default]
    Normal,
    /// Informational output.
    Verbose,
    /// Everything, including storage internals.
    Trace,
}

impl Verbosity {
    /// Derive verbosity from `-q` and the number of `-v` flags.
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Trace,
        }
    }

    /// Convert verbosity to a tracing level.
    #[must_use]
    pub const fn to_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }
}

/// Initialize the logging system.
///
/// Logs go to stderr so command output on stdout stays clean. `RUST_LOG`
/// takes precedence over `verbosity`.
///
/// # Examples
///
/// ```no_run
/// use medswap::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let default_filter = format!("medswap={}", verbosity.to_level());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(false)
            .with_line_number(false),
    );

    // Ignore the error if a subscriber is already set.
    let _ = subscriber.try_init();
}
