use anyhow::{Context, Result};
use flexi_logger::{Logger, LoggerHandle};

/// Map `-v` repetitions to a log level. `RUST_LOG` overrides this.
pub(crate) fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Start diagnostics on stderr. Keep the handle alive for the whole run.
pub(crate) fn init(verbose: u8) -> Result<LoggerHandle> {
    Logger::try_with_env_or_str(level_for(verbose))
        .context("Invalid log specification")?
        .log_to_stderr()
        .start()
        .context("Failed to start logger")
}
