//! Log subscriber setup.
//!
//! Logs go to stderr so stdout stays reserved for transcripts and JSON.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Default level for a CLI verbosity setting.
pub fn level_for(verbosity: u8, quiet: bool) -> Level {
    if quiet {
        return Level::WARN;
    }
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence when set.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "longscribe={}",
            level_for(verbosity, quiet).as_str().to_ascii_lowercase()
        ))
    });

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 2)
        .try_init();
    if let Err(e) = result {
        tracing::debug!("log subscriber already installed: {}", e);
    }
}
