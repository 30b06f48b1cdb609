//! Logging initialization and configuration.
//!
//! Uses the `tracing` ecosystem with human-readable or JSON output, always on
//! stderr so stdout stays reserved for run reports.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// `level` applies to the memeforge crates; dependencies log at `warn`.
/// The RUST_LOG environment variable overrides both.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,memeforge={level},memeforge_core={level}"))
    });

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from `[logging]`, with CLI overrides.
pub fn init_from_config(
    config: &memeforge_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    init(
        &effective_level(&config.logging.level, verbose_override),
        json_logs_override || config.logging.format == "json",
    );
}

fn effective_level(configured: &str, verbose: bool) -> String {
    const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

    let configured = configured.trim().to_lowercase();
    let configured = if LEVELS.contains(&configured.as_str()) {
        configured
    } else {
        "info".to_string()
    };
    if verbose && !matches!(configured.as_str(), "debug" | "trace") {
        "debug".to_string()
    } else {
        configured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_to_debug() {
        assert_eq!(effective_level("info", true), "debug");
        assert_eq!(effective_level("trace", true), "trace");
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(effective_level("chatty", false), "info");
        assert_eq!(effective_level(" WARN ", false), "warn");
    }
}
