use crate::error::{CliError, Result};
use std::fs::File;
use std::path::Path;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

/// Console level for the `-v` count; `-q` silences everything.
pub fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Installs the global subscriber: compact stderr output, plus a plain-text file
/// layer at full detail when `log_file` is given.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact()
        .with_filter(level_filter(verbosity, quiet));

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path).map_err(CliError::Io)?;
            Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_thread_ids(true)
                    .with_target(true)
                    .with_filter(LevelFilter::TRACE),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to install logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Once;
    use tracing::{debug, info, warn};

    static INIT: Once = Once::new();

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_filter(0, false), LevelFilter::WARN);
        assert_eq!(level_filter(1, false), LevelFilter::INFO);
        assert_eq!(level_filter(2, false), LevelFilter::DEBUG);
        assert_eq!(level_filter(7, false), LevelFilter::TRACE);
        assert_eq!(level_filter(3, true), LevelFilter::OFF);
    }

    #[test]
    #[serial]
    fn global_logger_writes_to_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("miscible.log");
        let mut installed = false;
        INIT.call_once(|| {
            setup_logging(0, false, Some(&log_path)).unwrap();
            installed = true;
        });
        if !installed {
            return;
        }

        warn!("Unknown melting point; using fallback upper temperature bound");
        info!(probes = 2, "Miscibility search finished.");
        debug!("Probed target");

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("fallback upper temperature bound"));
        assert!(content.contains("probes=2"));
        assert!(content.contains("DEBUG"));
    }

    #[test]
    #[serial]
    fn invalid_log_file_path_propagates_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = setup_logging(0, false, Some(temp_dir.path()));
        assert!(matches!(result, Err(CliError::Io(_))));
    }
}
