use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr, eyre};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry, fmt};

use crate::config::LoggingConfig;

/// Installs the global subscriber.
///
/// Events go to `config.file`, which is recreated on every run. With `debug`
/// set, events are also echoed to stderr and the level drops to DEBUG.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = if config.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let file = Arc::new(open_log_file(&config.file)?);
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.json {
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(file)
                .with_filter(level)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_ansi(false)
                .with_writer(file)
                .with_filter(level)
                .boxed(),
        );
    }

    if config.debug {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(level)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| eyre!("failed to set tracing subscriber: {e}"))
}

fn open_log_file(path: &Path) -> Result<File> {
    if path.exists() {
        fs::remove_file(path)
            .wrap_err_with(|| format!("failed to remove old log file {}", path.display()))?;
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    File::create(path).wrap_err_with(|| format!("failed to create log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn old_log_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run.log");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale line\n").unwrap();

        open_log_file(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
