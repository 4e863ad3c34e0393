use std::path::Path;

use color_eyre::eyre::{WrapErr, eyre};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset: `level` for this binary, warnings
/// only from the engine
fn default_filter(level: &str) -> String {
    format!("apparun={level},apparun_core=warn")
}

/// Appender writing to exactly `path`, creating its directory. Runs append
/// to the same file.
fn file_appender(path: &Path) -> color_eyre::Result<RollingFileAppender> {
    let name = path
        .file_name()
        .ok_or_else(|| eyre!("log file {} has no file name", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy())
        .build(dir)
        .wrap_err_with(|| format!("failed to open log file {}", path.display()))
}

/// Initialize logging to stderr, or to `log_file` when given.
///
/// `level` applies to this binary while the engine logs warnings only;
/// `RUST_LOG` overrides both.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> color_eyre::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));
    let registry = tracing_subscriber::registry().with(env_filter);

    match log_file {
        None => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init(),
        Some(path) => {
            let appender = file_appender(path)?;
            registry
                .with(fmt::layer().with_writer(appender).with_ansi(false))
                .init();
            tracing::info!(log_file = %path.display(), "logging initialized");
        }
    }
    Ok(())
}
