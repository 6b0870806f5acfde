//! Log output for the bridge: console by default, or a rolling file managed
//! by tracing-appender when a log directory is given.

use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const LOG_PREFIX: &str = "fillerup-bridge";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RotationPeriod {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl RotationPeriod {
    const NAMES: [(RotationPeriod, &'static str, &'static str); 4] = [
        (RotationPeriod::Minutely, "minutely", "minute"),
        (RotationPeriod::Hourly, "hourly", "hour"),
        (RotationPeriod::Daily, "daily", "day"),
        (RotationPeriod::Never, "never", "none"),
    ];

    fn rotation(self) -> Rotation {
        match self {
            RotationPeriod::Minutely => Rotation::MINUTELY,
            RotationPeriod::Hourly => Rotation::HOURLY,
            RotationPeriod::Daily => Rotation::DAILY,
            RotationPeriod::Never => Rotation::NEVER,
        }
    }
}

impl std::str::FromStr for RotationPeriod {
    type Err = String;

    /// Accepts `daily` or `day` style names, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase();
        Self::NAMES
            .iter()
            .find(|(_, name, short)| wanted == *name || wanted == *short)
            .map(|(period, _, _)| *period)
            .ok_or_else(|| format!("unknown log rotation '{s}', use minutely, hourly, daily or never"))
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for rolling log files; logs go to the console when unset.
    pub log_dir: Option<String>,
    pub rotation: RotationPeriod,
    /// Newest files kept in `log_dir`, 0 keeps everything.
    pub max_log_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            rotation: RotationPeriod::Daily,
            max_log_files: 7,
        }
    }
}

/// Keeps the non-blocking file writer alive; dropping it flushes pending lines.
pub struct LogGuard {
    _guard: Option<WorkerGuard>,
}

/// Installs the global subscriber, filtered by `RUST_LOG`.
pub fn setup_logging(config: &LogConfig) -> std::io::Result<LogGuard> {
    let Some(log_dir) = config.log_dir.as_deref() else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
        return Ok(LogGuard { _guard: None });
    };

    let log_dir = Path::new(log_dir);
    if config.max_log_files > 0 {
        cleanup_old_logs(log_dir, LOG_PREFIX, config.max_log_files)?;
    }

    let file_appender = RollingFileAppender::builder()
        .rotation(config.rotation.rotation())
        .filename_prefix(LOG_PREFIX)
        .filename_suffix("log")
        .max_log_files(config.max_log_files)
        .build(log_dir)
        .map_err(std::io::Error::other)?;
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = Layer::default()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(file_layer)
        .init();

    Ok(LogGuard {
        _guard: Some(guard),
    })
}

/// Bridge log files in `log_dir`, newest first.
fn bridge_logs(log_dir: &Path, prefix: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut logs = Vec::new();
    for entry in std::fs::read_dir(log_dir)?.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !(name.starts_with(prefix) && name.ends_with(".log")) {
            continue;
        }
        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            logs.push((modified, entry.path()));
        }
    }
    logs.sort_by_key(|(modified, _)| Reverse(*modified));
    Ok(logs.into_iter().map(|(_, path)| path).collect())
}

/// Keeps the `max_files` newest bridge logs. Runs before the subscriber is
/// installed, so problems go to stderr.
fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_files: usize) -> std::io::Result<()> {
    if !log_dir.is_dir() {
        return Ok(());
    }
    for stale in bridge_logs(log_dir, prefix)?.into_iter().skip(max_files) {
        if let Err(e) = std::fs::remove_file(&stale) {
            eprintln!("Could not remove stale log {}: {}", stale.display(), e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_rotation_period_from_str() {
        assert_eq!("Hourly".parse::<RotationPeriod>(), Ok(RotationPeriod::Hourly));
        assert_eq!("none".parse::<RotationPeriod>(), Ok(RotationPeriod::Never));
        assert!("weekly".parse::<RotationPeriod>().is_err());
    }

    #[test]
    fn test_cleanup_keeps_newest_bridge_logs() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path();
        let now = SystemTime::now();

        for i in 0..4u64 {
            let path = log_dir.join(format!("{LOG_PREFIX}.2026-01-0{i}.log"));
            std::fs::write(&path, "line").unwrap();
            let file = std::fs::File::options().write(true).open(&path).unwrap();
            file.set_modified(now - Duration::from_secs(3600 * (4 - i)))
                .unwrap();
        }
        std::fs::write(log_dir.join("unrelated.log"), "keep").unwrap();

        cleanup_old_logs(log_dir, LOG_PREFIX, 2).unwrap();

        let mut remaining: Vec<String> = std::fs::read_dir(log_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec![
                format!("{LOG_PREFIX}.2026-01-02.log"),
                format!("{LOG_PREFIX}.2026-01-03.log"),
                "unrelated.log".to_string(),
            ]
        );
    }

    #[test]
    fn test_rotation_names_map_to_appender_rotation() {
        assert_eq!(RotationPeriod::Minutely.rotation(), Rotation::MINUTELY);
        assert_eq!(RotationPeriod::default().rotation(), Rotation::DAILY);
        assert_eq!("DAY".parse::<RotationPeriod>(), Ok(RotationPeriod::Daily));
    }

    #[test]
    fn test_cleanup_of_missing_dir_is_noop() {
        assert!(cleanup_old_logs(Path::new("/nonexistent/logs"), LOG_PREFIX, 1).is_ok());
    }
}
