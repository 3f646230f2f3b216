//! Runtime settings for the `file-monitor` binary.
//!
//! Every setting can come from a flag or an environment variable; flags win.
//! Malformed numeric variables fall back to their defaults instead of failing.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use file_monitor::MonitorConfig;
use file_monitor::event_log::DEFAULT_MAX_LOG_SIZE;

const DEFAULT_CHECK_INTERVAL_SECS: u64 = 5;
const DEFAULT_STATS_INTERVAL_SECS: u64 = 3600;

/// Separator between entries of `IGNORE_EXTS`, the platform's path-list
/// separator.
#[cfg(unix)]
pub const LIST_SEPARATOR: char = ':';
#[cfg(not(unix))]
pub const LIST_SEPARATOR: char = ';';

/// Poll a directory tree and log every created, modified, or deleted file.
#[derive(Parser, Debug)]
#[command(name = "file-monitor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to monitor
    #[arg(long, env = "WATCH_DIR", default_value = ".")]
    pub watch_dir: PathBuf,

    /// Directory for event logs and statistics
    #[arg(long, env = "LOG_DIR", default_value = "./logs")]
    pub log_dir: PathBuf,

    /// Seconds between scans (falls back to CHECK_INTERVAL, then 5)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Rotate the event log past this many bytes (falls back to MAX_LOG_SIZE)
    #[arg(long)]
    pub max_log_size: Option<u64>,

    /// Extensions to ignore, each with its leading dot
    #[arg(
        long = "ignore-ext",
        env = "IGNORE_EXTS",
        value_delimiter = LIST_SEPARATOR,
        default_values = [".temp", ".swp"]
    )]
    pub ignore_exts: Vec<String>,

    /// Hash file contents on every scan
    #[arg(long, env = "FINGERPRINT")]
    pub fingerprint: bool,

    /// Seconds between statistics reports (falls back to STATS_INTERVAL, then 3600)
    #[arg(long)]
    pub stats_interval: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub watch_dir: PathBuf,
    pub log_dir: PathBuf,
    pub check_interval: Duration,
    pub max_log_size: u64,
    pub ignore_exts: Vec<String>,
    pub fingerprint: bool,
    pub stats_interval: Duration,
}

impl Settings {
    /// Parse the command line and read numeric fallbacks from the process
    /// environment.
    pub fn load() -> Self {
        Self::from_cli(Cli::parse(), |key| env::var(key).ok())
    }

    /// Build settings from parsed flags, resolving numeric values missing on
    /// the command line through `lookup`.
    pub fn from_cli(cli: Cli, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |flag: Option<u64>, key: &str, default: u64| {
            flag.or_else(|| lookup(key).and_then(|value| value.trim().parse().ok()))
                .unwrap_or(default)
        };

        Self {
            check_interval: Duration::from_secs(number(
                cli.interval,
                "CHECK_INTERVAL",
                DEFAULT_CHECK_INTERVAL_SECS,
            )),
            max_log_size: number(cli.max_log_size, "MAX_LOG_SIZE", DEFAULT_MAX_LOG_SIZE),
            stats_interval: Duration::from_secs(number(
                cli.stats_interval,
                "STATS_INTERVAL",
                DEFAULT_STATS_INTERVAL_SECS,
            )),
            watch_dir: cli.watch_dir,
            log_dir: cli.log_dir,
            ignore_exts: cli.ignore_exts,
            fingerprint: cli.fingerprint,
        }
    }

    /// Monitor configuration with the log directory pruned from the walk.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            root: self.watch_dir.clone(),
            poll_interval: self.check_interval,
            exclude_path: Some(self.log_dir.clone()),
            ignored_extensions: self.ignore_exts.clone(),
            fingerprints: self.fingerprint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::ffi::OsStr;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_env_bindings() {
        let command = Cli::command();
        let env_of = |id: &str| {
            command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(|arg| arg.get_env())
                .map(OsStr::to_os_string)
        };

        assert_eq!(env_of("watch_dir"), Some("WATCH_DIR".into()));
        assert_eq!(env_of("log_dir"), Some("LOG_DIR".into()));
        assert_eq!(env_of("ignore_exts"), Some("IGNORE_EXTS".into()));
        assert_eq!(env_of("fingerprint"), Some("FINGERPRINT".into()));
        assert_eq!(env_of("interval"), None);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["file-monitor"]);
        let settings = Settings::from_cli(cli, vars(&[]));

        assert_eq!(settings.watch_dir, PathBuf::from("."));
        assert_eq!(settings.log_dir, PathBuf::from("./logs"));
        assert_eq!(settings.check_interval, Duration::from_secs(5));
        assert_eq!(settings.max_log_size, DEFAULT_MAX_LOG_SIZE);
        assert_eq!(settings.ignore_exts, vec![".temp".to_string(), ".swp".to_string()]);
        assert!(!settings.fingerprint);
        assert_eq!(settings.stats_interval, Duration::from_secs(3600));
    }

    #[test]
    fn test_flags() {
        let ignore = format!(".tmp{LIST_SEPARATOR}.bak");
        let cli = Cli::parse_from([
            "file-monitor",
            "--watch-dir",
            "/srv/share",
            "--log-dir",
            "/var/log/fm",
            "--ignore-ext",
            ignore.as_str(),
            "--ignore-ext",
            ".part",
            "--fingerprint",
            "--max-log-size",
            "2048",
        ]);
        let settings = Settings::from_cli(cli, vars(&[]));

        assert_eq!(settings.watch_dir, PathBuf::from("/srv/share"));
        assert_eq!(settings.log_dir, PathBuf::from("/var/log/fm"));
        assert_eq!(
            settings.ignore_exts,
            vec![".tmp".to_string(), ".bak".to_string(), ".part".to_string()]
        );
        assert!(settings.fingerprint);
        assert_eq!(settings.max_log_size, 2048);
    }

    #[test]
    fn test_numeric_env_fallback() {
        let cli = Cli::parse_from(["file-monitor", "--interval", "2"]);
        let settings = Settings::from_cli(
            cli,
            vars(&[("CHECK_INTERVAL", "9"), ("STATS_INTERVAL", " 60 ")]),
        );

        assert_eq!(settings.check_interval, Duration::from_secs(2));
        assert_eq!(settings.stats_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_malformed_numbers_keep_defaults() {
        let cli = Cli::parse_from(["file-monitor"]);
        let settings = Settings::from_cli(
            cli,
            vars(&[
                ("CHECK_INTERVAL", "soon"),
                ("MAX_LOG_SIZE", "-1"),
                ("STATS_INTERVAL", ""),
            ]),
        );

        assert_eq!(settings.check_interval, Duration::from_secs(5));
        assert_eq!(settings.max_log_size, DEFAULT_MAX_LOG_SIZE);
        assert_eq!(settings.stats_interval, Duration::from_secs(3600));
    }

    #[test]
    fn test_monitor_config_excludes_log_dir() {
        let cli = Cli::parse_from(["file-monitor", "--watch-dir", "/data"]);
        let config = Settings::from_cli(cli, vars(&[])).monitor_config();

        assert_eq!(config.root, PathBuf::from("/data"));
        assert_eq!(config.exclude_path, Some(PathBuf::from("./logs")));
        assert_eq!(config.ignored_extensions, vec![".temp".to_string(), ".swp".to_string()]);
    }
}
