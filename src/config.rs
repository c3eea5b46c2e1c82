use crate::session::DEFAULT_EXAM_SECONDS;
use std::path::PathBuf;
use std::time::Duration;

/// Process configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// tracing filter directive
    pub log_filter: String,
    /// Workspace to open before the first request, if any.
    pub workspace: Option<PathBuf>,
    /// Length of one attempt.
    pub exam_duration_secs: u64,
    /// Wall-clock interval between countdown ticks.
    pub tick_interval: Duration,
    pub admin_username: String,
    pub admin_password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            workspace: None,
            exam_duration_secs: DEFAULT_EXAM_SECONDS,
            tick_interval: Duration::from_millis(1000),
            admin_username: "admin".to_string(),
            admin_password: "admin".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        Self {
            log_filter: get("EXAMD_LOG").unwrap_or(default.log_filter),
            workspace: get("EXAMD_WORKSPACE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            exam_duration_secs: get("EXAMD_EXAM_SECONDS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default.exam_duration_secs),
            tick_interval: get("EXAMD_TICK_MS")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_millis)
                .unwrap_or(default.tick_interval),
            admin_username: get("EXAMD_ADMIN_USERNAME").unwrap_or(default.admin_username),
            admin_password: get("EXAMD_ADMIN_PASSWORD").unwrap_or(default.admin_password),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn unset_or_bad_values_fall_back_to_defaults() {
        let env: HashMap<&str, &str> = [("EXAMD_EXAM_SECONDS", "soon"), ("EXAMD_TICK_MS", "0")]
            .into_iter()
            .collect();
        let cfg = Config::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.exam_duration_secs, 1800);
        assert_eq!(cfg.tick_interval, Duration::from_secs(1));
        assert_eq!(cfg.admin_username, "admin");
        assert!(cfg.workspace.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let env: HashMap<&str, &str> = [
            ("EXAMD_EXAM_SECONDS", "90"),
            ("EXAMD_TICK_MS", "25"),
            ("EXAMD_WORKSPACE", "/tmp/ws"),
            ("EXAMD_ADMIN_PASSWORD", "s3cret"),
        ]
        .into_iter()
        .collect();
        let cfg = Config::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.exam_duration_secs, 90);
        assert_eq!(cfg.tick_interval, Duration::from_millis(25));
        assert_eq!(cfg.workspace, Some(PathBuf::from("/tmp/ws")));
        assert_eq!(cfg.admin_password, "s3cret");
    }
}
