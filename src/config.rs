//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Paging limits applied to work-item listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    /// Page size used when the caller gives none.
    pub default_page_size: u32,
    /// Upper bound for any requested page size.
    pub max_page_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

/// Server configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind.
    pub bind: String,
    /// HTTP port.
    pub port: u16,
    /// Path to the libSQL database file.
    pub db_path: PathBuf,
    pub paging: PagingConfig,
    /// Reject assignments to active users who are neither co-workers of the
    /// item's group nor members of its organization.
    pub enforce_assignee_eligibility: bool,
    /// Directory for rolling log files; stderr only when unset.
    pub log_dir: Option<PathBuf>,
    /// Attach a permissive CORS layer to the router.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            db_path: PathBuf::from("./data/yatt.db"),
            paging: PagingConfig::default(),
            enforce_assignee_eligibility: false,
            log_dir: None,
            cors_permissive: true,
        }
    }
}

impl ServerConfig {
    /// Build config from `YATT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind = lookup("YATT_BIND").unwrap_or(defaults.bind);
        let port = parse_or("YATT_PORT", lookup("YATT_PORT"), defaults.port)?;
        let db_path = lookup("YATT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let default_page_size = parse_or(
            "YATT_DEFAULT_PAGE_SIZE",
            lookup("YATT_DEFAULT_PAGE_SIZE"),
            defaults.paging.default_page_size,
        )?;
        let max_page_size = parse_or(
            "YATT_MAX_PAGE_SIZE",
            lookup("YATT_MAX_PAGE_SIZE"),
            defaults.paging.max_page_size,
        )?;
        if max_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "YATT_MAX_PAGE_SIZE".into(),
                message: "must be at least 1".into(),
            });
        }

        let enforce_assignee_eligibility = lookup("YATT_ENFORCE_ASSIGNEE_ELIGIBILITY")
            .map(|v| is_truthy(&v))
            .unwrap_or(defaults.enforce_assignee_eligibility);
        let cors_permissive = lookup("YATT_CORS_PERMISSIVE")
            .map(|v| is_truthy(&v))
            .unwrap_or(defaults.cors_permissive);

        let log_dir = lookup("YATT_LOG_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            bind,
            port,
            db_path,
            paging: PagingConfig {
                default_page_size: default_page_size.clamp(1, max_page_size),
                max_page_size,
            },
            enforce_assignee_eligibility,
            log_dir,
            cors_permissive,
        })
    }

    /// `bind:port` socket address string.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(s) => s.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_env_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.paging, PagingConfig::default());
        assert!(!config.enforce_assignee_eligibility);
        assert!(config.log_dir.is_none());
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("YATT_PORT", "9000"),
            ("YATT_MAX_PAGE_SIZE", "50"),
            ("YATT_DEFAULT_PAGE_SIZE", "25"),
            ("YATT_ENFORCE_ASSIGNEE_ELIGIBILITY", "TRUE"),
            ("YATT_LOG_DIR", "/tmp/yatt-logs"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.paging.max_page_size, 50);
        assert_eq!(config.paging.default_page_size, 25);
        assert!(config.enforce_assignee_eligibility);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/yatt-logs")));
    }

    #[test]
    fn default_page_size_is_capped_by_max() {
        let config = config_from(&[
            ("YATT_MAX_PAGE_SIZE", "20"),
            ("YATT_DEFAULT_PAGE_SIZE", "500"),
        ])
        .unwrap();
        assert_eq!(config.paging.default_page_size, 20);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = config_from(&[("YATT_PORT", "not-a-port")]).unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "YATT_PORT"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_max_page_size_is_rejected() {
        assert!(config_from(&[("YATT_MAX_PAGE_SIZE", "0")]).is_err());
    }
}
