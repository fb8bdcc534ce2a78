//! Runtime configuration.
//!
//! Defaults, overridden best-effort from `OCULUS_*` environment variables.
//! Invalid values are ignored with a warning.

use std::path::PathBuf;
use std::time::Duration;

use crate::ports::DEFAULT_MAX_IMAGE_BYTES;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PLATE_COUNT: usize = 20;

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// File when attached to a terminal, stderr otherwise
    Auto,
    File,
    Stderr,
}

impl std::str::FromStr for LogMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "file" => Ok(Self::File),
            "stderr" => Ok(Self::Stderr),
            other => Err(format!("unknown log mode {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OculusConfig {
    /// Base URL of the screening API
    pub api_url: String,

    /// Per-request timeout for every upstream call
    pub http_timeout: Duration,

    /// Plates requested per colour test
    pub plate_count: usize,

    /// Largest image accepted for classification
    pub max_image_bytes: u64,

    pub log_mode: LogMode,

    pub log_file: PathBuf,
}

impl Default for OculusConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            plate_count: DEFAULT_PLATE_COUNT,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            log_mode: LogMode::Auto,
            log_file: std::env::temp_dir().join("oculus.log"),
        }
    }
}

fn parse_positive<T>(key: &str, raw: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Some(v),
        _ => {
            tracing::warn!("Ignoring {}={:?}: expected a positive integer", key, raw);
            None
        }
    }
}

impl OculusConfig {
    /// Defaults overridden by the process environment.
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("OCULUS_API_URL") {
            let v = v.trim();
            if v.is_empty() {
                tracing::warn!("Ignoring empty OCULUS_API_URL");
            } else {
                cfg.api_url = v.to_string();
            }
        }

        if let Some(v) = lookup("OCULUS_HTTP_TIMEOUT_SECS") {
            if let Some(secs) = parse_positive::<u64>("OCULUS_HTTP_TIMEOUT_SECS", &v) {
                cfg.http_timeout = Duration::from_secs(secs);
            }
        }

        if let Some(v) = lookup("OCULUS_PLATE_COUNT") {
            if let Some(count) = parse_positive::<usize>("OCULUS_PLATE_COUNT", &v) {
                cfg.plate_count = count;
            }
        }

        if let Some(v) = lookup("OCULUS_MAX_IMAGE_BYTES") {
            if let Some(bytes) = parse_positive::<u64>("OCULUS_MAX_IMAGE_BYTES", &v) {
                cfg.max_image_bytes = bytes;
            }
        }

        if let Some(v) = lookup("OCULUS_LOG_MODE") {
            match v.parse::<LogMode>() {
                Ok(mode) => cfg.log_mode = mode,
                Err(e) => tracing::warn!("Ignoring OCULUS_LOG_MODE: {}", e),
            }
        }

        if let Some(v) = lookup("OCULUS_LOG_FILE") {
            if !v.trim().is_empty() {
                cfg.log_file = PathBuf::from(v.trim());
            }
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> OculusConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        OculusConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = from_pairs(&[]);
        assert_eq!(cfg.api_url, "http://localhost:5000");
        assert_eq!(cfg.http_timeout, Duration::from_secs(30));
        assert_eq!(cfg.plate_count, 20);
        assert_eq!(cfg.max_image_bytes, 16 * 1024 * 1024);
        assert_eq!(cfg.log_mode, LogMode::Auto);
    }

    #[test]
    fn test_env_overrides() {
        let cfg = from_pairs(&[
            ("OCULUS_API_URL", " http://screening:8080 "),
            ("OCULUS_HTTP_TIMEOUT_SECS", "5"),
            ("OCULUS_PLATE_COUNT", "12"),
            ("OCULUS_MAX_IMAGE_BYTES", "1024"),
            ("OCULUS_LOG_MODE", "STDERR"),
            ("OCULUS_LOG_FILE", "/var/log/oculus.log"),
        ]);
        assert_eq!(cfg.api_url, "http://screening:8080");
        assert_eq!(cfg.http_timeout, Duration::from_secs(5));
        assert_eq!(cfg.plate_count, 12);
        assert_eq!(cfg.max_image_bytes, 1024);
        assert_eq!(cfg.log_mode, LogMode::Stderr);
        assert_eq!(cfg.log_file, PathBuf::from("/var/log/oculus.log"));
    }

    #[test]
    fn test_invalid_values_ignored() {
        let cfg = from_pairs(&[
            ("OCULUS_API_URL", "  "),
            ("OCULUS_HTTP_TIMEOUT_SECS", "0"),
            ("OCULUS_PLATE_COUNT", "-3"),
            ("OCULUS_MAX_IMAGE_BYTES", "lots"),
            ("OCULUS_LOG_MODE", "syslog"),
        ]);
        assert_eq!(cfg, OculusConfig::default());
    }
}
