//! Runtime configuration, read from a TOML file.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! load_url = "https://script.google.com/macros/s/<id>/exec"
//! save_url = "https://script.google.com/macros/s/<id>/exec"
//! quiet_period_ms = 1000
//! include_day_after = false
//! connect_timeout_secs = 3
//! request_timeout_secs = 10
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::category::CategorySet;
use crate::error::ConfigError;

/// Apps Script deployment that backs the ratings sheet. It serves reads on
/// `GET` and full-replace saves on `POST`.
pub const DEFAULT_ENDPOINT: &str = "https://script.google.com/macros/s/AKfycbwyUET1HQGp6F15rs_pJYtUcd7dsbXVrcvPz8B1SRaJOZ4ky0y-kv5dqB-E6rSTNq7f/exec";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub load_url: String,
    pub save_url: String,
    /// Inactivity window before a save is sent.
    pub quiet_period_ms: u64,
    /// Rate `dayAfter` in an eighth column.
    pub include_day_after: bool,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            load_url: DEFAULT_ENDPOINT.to_string(),
            save_url: DEFAULT_ENDPOINT.to_string(),
            quiet_period_ms: 1_000,
            include_day_after: false,
            connect_timeout_secs: 3,
            request_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Parse and validate TOML text.
    ///
    /// # Errors
    /// [`ConfigError::Parse`] for malformed TOML, [`ConfigError::Invalid`]
    /// for values that fail [`validate`](Self::validate).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse, and validate a config file.
    ///
    /// # Errors
    /// [`ConfigError::Io`] when the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// # Errors
    /// [`ConfigError::Invalid`] when a URL is not http(s) or the quiet
    /// period is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [("load_url", &self.load_url), ("save_url", &self.save_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!("{name} must be an http(s) URL, got {url:?}")));
            }
        }
        if self.quiet_period_ms == 0 {
            return Err(ConfigError::Invalid("quiet_period_ms must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn categories(&self) -> CategorySet {
        CategorySet::new(self.include_day_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.quiet_period(), Duration::from_millis(1_000));
        assert_eq!(cfg.load_url, DEFAULT_ENDPOINT);
        assert_eq!(cfg.categories(), CategorySet::standard());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn partial_toml_overrides_only_given_fields() {
        let cfg = Config::from_toml_str("quiet_period_ms = 250\ninclude_day_after = true\n").unwrap();
        assert_eq!(cfg.quiet_period(), Duration::from_millis(250));
        assert_eq!(cfg.categories().len(), 8);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn zero_quiet_period_rejected() {
        let err = Config::from_toml_str("quiet_period_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn non_http_url_rejected() {
        let err = Config::from_toml_str("save_url = \"ftp://sheet\"").unwrap_err();
        assert!(err.to_string().contains("save_url"), "{err}");
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            Config::from_toml_str("quiet_period_ms = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "load_url = \"http://localhost:8080/read\"").unwrap();
        writeln!(f, "connect_timeout_secs = 1").unwrap();
        let cfg = Config::load(f.path()).unwrap();
        assert_eq!(cfg.load_url, "http://localhost:8080/read");
        assert_eq!(cfg.connect_timeout(), Duration::from_secs(1));
        assert_eq!(cfg.save_url, DEFAULT_ENDPOINT);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
