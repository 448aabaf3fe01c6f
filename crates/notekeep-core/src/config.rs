//! Configuration resolution for notekeep.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. JSON config file (`--config`)
//! 3. Environment variables (a `.env` file is loaded by the binary first)
//! 4. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete notekeep configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub port: u16,
    /// `debug` or `release`.
    pub mode: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0".to_string(),
            port: 8080,
            mode: "debug".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

/// Token signing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_ttl_minutes: 30,
            refresh_ttl_days: 30,
        }
    }
}

/// Longest token lifetime accepted for either token kind: ten years.
pub const MAX_TTL_DAYS: i64 = 3650;

const MAX_TTL_MINUTES: i64 = MAX_TTL_DAYS * 24 * 60;

impl JwtConfig {
    /// Saturates instead of overflowing; [`Config::validate`] caps the input.
    pub const fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_minutes.saturating_mul(60)
    }

    pub const fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_days.saturating_mul(24 * 60 * 60)
    }
}

/// Note cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub use_cache: bool,
    /// Redis address, either `host:port` or a full `redis://` URL.
    /// When empty the in-process cache is used.
    pub redis_url: Option<String>,
    pub note_ttl_secs: u64,
    /// Upper bound on entries held in the in-process tier.
    pub local_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            use_cache: false,
            redis_url: None,
            note_ttl_secs: 60,
            local_capacity: 1000,
        }
    }
}

impl CacheConfig {
    /// The Redis URL with a `redis://` scheme, if one is configured.
    pub fn normalized_redis_url(&self) -> Option<String> {
        let raw = self.redis_url.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.contains("://") {
            Some(raw.to_string())
        } else {
            Some(format!("redis://{raw}"))
        }
    }
}

impl Config {
    /// Socket address string the HTTP server binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.addr, self.server.port)
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.addr.trim().is_empty() {
            return Err(Error::Config("server.addr is required".into()));
        }
        if self.server.port == 0 {
            return Err(Error::Config("server.port must be a valid port".into()));
        }
        if !matches!(self.server.mode.as_str(), "debug" | "release") {
            return Err(Error::Config(format!(
                "server.mode must be 'debug' or 'release', got '{}'",
                self.server.mode
            )));
        }
        if self.jwt.secret.is_empty() {
            return Err(Error::Config("jwt.secret is required".into()));
        }
        if self.jwt.access_ttl_minutes <= 0 {
            return Err(Error::Config(
                "jwt.access_ttl_minutes must be positive".into(),
            ));
        }
        if self.jwt.access_ttl_minutes > MAX_TTL_MINUTES {
            return Err(Error::Config(format!(
                "jwt.access_ttl_minutes must be at most {MAX_TTL_MINUTES}"
            )));
        }
        if self.jwt.refresh_ttl_days <= 0 {
            return Err(Error::Config("jwt.refresh_ttl_days must be positive".into()));
        }
        if self.jwt.refresh_ttl_days > MAX_TTL_DAYS {
            return Err(Error::Config(format!(
                "jwt.refresh_ttl_days must be at most {MAX_TTL_DAYS}"
            )));
        }
        if self.cache.note_ttl_secs == 0 {
            return Err(Error::Config("cache.note_ttl_secs must be positive".into()));
        }
        Ok(())
    }
}

/// Load configuration with hierarchical resolution.
///
/// Does not validate; callers apply CLI overrides first and then call
/// [`Config::validate`].
pub fn load_config(config_file: Option<&Path>) -> Result<Config> {
    let mut config = match config_file {
        Some(path) => load_config_file(path)?,
        None => Config::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Default database location when none is configured.
pub fn default_database_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".notekeep").join("notekeep.db"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/notekeep/notekeep.db"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_DATA_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".local").join("share"))
            })
            .map(|p| p.join("notekeep").join("notekeep.db"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Apply environment-style overrides read through `lookup`.
///
/// Unparseable numeric or boolean values are ignored.
fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("SERVER_ADDR") {
        config.server.addr = val;
    }
    if let Some(n) = lookup("SERVER_PORT").and_then(|v| v.parse().ok()) {
        config.server.port = n;
    }
    if let Some(val) = lookup("MODE") {
        config.server.mode = val;
    }
    if let Some(val) = lookup("DATABASE_PATH") {
        config.database.path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("JWT_SECRET") {
        config.jwt.secret = val;
    }
    if let Some(n) = lookup("JWT_ACCESS_EXPIRATION_MINUTES").and_then(|v| v.parse().ok()) {
        config.jwt.access_ttl_minutes = n;
    }
    if let Some(n) = lookup("JWT_REFRESH_EXPIRATION_DAYS").and_then(|v| v.parse().ok()) {
        config.jwt.refresh_ttl_days = n;
    }
    if let Some(b) = lookup("USE_REDIS").and_then(|v| parse_bool(&v)) {
        config.cache.use_cache = b;
    }
    if let Some(val) = lookup("REDIS_DEFAULT_ADDR") {
        config.cache.redis_url = Some(val);
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.jwt.secret = "secret".into();
        config
    }

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.note_ttl_secs, 60);
        assert!(!config.cache.use_cache);
        assert_eq!(config.jwt.access_ttl_secs(), 30 * 60);
        assert_eq!(config.jwt.refresh_ttl_secs(), 30 * 86_400);
    }

    #[test]
    fn default_config_requires_secret() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("jwt.secret"));
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = valid_config();
        config.server.mode = "staging".into();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.jwt.access_ttl_minutes = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_caps_token_lifetimes() {
        let mut config = valid_config();
        config.jwt.refresh_ttl_days = i64::MAX / 86_400;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jwt.refresh_ttl_days"));

        let mut config = valid_config();
        config.jwt.access_ttl_minutes = i64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jwt.access_ttl_minutes"));

        let mut config = valid_config();
        config.jwt.refresh_ttl_days = MAX_TTL_DAYS;
        config.jwt.access_ttl_minutes = MAX_TTL_DAYS * 24 * 60;
        assert!(config.validate().is_ok());
        assert_eq!(config.jwt.refresh_ttl_secs(), MAX_TTL_DAYS * 86_400);
    }

    #[test]
    fn ttl_seconds_saturate_instead_of_overflowing() {
        let mut config = valid_config();
        config.jwt.refresh_ttl_days = i64::MAX;
        config.jwt.access_ttl_minutes = i64::MAX;
        assert_eq!(config.jwt.refresh_ttl_secs(), i64::MAX);
        assert_eq!(config.jwt.access_ttl_secs(), i64::MAX);
    }

    #[test]
    fn overrides_apply_env_names() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SERVER_PORT", "9000"),
            ("JWT_SECRET", "from-env"),
            ("JWT_ACCESS_EXPIRATION_MINUTES", "5"),
            ("JWT_REFRESH_EXPIRATION_DAYS", "not-a-number"),
            ("USE_REDIS", "true"),
            ("REDIS_DEFAULT_ADDR", "localhost:6379"),
        ]);
        let mut config = Config::default();
        apply_overrides(&mut config, |k| env.get(k).map(ToString::to_string));

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.jwt.secret, "from-env");
        assert_eq!(config.jwt.access_ttl_minutes, 5);
        assert_eq!(config.jwt.refresh_ttl_days, 30);
        assert!(config.cache.use_cache);
        assert_eq!(
            config.cache.normalized_redis_url().as_deref(),
            Some("redis://localhost:6379")
        );
    }

    #[test]
    fn redis_url_keeps_explicit_scheme() {
        let cache = CacheConfig {
            redis_url: Some("rediss://cache.internal:6380/1".into()),
            ..CacheConfig::default()
        };
        assert_eq!(
            cache.normalized_redis_url().as_deref(),
            Some("rediss://cache.internal:6380/1")
        );

        let empty = CacheConfig {
            redis_url: Some("  ".into()),
            ..CacheConfig::default()
        };
        assert!(empty.normalized_redis_url().is_none());
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notekeep.json");
        std::fs::write(&path, r#"{"jwt": {"secret": "file-secret"}}"#).unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.jwt.secret, "file-secret");
        assert_eq!(config.jwt.access_ttl_minutes, 30);
        assert_eq!(config.server.mode, "debug");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = load_config_file(Path::new("/nonexistent/notekeep.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
