//! Configuration resolution for `NoteShare`.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/noteshare/settings.json)
//! 3. Project config (.noteshare/settings.json)
//! 4. Environment variables (`NOTESHARE_*`)
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete `NoteShare` configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// HTTP listener, storage locations and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    pub uploads_dir: PathBuf,
    pub log_filter: String,
    pub log_json: bool,
    /// Largest accepted multipart upload body.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            database_path: None,
            uploads_dir: PathBuf::from("uploads"),
            log_filter: "noteshare_server=info".to_string(),
            log_json: false,
            max_upload_bytes: 25 * 1024 * 1024, // 25 MB
        }
    }
}

/// Token and one-time code lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Signing secret. Never written back to settings files by tooling.
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: i64,
    pub otp_ttl_secs: i64,
    /// Interval of the background sweep removing expired codes.
    pub otp_sweep_interval_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: 3600,
            otp_ttl_secs: crate::otp::DEFAULT_OTP_TTL_SECS,
            otp_sweep_interval_secs: 60,
        }
    }
}

/// Mail and SMS provider settings. A provider without credentials falls back
/// to the log-only sender.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeliveryConfig {
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub mail_from: Option<String>,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_from: Option<String>,
}

impl DeliveryConfig {
    /// Whether every setting the HTTP mail client needs is present.
    pub const fn mail_configured(&self) -> bool {
        self.mail_api_url.is_some() && self.mail_api_key.is_some() && self.mail_from.is_some()
    }

    /// Whether every setting the Twilio client needs is present.
    pub const fn sms_configured(&self) -> bool {
        self.twilio_account_sid.is_some()
            && self.twilio_auth_token.is_some()
            && self.twilio_from.is_some()
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut layers = Vec::with_capacity(2);
    if let Some(global_path) = global_config_path() {
        layers.push(global_path);
    }
    if let Some(dir) = project_dir {
        layers.push(dir.join(".noteshare").join("settings.json"));
    }

    let mut config = load_layers(&layers)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Fold the settings files that exist over the defaults, in order. A file
/// only overrides the keys it names.
fn load_layers(paths: &[PathBuf]) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;
    for path in paths.iter().filter(|p| p.exists()) {
        merge_json(&mut merged, load_config_file(path)?);
    }
    serde_json::from_value(merged)
        .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

/// Default location of the `SQLite` database.
pub fn default_database_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("noteshare.db"))
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("noteshare"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/noteshare"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".noteshare"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn load_config_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Recursively overlay `overlay` onto `base`. Objects merge key by key;
/// nulls leave the base untouched.
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                if value.is_null() {
                    continue;
                }
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("NOTESHARE_ADDR") {
        if let Ok(addr) = val.parse() {
            config.server.addr = addr;
        }
    }
    if let Some(val) = var("NOTESHARE_DB_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = var("NOTESHARE_UPLOADS_DIR") {
        config.server.uploads_dir = PathBuf::from(val);
    }
    if let Some(val) = var("NOTESHARE_LOG") {
        config.server.log_filter = val;
    }
    if let Some(val) = var("NOTESHARE_TOKEN_TTL") {
        if let Ok(n) = val.parse() {
            config.auth.token_ttl_secs = n;
        }
    }
    if let Some(val) = var("NOTESHARE_OTP_TTL") {
        if let Ok(n) = val.parse() {
            config.auth.otp_ttl_secs = n;
        }
    }
    if let Some(val) = var("NOTESHARE_JWT_SECRET") {
        config.auth.jwt_secret = Some(val);
    }
    let d = &mut config.delivery;
    for (key, slot) in [
        ("NOTESHARE_MAIL_API_URL", &mut d.mail_api_url),
        ("NOTESHARE_MAIL_API_KEY", &mut d.mail_api_key),
        ("NOTESHARE_MAIL_FROM", &mut d.mail_from),
        ("TWILIO_SID", &mut d.twilio_account_sid),
        ("TWILIO_AUTH", &mut d.twilio_auth_token),
        ("TWILIO_PHONE", &mut d.twilio_from),
    ] {
        if let Some(val) = var(key) {
            *slot = Some(val);
        }
    }
}
