use std::path::PathBuf;
use std::time::Duration;

use actix_web::cookie::Key;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud/pinning/pinJSONToIPFS";
pub const DEFAULT_IPFS_GATEWAY: &str = "gateway.pinata.cloud";

/// Runtime settings, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    pub data_dir: PathBuf,
    pub session_key: Option<String>,
    /// Pinning service token; without one metadata stays in memory.
    pub pinata_jwt: Option<String>,
    pub pinata_api_url: String,
    pub ipfs_gateway: String,
    pub metadata_timeout: Duration,
    pub seed_demo: bool,
    pub draft_autosave: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind: DEFAULT_BIND.to_string(),
            data_dir: PathBuf::from("data"),
            session_key: None,
            pinata_jwt: None,
            pinata_api_url: DEFAULT_PINATA_API_URL.to_string(),
            ipfs_gateway: DEFAULT_IPFS_GATEWAY.to_string(),
            metadata_timeout: Duration::from_secs(20),
            seed_demo: true,
            draft_autosave: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env loaded: {e}");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset or empty variables keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut cfg = AppConfig::default();

        if let Some(v) = get("VALIDIFY_BIND") {
            cfg.bind = v;
        }
        if let Some(v) = get("VALIDIFY_DATA_DIR") {
            cfg.data_dir = PathBuf::from(v);
        }
        cfg.session_key = get("SESSION_KEY");
        cfg.pinata_jwt = get("PINATA_JWT");
        if let Some(v) = get("PINATA_API_URL") {
            cfg.pinata_api_url = v;
        }
        if let Some(v) = get("IPFS_GATEWAY") {
            cfg.ipfs_gateway = v;
        }
        if let Some(v) = get("VALIDIFY_SEED_DEMO") {
            match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => cfg.seed_demo = true,
                "0" | "false" | "no" | "off" => cfg.seed_demo = false,
                other => log::warn!("Ignoring VALIDIFY_SEED_DEMO={other}; expected true or false"),
            }
        }
        if let Some(v) = get("DRAFT_AUTOSAVE_SECS") {
            match v.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => cfg.draft_autosave = Duration::from_secs(secs),
                _ => log::warn!("Ignoring DRAFT_AUTOSAVE_SECS={v}; expected a positive integer"),
            }
        }
        cfg
    }

    /// Cookie signing key. A configured key must be at least 64 bytes; otherwise
    /// a random key is generated and sessions do not survive a restart.
    pub fn cookie_key(&self) -> Key {
        match &self.session_key {
            Some(val) if val.len() >= 64 => {
                log::info!("Using SESSION_KEY from environment");
                Key::from(val.as_bytes())
            }
            Some(val) => {
                log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
                Key::generate()
            }
            None => {
                log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
                Key::generate()
            }
        }
    }
}
