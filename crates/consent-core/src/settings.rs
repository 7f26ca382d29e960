use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::event::{DEFAULT_PREVIEW_CHARS, DEFAULT_PREVIEW_PLACEHOLDER};

pub const DEFAULT_RUNTIME_ASSET: &str = "/bindings_wasm_bg.wasm";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings io: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings parse: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagingEnv {
    Local,
    Dev,
    Production,
}

impl MessagingEnv {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => MessagingEnv::Production,
            "local" => MessagingEnv::Local,
            _ => MessagingEnv::Dev,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    pub environment: MessagingEnv,
    /// URL or path of the binary runtime the messaging client loads.
    pub runtime_asset_location: String,
    #[serde(default = "default_codecs")]
    pub content_codecs: Vec<String>,
    #[serde(default = "default_preview_chars")]
    pub preview_max_chars: usize,
    #[serde(default = "default_placeholder")]
    pub preview_placeholder: String,
    #[serde(default = "default_tick_ms")]
    pub cooldown_tick_ms: u64,
}

fn default_codecs() -> Vec<String> {
    vec![
        "xmtp.org/text:1.0".to_string(),
        "xmtp.org/reaction:1.0".to_string(),
    ]
}

fn default_preview_chars() -> usize {
    DEFAULT_PREVIEW_CHARS
}

fn default_placeholder() -> String {
    DEFAULT_PREVIEW_PLACEHOLDER.to_string()
}

fn default_tick_ms() -> u64 {
    1000
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            environment: MessagingEnv::Dev,
            runtime_asset_location: DEFAULT_RUNTIME_ASSET.to_string(),
            content_codecs: default_codecs(),
            preview_max_chars: default_preview_chars(),
            preview_placeholder: default_placeholder(),
            cooldown_tick_ms: default_tick_ms(),
        }
    }
}

impl BridgeSettings {
    /// Defaults overridden by `BRIDGE_XMTP_ENV` (or `XMTP_ENV`) and
    /// `BRIDGE_RUNTIME_ASSET_URL`.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(raw) = std::env::var("BRIDGE_XMTP_ENV").or_else(|_| std::env::var("XMTP_ENV")) {
            settings.environment = MessagingEnv::parse(&raw);
        }
        if let Ok(location) = std::env::var("BRIDGE_RUNTIME_ASSET_URL") {
            settings.runtime_asset_location = location;
        }
        settings
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let data = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&data)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.runtime_asset_location.trim().is_empty() {
            return Err(SettingsError::Invalid("runtime asset location is empty"));
        }
        if self.preview_max_chars == 0 {
            return Err(SettingsError::Invalid("preview length must be positive"));
        }
        if self.preview_placeholder.is_empty() {
            return Err(SettingsError::Invalid("preview placeholder is empty"));
        }
        if self.cooldown_tick_ms == 0 {
            return Err(SettingsError::Invalid("cooldown tick must be positive"));
        }
        Ok(())
    }
}
