//! Runtime configuration, passed from the embedding page as JSON.
//!
//! Every field is optional; missing fields fall back to `SiteConfig::default()`.

use serde::{Deserialize, Serialize};

use crate::error::DonationError;
use crate::population::RenderStrategy;

pub const DEFAULT_MINIMUM_AMOUNT: u32 = 100;
pub const DEFAULT_AMOUNT: u32 = 500;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SiteConfig {
    pub render_strategy: RenderStrategy,
    pub sound_enabled: bool,
    pub grab_sound_url: String,
    pub success_sound_url: String,
    /// Prefix joined in front of ball image paths.
    pub asset_base: String,
    pub minimum_amount: u32,
    /// Value pre-filled in the donation field.
    pub default_amount: u32,
    /// Element the claw machine canvas is mounted into (falls back to `<body>`).
    pub mount_id: String,
    /// Fixed RNG seed; browser entropy is used when absent.
    pub seed: Option<u64>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            render_strategy: RenderStrategy::Vector,
            sound_enabled: true,
            grab_sound_url: "click.mp3".to_string(),
            success_sound_url: "coin.mp3".to_string(),
            asset_base: String::new(),
            minimum_amount: DEFAULT_MINIMUM_AMOUNT,
            default_amount: DEFAULT_AMOUNT,
            mount_id: "claw-machine".to_string(),
            seed: None,
        }
    }
}

impl SiteConfig {
    pub fn from_json(json: &str) -> Result<Self, DonationError> {
        let cfg: SiteConfig = serde_json::from_str(json).map_err(|e| DonationError::Config(e.to_string()))?;
        if cfg.minimum_amount == 0 {
            return Err(DonationError::Config("minimum_amount must be positive".into()));
        }
        Ok(cfg)
    }

    /// Parse optional JSON, falling back to defaults (with a console warning) on error.
    pub fn from_json_or_default(json: Option<&str>) -> Self {
        match json.map(str::trim).filter(|s| !s.is_empty()) {
            None => Self::default(),
            Some(raw) => Self::from_json(raw).unwrap_or_else(|err| {
                crate::log::warn(&format!("{err}; using default configuration"));
                Self::default()
            }),
        }
    }

    pub fn asset_url(&self, path: &str) -> String {
        join_asset_url(&self.asset_base, path)
    }
}

pub fn join_asset_url(base: &str, path: &str) -> String {
    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}
