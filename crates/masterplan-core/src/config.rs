//! Master-plan configuration loaded from TOML and environment.
//!
//! | Key / Env | Default | Description |
//! |-----------|---------|-------------|
//! | storage_path / MASTERPLAN__STORAGE_PATH | ./data/masterplan | Sled directory for the persisted state. |
//! | root_level_name / MASTERPLAN__ROOT_LEVEL_NAME | Master Plan | Display name of the `master` level. |
//! | duplicate_threshold / MASTERPLAN__DUPLICATE_THRESHOLD | 15.0 | Pins closer than this on one level are duplicates. |
//! | image_width, image_height | 1000 | Logical bounds every level image is projected onto. |
//! | quota_bytes / MASTERPLAN__QUOTA_BYTES | 5242880 | Max bytes of one persisted snapshot (0 = unlimited). |

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_STORAGE_PATH: &str = "./data/masterplan";
pub const DEFAULT_ROOT_LEVEL_NAME: &str = "Master Plan";
pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 15.0;
pub const DEFAULT_IMAGE_EXTENT: u32 = 1000;
/// Same order of magnitude as a browser's per-origin local storage.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

const ENV_CONFIG_PATH: &str = "MASTERPLAN_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/masterplan.toml";

fn default_storage_path() -> String {
    DEFAULT_STORAGE_PATH.to_string()
}

fn default_root_level_name() -> String {
    DEFAULT_ROOT_LEVEL_NAME.to_string()
}

fn default_duplicate_threshold() -> f64 {
    DEFAULT_DUPLICATE_THRESHOLD
}

fn default_image_extent() -> u32 {
    DEFAULT_IMAGE_EXTENT
}

fn default_quota_bytes() -> usize {
    DEFAULT_QUOTA_BYTES
}

/// Logical coordinate space shared by every level image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageBounds {
    pub width: u32,
    pub height: u32,
}

impl ImageBounds {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (0.0..=self.height as f64).contains(&lat) && (0.0..=self.width as f64).contains(&lng)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    #[serde(default = "default_root_level_name")]
    pub root_level_name: String,
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,
    #[serde(default = "default_image_extent")]
    pub image_width: u32,
    #[serde(default = "default_image_extent")]
    pub image_height: u32,
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: usize,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            root_level_name: default_root_level_name(),
            duplicate_threshold: default_duplicate_threshold(),
            image_width: default_image_extent(),
            image_height: default_image_extent(),
            quota_bytes: default_quota_bytes(),
        }
    }
}

impl PlanConfig {
    /// Load config from file and environment. Precedence: env `MASTERPLAN__*` > file at
    /// `MASTERPLAN_CONFIG` (or `config/masterplan.toml`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("storage_path", DEFAULT_STORAGE_PATH)?
            .set_default("root_level_name", DEFAULT_ROOT_LEVEL_NAME)?
            .set_default("duplicate_threshold", DEFAULT_DUPLICATE_THRESHOLD)?
            .set_default("image_width", DEFAULT_IMAGE_EXTENT as i64)?
            .set_default("image_height", DEFAULT_IMAGE_EXTENT as i64)?
            .set_default("quota_bytes", DEFAULT_QUOTA_BYTES as i64)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("MASTERPLAN").separator("__"))
            .build()?;

        let mut cfg: PlanConfig = built.try_deserialize()?;
        if !cfg.duplicate_threshold.is_finite() || cfg.duplicate_threshold < 0.0 {
            cfg.duplicate_threshold = DEFAULT_DUPLICATE_THRESHOLD;
        }
        Ok(cfg)
    }

    pub fn image_bounds(&self) -> ImageBounds {
        ImageBounds {
            width: self.image_width,
            height: self.image_height,
        }
    }

    /// `None` when the quota is disabled.
    pub fn quota(&self) -> Option<usize> {
        (self.quota_bytes > 0).then_some(self.quota_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PlanConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.root_level_name, "Master Plan");
        assert_eq!(cfg.duplicate_threshold, 15.0);
        assert_eq!(cfg.image_bounds(), ImageBounds { width: 1000, height: 1000 });
        assert_eq!(cfg.quota(), Some(DEFAULT_QUOTA_BYTES));
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("masterplan.toml");
        std::fs::write(
            &path,
            "root_level_name = \"Site\"\nduplicate_threshold = 4.5\nquota_bytes = 0\n",
        )
        .unwrap();
        let cfg = PlanConfig::load_from(&path).unwrap();
        assert_eq!(cfg.root_level_name, "Site");
        assert_eq!(cfg.duplicate_threshold, 4.5);
        assert_eq!(cfg.quota(), None);
        assert_eq!(cfg.storage_path, DEFAULT_STORAGE_PATH);
    }

    #[test]
    fn bounds_contain_edges() {
        let b = ImageBounds { width: 1000, height: 500 };
        assert!(b.contains(0.0, 0.0));
        assert!(b.contains(500.0, 1000.0));
        assert!(!b.contains(501.0, 10.0));
        assert!(!b.contains(10.0, -1.0));
    }
}
