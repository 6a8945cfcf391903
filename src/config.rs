use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::days::DEFAULT_MAX_DAYS_PER_DATE;
use crate::gazetteer::DEFAULT_MATCH_THRESHOLD;

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "PISTE_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub import: ImportConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportConfig {
    /// Minimum fuzzy similarity (0-1) for a resort name to match.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Season start given to new owners, as `MM-DD`.
    #[serde(default = "default_season_start")]
    pub default_season_start: String,

    #[serde(default = "default_max_days_per_date")]
    pub max_days_per_date: usize,
}

fn default_match_threshold() -> f64 {
    DEFAULT_MATCH_THRESHOLD
}

fn default_season_start() -> String {
    "09-01".to_string()
}

fn default_max_days_per_date() -> usize {
    DEFAULT_MAX_DAYS_PER_DATE
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            default_season_start: default_season_start(),
            max_days_per_date: default_max_days_per_date(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Worker threads for photo extraction; 0 lets rayon decide.
    #[serde(default)]
    pub parallelism: usize,
}

fn default_image_extensions() -> Vec<String> {
    ["jpg", "jpeg", "tif", "tiff", "png", "webp", "heic", "heif"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
            parallelism: 0,
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("piste")
        .join("piste.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            import: ImportConfig::default(),
            scanner: ScannerConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path`, `$PISTE_CONFIG`, or the user config directory, in
    /// that order. A default file is written when none exists yet.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path(),
        };

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.import.match_threshold) {
            anyhow::bail!(
                "import.match_threshold must be between 0 and 1, got {}",
                self.import.match_threshold
            );
        }
        crate::season::SeasonCalendar::parse(&self.import.default_season_start)
            .context("import.default_season_start")?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("piste")
            .join("config.toml")
    }
}
