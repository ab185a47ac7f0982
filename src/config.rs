//! Pipeline configuration.
//!
//! Loaded once from `darkroom.toml`, merged key-by-key on top of stock
//! defaults, validated, and then passed explicitly to every component. Nothing
//! in the pipeline looks settings up on its own.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! public_root = "public"          # display/, thumbnails/, watermarked/ live here
//! private_root = "private"        # local originals
//! pending_dir = "pending"         # quick-upload stash
//! catalog = "catalog.json"        # photo records
//!
//! [images]
//! max_resolution = 2560           # long edge of display renditions
//! quality = 85                    # WebP-equivalent quality (mapped for AVIF)
//! thumbnail_size = 400
//! thumbnail_quality = 80
//! keep_original = true
//! duplicate_threshold = 5         # max Hamming distance counted as duplicate
//!
//! [watermark]
//! enabled = false
//! kind = "text"                   # "text" or "image"
//! position = "bottom-right"
//! text = "© Darkroom"
//! size_percent = 20               # image watermark width, % of photo width
//! text_size_percent = 3           # symbol font size, % of photo width
//! opacity = 0.5
//! format = "webp"                 # "webp" or "avif"
//! # image = "brand/mark.png"
//! # symbol_font = "fonts/symbol.ttf"
//! # script_font = "fonts/script.ttf"
//!
//! [storage]
//! # access_key / secret_key / bucket enable the remote tier
//! prefix = ""
//!
//! [geocoding]
//! enabled = true
//! endpoint = "https://nominatim.openstreetmap.org/reverse"
//! user_agent = "darkroom"
//!
//! [heic]
//! program = "heif-convert"
//! args = ["-q", "95"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{OutputFormat, Position, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "darkroom.toml";

pub const ENV_ACCESS_KEY: &str = "DARKROOM_REMOTE_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "DARKROOM_REMOTE_SECRET_KEY";
pub const ENV_BUCKET: &str = "DARKROOM_REMOTE_BUCKET";
pub const ENV_ENDPOINT: &str = "DARKROOM_REMOTE_ENDPOINT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: PathsConfig,
    pub images: ImagesConfig,
    pub watermark: WatermarkConfig,
    pub storage: StorageConfig,
    pub geocoding: GeocodingConfig,
    pub heic: HeicConfig,
}

/// Filesystem layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub public_root: PathBuf,
    pub private_root: PathBuf,
    pub pending_dir: PathBuf,
    pub catalog: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            public_root: "public".into(),
            private_root: "private".into(),
            pending_dir: "pending".into(),
            catalog: "catalog.json".into(),
        }
    }
}

/// Rendition and duplicate-detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    pub max_resolution: u32,
    /// WebP-equivalent quality (1-100).
    pub quality: u32,
    pub thumbnail_size: u32,
    pub thumbnail_quality: u32,
    /// Keep the uploaded original in storage after renditions exist.
    pub keep_original: bool,
    pub duplicate_threshold: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_resolution: 2560,
            quality: 85,
            thumbnail_size: 400,
            thumbnail_quality: 80,
            keep_original: true,
            duplicate_threshold: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkKind {
    #[default]
    Text,
    Image,
}

/// Watermark settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    pub enabled: bool,
    pub kind: WatermarkKind,
    pub position: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    pub size_percent: u32,
    pub opacity: f32,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_font: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_font: Option<PathBuf>,
    pub text_size_percent: u32,
    pub format: OutputFormat,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: WatermarkKind::Text,
            position: Position::BottomRight,
            image: None,
            size_percent: 20,
            opacity: 0.5,
            text: "© Darkroom".to_string(),
            symbol_font: None,
            script_font: None,
            text_size_percent: 3,
            format: OutputFormat::Webp,
        }
    }
}

/// Remote object storage connection.
///
/// The remote tier is enabled only when access key, secret key and bucket
/// are all present and non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Prepended to every remote key.
    pub prefix: String,
}

/// Credentials and target of an enabled remote tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub prefix: String,
}

impl StorageConfig {
    /// Returns the remote settings if every required value is present.
    pub fn remote(&self) -> Option<RemoteSettings> {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        Some(RemoteSettings {
            access_key: non_empty(&self.access_key)?,
            secret_key: non_empty(&self.secret_key)?,
            bucket: non_empty(&self.bucket)?,
            endpoint: non_empty(&self.endpoint),
            region: non_empty(&self.region).unwrap_or_else(|| "auto".to_string()),
            prefix: self.prefix.clone(),
        })
    }

    /// Overlay connection values from the environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (var, slot) in [
            (ENV_ACCESS_KEY, &mut self.access_key),
            (ENV_SECRET_KEY, &mut self.secret_key),
            (ENV_BUCKET, &mut self.bucket),
            (ENV_ENDPOINT, &mut self.endpoint),
        ] {
            if let Some(value) = lookup(var) {
                *slot = Some(value);
            }
        }
    }
}

/// Reverse geocoding service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeocodingConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub user_agent: String,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://nominatim.openstreetmap.org/reverse".to_string(),
            user_agent: concat!("darkroom/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// External HEIC→JPEG converter. The input and output paths are appended
/// after `args`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeicConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for HeicConfig {
    fn default() -> Self {
        Self {
            program: "heif-convert".to_string(),
            args: vec!["-q".to_string(), "95".to_string()],
        }
    }
}

/// Effective rendition parameters for one photo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenditionSettings {
    pub max_resolution: u32,
    pub quality: Quality,
    pub thumbnail_size: u32,
    pub thumbnail_quality: Quality,
    pub watermark_format: OutputFormat,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let images = &self.images;
        if !(1..=100).contains(&images.quality) {
            return Err(ConfigError::Validation("images.quality must be 1-100".into()));
        }
        if !(1..=100).contains(&images.thumbnail_quality) {
            return Err(ConfigError::Validation(
                "images.thumbnail_quality must be 1-100".into(),
            ));
        }
        if images.max_resolution == 0 || images.thumbnail_size == 0 {
            return Err(ConfigError::Validation(
                "images.max_resolution and images.thumbnail_size must be non-zero".into(),
            ));
        }
        if images.duplicate_threshold > 64 {
            return Err(ConfigError::Validation(
                "images.duplicate_threshold must be 0-64".into(),
            ));
        }
        let wm = &self.watermark;
        if !(0.0..=1.0).contains(&wm.opacity) {
            return Err(ConfigError::Validation(
                "watermark.opacity must be 0.0-1.0".into(),
            ));
        }
        if wm.size_percent == 0 || wm.size_percent > 100 || wm.text_size_percent == 0 || wm.text_size_percent > 100 {
            return Err(ConfigError::Validation(
                "watermark size percentages must be 1-100".into(),
            ));
        }
        if self.heic.program.trim().is_empty() {
            return Err(ConfigError::Validation("heic.program must not be empty".into()));
        }
        Ok(())
    }

    /// Rendition settings for a photo, honouring its per-photo overrides.
    pub fn rendition_settings(
        &self,
        custom_max_resolution: Option<u32>,
        custom_quality: Option<u32>,
    ) -> RenditionSettings {
        RenditionSettings {
            max_resolution: custom_max_resolution
                .filter(|&r| r > 0)
                .unwrap_or(self.images.max_resolution),
            quality: Quality::new(custom_quality.unwrap_or(self.images.quality)),
            thumbnail_size: self.images.thumbnail_size,
            thumbnail_quality: Quality::new(self.images.thumbnail_quality),
            watermark_format: self.watermark.format,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse a config document, merge it over the defaults, and validate.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let config: Config = merge_toml(stock_defaults_value()?, overlay).try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`.
///
/// A missing file yields the stock defaults. Remote storage credentials from
/// the environment override the file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let mut config = if path.exists() {
        parse_config(&fs::read_to_string(path)?)?
    } else {
        let config = Config::default();
        config.validate()?;
        config
    };
    config.storage.apply_env(|var| std::env::var(var).ok());
    Ok(config)
}

/// Returns a fully-commented stock `darkroom.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Darkroom Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Filesystem layout
# ---------------------------------------------------------------------------
[paths]
# Public renditions: display/, thumbnails/ and watermarked/ are created here.
public_root = "public"
# Local originals when the remote tier is disabled or unreachable.
private_root = "private"
# Raw uploads waiting for `darkroom process-pending`.
pending_dir = "pending"
# Photo records.
catalog = "catalog.json"

# ---------------------------------------------------------------------------
# Renditions
# ---------------------------------------------------------------------------
[images]
# Longest edge of the display and watermarked renditions, in pixels.
max_resolution = 2560
# WebP-equivalent quality (1-100). AVIF renditions map this into 65-85.
quality = 85
# Longest edge of thumbnails, and their WebP quality.
thumbnail_size = 400
thumbnail_quality = 80
# Keep the uploaded original after renditions are generated.
keep_original = true
# Perceptual hashes within this Hamming distance count as duplicates.
duplicate_threshold = 5

# ---------------------------------------------------------------------------
# Watermark
# ---------------------------------------------------------------------------
[watermark]
enabled = false
# "text" or "image".
kind = "text"
# top-left, top-center, top-right, middle-left, center, middle-right,
# bottom-left, bottom-center, bottom-right
position = "bottom-right"
# Text watermark. A leading © is drawn in symbol_font, the rest in script_font.
text = "© Darkroom"
# symbol_font = "fonts/symbol.ttf"
# script_font = "fonts/script.ttf"
text_size_percent = 3
# Image watermark, scaled to size_percent of the photo width.
# image = "brand/mark.png"
size_percent = 20
opacity = 0.5
# Encoding of the watermarked rendition: "webp" or "avif".
format = "webp"

# ---------------------------------------------------------------------------
# Remote storage (S3-compatible)
# ---------------------------------------------------------------------------
[storage]
# access_key, secret_key and bucket enable the remote tier. They can also be
# set through DARKROOM_REMOTE_ACCESS_KEY, DARKROOM_REMOTE_SECRET_KEY,
# DARKROOM_REMOTE_BUCKET and DARKROOM_REMOTE_ENDPOINT.
# access_key = ""
# secret_key = ""
# bucket = ""
# endpoint = "https://<account>.r2.cloudflarestorage.com"
# region = "auto"
prefix = ""

# ---------------------------------------------------------------------------
# Reverse geocoding
# ---------------------------------------------------------------------------
[geocoding]
enabled = true
endpoint = "https://nominatim.openstreetmap.org/reverse"
user_agent = "darkroom"

# ---------------------------------------------------------------------------
# HEIC conversion
# ---------------------------------------------------------------------------
[heic]
# Invoked as: program args... <input> <output.jpg>
program = "heif-convert"
args = ["-q", "95"]
"##
}
