//! Service configuration: defaults, optionally overridden by a JSON file,
//! then by command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};

use crate::error::{Error, Result};
use crate::{FilterOption, ImageSize, LABELS_PATH, MODEL_PATH};

/// Model artifacts and preprocessing
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// ONNX model file
    pub model_path: PathBuf,
    /// JSON array of class names, index-aligned with the model output
    pub labels_path: PathBuf,
    /// Input size for models whose height/width are not fixed
    pub input_size: Option<ImageSize>,
    /// Resampling filter used when resizing uploads
    #[serde(with = "FilterOption")]
    pub resize_filter: FilterType,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(MODEL_PATH),
            labels_path: PathBuf::from(LABELS_PATH),
            input_size: None,
            resize_filter: FilterType::Nearest,
        }
    }
}

impl ModelConfig {
    /// Identifier reported by the health endpoint.
    pub fn model_id(&self) -> String {
        self.model_path.display().to_string()
    }
}

/// HTTP service configuration
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model: ModelConfig,
    /// Forward passes allowed to run at the same time
    pub max_concurrent_inferences: usize,
    /// Deadline for one prediction, queueing included
    #[serde_as(as = "DurationSeconds<u64>")]
    pub request_timeout: Duration,
    /// Largest accepted upload
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model: ModelConfig::default(),
            max_concurrent_inferences: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            request_timeout: Duration::from_secs(30),
            body_limit_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Reads a JSON config file; missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: ServerConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_inferences == 0 {
            return Err(Error::Config(
                "max_concurrent_inferences must be at least 1".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::Config("request_timeout must be positive".to_string()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
