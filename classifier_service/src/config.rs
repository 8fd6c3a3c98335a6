use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub labels: LabelsConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

pub trait Validatable {
    fn validate(&self) -> Result<(), String>;
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body. Base64 adds a third on top of the image size.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_body_bytes() -> usize {
    64 * 1024 * 1024
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub model_dir: PathBuf,
    pub onnx_file: String,
    /// Threads the backend may use inside a single operator.
    #[serde(default = "default_threads")]
    pub intra_threads: usize,
    /// Threads the backend may use to run independent operators in parallel.
    #[serde(default = "default_threads")]
    pub inter_threads: usize,
    #[serde(default = "default_model_instances")]
    pub num_instances: usize,
}

fn default_threads() -> usize {
    1
}

fn default_model_instances() -> usize {
    1
}

impl ModelConfig {
    pub fn get_path(&self) -> PathBuf {
        self.model_dir.join(&self.onnx_file)
    }
}

impl Validatable for ModelConfig {
    fn validate(&self) -> Result<(), String> {
        if !self.get_path().exists() {
            return Err(format!("Model file not found: {:?}", self.get_path()));
        }
        if self.intra_threads == 0 || self.inter_threads == 0 {
            return Err("Model thread counts must be at least 1".into());
        }
        if self.num_instances == 0 {
            return Err("Model num_instances must be at least 1".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LabelsConfig {
    pub labels_dir: PathBuf,
    pub labels_file: String,
}

impl LabelsConfig {
    pub fn get_path(&self) -> PathBuf {
        self.labels_dir.join(&self.labels_file)
    }
}

impl Validatable for LabelsConfig {
    fn validate(&self) -> Result<(), String> {
        if !self.get_path().exists() {
            return Err(format!("Labels file not found: {:?}", self.get_path()));
        }
        Ok(())
    }
}

/// Shape and normalization of the network input, plus how many labels to return.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct InferenceConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_resize_size")]
    pub resize_size: u32,
    #[serde(default = "default_crop_size")]
    pub crop_size: u32,
    #[serde(default = "default_mean")]
    pub mean: [f32; 3],
    #[serde(default = "default_std")]
    pub std: [f32; 3],
    /// Images wider or taller than this are rejected while decoding.
    #[serde(default = "default_max_image_side")]
    pub max_image_side: u32,
    /// Upper bound on the memory the decoder may allocate for one image.
    #[serde(default = "default_max_decode_bytes")]
    pub max_decode_bytes: u64,
}

fn default_top_k() -> usize {
    5
}

fn default_resize_size() -> u32 {
    256
}

fn default_crop_size() -> u32 {
    224
}

fn default_mean() -> [f32; 3] {
    [0.485, 0.456, 0.406]
}

fn default_std() -> [f32; 3] {
    [0.229, 0.224, 0.225]
}

fn default_max_image_side() -> u32 {
    65_535
}

fn default_max_decode_bytes() -> u64 {
    512 * 1024 * 1024
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            resize_size: default_resize_size(),
            crop_size: default_crop_size(),
            mean: default_mean(),
            std: default_std(),
            max_image_side: default_max_image_side(),
            max_decode_bytes: default_max_decode_bytes(),
        }
    }
}

impl Validatable for InferenceConfig {
    fn validate(&self) -> Result<(), String> {
        if self.top_k == 0 {
            return Err("top_k must be at least 1".into());
        }
        if self.crop_size == 0 || self.crop_size > self.resize_size {
            return Err(format!(
                "crop_size must be between 1 and resize_size ({}), got {}",
                self.resize_size, self.crop_size
            ));
        }
        if self.max_image_side == 0 || self.max_decode_bytes == 0 {
            return Err("Image decode limits must be positive".into());
        }
        if self.std.iter().any(|s| !(*s > 0.0)) {
            return Err(format!("std entries must be positive, got {:?}", self.std));
        }
        Ok(())
    }
}

impl Validatable for Config {
    fn validate(&self) -> Result<(), String> {
        self.model.validate()?;
        self.labels.validate()?;
        self.inference.validate()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no current directory: {}", e)))?;
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    let config = load_configuration(&base_path.join("configuration"), &environment)?;
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        return Err(config::ConfigError::Message(e));
    }

    Ok(config)
}

fn load_configuration(
    configuration_directory: &Path,
    environment: &Environment,
) -> Result<Config, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(
            config::File::from(
                configuration_directory.join(format!("{}.yaml", environment.as_str())),
            )
            .required(false),
        )
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize::<Config>()
}
