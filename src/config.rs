use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::{DEFAULT_TEXT_FILE, DEFAULT_TRAIN_FRACTION};

pub const DEFAULT_OUT_DIR: &str = "data/su_shi_poems";
pub const SOURCE_ENV: &str = "CHARCORPUS_SOURCE";

#[derive(Debug, Clone, PartialEq)]
pub struct PrepareConfig {
    pub source_dir: PathBuf,
    pub out_dir: PathBuf,
    pub train_fraction: f64,
    pub text_file: String,
}

impl PrepareConfig {
    pub fn new(source_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            out_dir: out_dir.into(),
            train_fraction: DEFAULT_TRAIN_FRACTION,
            text_file: DEFAULT_TEXT_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeConfig {
    pub meta_path: PathBuf,
    pub ids_path: PathBuf,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowConfig {
    pub from: Option<PathBuf>,
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Prepare(PrepareConfig),
    Decode(DecodeConfig),
    Config(ShowConfig),
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    Serialize(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Json { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Serialize(err) => write!(f, "{err}"),
            Self::Invalid(reason) => write!(f, "invalid training config: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } | Self::Serialize(source) => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub out_dir: String,
    pub eval_interval: usize,
    pub eval_iters: usize,
    pub log_interval: usize,
    pub always_save_checkpoint: bool,

    pub wandb_log: bool,
    pub wandb_project: String,
    pub wandb_run_name: String,

    pub dataset: String,
    pub gradient_accumulation_steps: usize,
    pub batch_size: usize,
    pub block_size: usize,

    pub n_layer: usize,
    pub n_head: usize,
    pub n_embd: usize,
    pub dropout: f64,

    pub learning_rate: f64,
    pub max_iters: usize,
    pub lr_decay_iters: usize,
    pub min_lr: f64,
    pub beta2: f64,
    pub warmup_iters: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            out_dir: "out-su-shi".to_string(),
            eval_interval: 250,
            eval_iters: 200,
            log_interval: 10,
            always_save_checkpoint: false,

            wandb_log: false,
            wandb_project: "su-shi-poems".to_string(),
            wandb_run_name: "mini-gpt".to_string(),

            dataset: "su_shi_poems".to_string(),
            gradient_accumulation_steps: 1,
            batch_size: 64,
            block_size: 256,

            n_layer: 6,
            n_head: 6,
            n_embd: 384,
            dropout: 0.2,

            learning_rate: 1e-3,
            max_iters: 5000,
            lr_decay_iters: 5000,
            min_lr: 1e-4,
            beta2: 0.99,
            warmup_iters: 100,
        }
    }
}

impl TrainingConfig {
    /// Reads a JSON file; keys it omits keep their preset values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut payload = self.to_json()?;
        payload.push('\n');
        fs::write(path, payload).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("batch_size", self.batch_size),
            ("block_size", self.block_size),
            ("n_layer", self.n_layer),
            ("n_head", self.n_head),
            ("n_embd", self.n_embd),
            ("gradient_accumulation_steps", self.gradient_accumulation_steps),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be > 0")));
            }
        }
        if !self.n_embd.is_multiple_of(self.n_head) {
            return Err(ConfigError::Invalid(format!(
                "n_embd ({}) must be divisible by n_head ({})",
                self.n_embd, self.n_head
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ConfigError::Invalid(format!(
                "dropout must be within [0, 1), got {}",
                self.dropout
            )));
        }
        if !(self.min_lr > 0.0 && self.min_lr <= self.learning_rate) {
            return Err(ConfigError::Invalid(format!(
                "min_lr ({}) must be > 0 and <= learning_rate ({})",
                self.min_lr, self.learning_rate
            )));
        }
        if self.lr_decay_iters > self.max_iters {
            return Err(ConfigError::Invalid(format!(
                "lr_decay_iters ({}) must not exceed max_iters ({})",
                self.lr_decay_iters, self.max_iters
            )));
        }
        if self.warmup_iters > self.lr_decay_iters {
            return Err(ConfigError::Invalid(format!(
                "warmup_iters ({}) must not exceed lr_decay_iters ({})",
                self.warmup_iters, self.lr_decay_iters
            )));
        }
        Ok(())
    }
}

pub fn run_show_config(command: &ShowConfig) -> Result<String, ConfigError> {
    let config = match &command.from {
        Some(path) => TrainingConfig::load(path)?,
        None => TrainingConfig::default(),
    };
    config.validate()?;

    match &command.out {
        Some(path) => {
            config.save(path)?;
            Ok(format!("wrote training config to {}", path.display()))
        }
        None => config.to_json(),
    }
}
