use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Environment, File};
use serde::{Deserialize, Serialize};

use crate::translate::languages::LanguagePair;

/// Model served by this process. The translation direction is fixed by
/// `model.source_lang` / `model.target_lang`.
pub const DEFAULT_MODEL_ID: &str = "facebook/nllb-200-distilled-600M";

const ENV_PREFIX: &str = "INDIC_MT";
const CONFIG_CANDIDATES: [&str; 3] = ["conf.yaml", "conf.yml", "conf.json"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Identifier reported by `/health`.
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Directory holding `tokenizer.json` and the encoder/decoder ONNX exports.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    #[serde(default = "default_source_lang")]
    pub source_lang: String,
    #[serde(default = "default_target_lang")]
    pub target_lang: String,
    /// Threads used by the inference runtime.
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
    /// Overrides the `max_length` found in the model directory.
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models/nllb-200-distilled-600M")
}

fn default_source_lang() -> String {
    "en".to_string()
}

fn default_target_lang() -> String {
    "te".to_string()
}

fn default_intra_threads() -> usize {
    1
}

fn default_max_input_tokens() -> usize {
    1024
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            model_dir: default_model_dir(),
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            intra_threads: default_intra_threads(),
            max_length: None,
            max_input_tokens: default_max_input_tokens(),
        }
    }
}

impl ModelConfig {
    pub fn language_pair(&self) -> Result<LanguagePair> {
        LanguagePair::from_codes(&self.source_lang, &self.target_lang)
    }
}

impl Config {
    /// Load configuration from defaults, an optional config file and the
    /// environment. Returns the file that was used, if any.
    ///
    /// The file is `$CONFIG_PATH` when set, otherwise the first of
    /// `conf.yaml`, `conf.yml`, `conf.json` found in the working directory.
    /// `PORT` overrides `server.port`.
    pub fn load() -> Result<(Self, Option<PathBuf>)> {
        let path = match std::env::var("CONFIG_PATH") {
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => CONFIG_CANDIDATES
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists()),
        };

        let env = Environment::with_prefix(ENV_PREFIX).separator("__");
        let config = Self::build(path.as_deref(), env, std::env::var("PORT").ok())?;
        Ok((config, path))
    }

    fn build(path: Option<&Path>, env: Environment, port: Option<String>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings = builder
            .add_source(env)
            .set_override_option("server.port", port)?
            .build()
            .with_context(|| match path {
                Some(p) => format!("failed to read configuration from {}", p.display()),
                None => "failed to read configuration".to_string(),
            })?;

        let config: Config = settings
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.intra_threads == 0 {
            anyhow::bail!("model.intra_threads must be at least 1");
        }
        if self.model.max_input_tokens < 3 {
            anyhow::bail!("model.max_input_tokens must leave room for the language and end tokens");
        }
        if self.model.max_length == Some(0) {
            anyhow::bail!("model.max_length must be positive");
        }
        self.model.language_pair()?;
        Ok(())
    }
}
