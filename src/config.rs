//! Protocol configuration.
//!
//! Configuration is resolved once into an immutable [`ProtocolConfig`]:
//! compiled-in defaults, then an optional JSON config file, then environment
//! overrides. The result is validated before it is handed to the step runner.
use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "MENTAT_CONFIG";
const MODEL_ENV: &str = "MENTAT_MODEL";
const TEMPERATURE_ENV: &str = "MENTAT_TEMPERATURE";
const API_BASE_ENV: &str = "MENTAT_API_BASE";

const MAX_TEMPERATURE: f32 = 2.0;

const SYSTEM_PROMPT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/system.md"));

/// How the provider is asked to constrain its output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Any JSON object.
    #[default]
    JsonObject,
    /// JSON matching the step's rendered schema.
    JsonSchema,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolConfig {
    pub model: String,
    /// Temperature for first attempts whose envelope does not set one.
    pub temperature: f32,
    pub api_base: String,
    /// Name of the environment variable holding the provider API key.
    pub api_key_env: String,
    pub response_format: ResponseFormat,
    pub system_prompt: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            response_format: ResponseFormat::default(),
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    model: Option<String>,
    temperature: Option<f32>,
    api_base: Option<String>,
    api_key_env: Option<String>,
    response_format: Option<ResponseFormat>,
    system_prompt: Option<String>,
    /// Relative paths resolve against the config file's directory.
    system_prompt_path: Option<PathBuf>,
}

impl ProtocolConfig {
    /// Resolve configuration from the process environment.
    ///
    /// `explicit` wins over `MENTAT_CONFIG`, which wins over the per-user
    /// config file; a missing per-user file is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ProtocolError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => env::var_os(CONFIG_PATH_ENV)
                .map(PathBuf::from)
                .or_else(|| default_config_path().filter(|path| path.is_file())),
        };
        Self::load_with(path.as_deref(), |key| env::var(key).ok())
    }

    /// Resolve configuration from an optional file and an env lookup.
    pub fn load_with(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ProtocolError> {
        let mut config = Self::default();
        if let Some(path) = path {
            config.apply_file(path)?;
        }
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ProtocolError> {
        let bytes = fs::read(path).map_err(|err| {
            ProtocolError::Config(format!("read config {}: {err}", path.display()))
        })?;
        let file: ConfigFile = serde_json::from_slice(&bytes).map_err(|err| {
            ProtocolError::Config(format!("parse config {}: {err}", path.display()))
        })?;
        if file.system_prompt.is_some() && file.system_prompt_path.is_some() {
            return Err(ProtocolError::Config(
                "use only one of system_prompt or system_prompt_path".to_string(),
            ));
        }
        if let Some(model) = file.model {
            self.model = model;
        }
        if let Some(temperature) = file.temperature {
            self.temperature = temperature;
        }
        if let Some(api_base) = file.api_base {
            self.api_base = api_base;
        }
        if let Some(api_key_env) = file.api_key_env {
            self.api_key_env = api_key_env;
        }
        if let Some(response_format) = file.response_format {
            self.response_format = response_format;
        }
        if let Some(system_prompt) = file.system_prompt {
            self.system_prompt = system_prompt;
        }
        if let Some(prompt_path) = file.system_prompt_path {
            let resolved = match path.parent() {
                Some(parent) if prompt_path.is_relative() => parent.join(&prompt_path),
                _ => prompt_path,
            };
            self.system_prompt = fs::read_to_string(&resolved).map_err(|err| {
                ProtocolError::Config(format!(
                    "read system prompt {}: {err}",
                    resolved.display()
                ))
            })?;
        }
        Ok(())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ProtocolError> {
        if let Some(model) = lookup(MODEL_ENV) {
            self.model = model;
        }
        if let Some(raw) = lookup(TEMPERATURE_ENV) {
            self.temperature = raw.trim().parse().map_err(|_| {
                ProtocolError::Config(format!("{TEMPERATURE_ENV} must be a number (got {raw:?})"))
            })?;
        }
        if let Some(api_base) = lookup(API_BASE_ENV) {
            self.api_base = api_base;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        if !self.temperature.is_finite()
            || !(0.0..=MAX_TEMPERATURE).contains(&self.temperature)
        {
            return Err(ProtocolError::Config(format!(
                "temperature must be within 0..={MAX_TEMPERATURE} (got {})",
                self.temperature
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ProtocolError::Config("model must be non-empty".to_string()));
        }
        if self.api_base.trim().is_empty() {
            return Err(ProtocolError::Config("api_base must be non-empty".to_string()));
        }
        if self.api_key_env.trim().is_empty() {
            return Err(ProtocolError::Config(
                "api_key_env must be non-empty".to_string(),
            ));
        }
        if self.system_prompt.trim().is_empty() {
            return Err(ProtocolError::Config(
                "system prompt must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-user config location (`<config_dir>/mentat/config.json`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mentat").join("config.json"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
