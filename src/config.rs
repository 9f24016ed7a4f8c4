//! Configuration management for todo-assistant.
//!
//! This module handles the YAML config file that stores the assistant's chat
//! settings and an optional database location, and resolves effective chat
//! settings from command-line overrides, the file, and built-in defaults.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Model used when neither an override nor the config file names one.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Chat settings stored in the config file. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ChatConfig {
    /// API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Preferred backend (`dashscope`, `gemini`, `openai`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
}

impl ChatConfig {
    /// Check if no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.api_key.is_none()
            && self.base_url.is_none()
            && self.model.is_none()
            && self.backend.is_none()
    }
}

/// Application configuration file contents.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Assistant chat settings.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Database location. None means the default data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

impl AppConfig {
    /// Load config from `path`, returning None if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Some(Self::default()));
        }
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(Some(config))
    }

    /// Load config from `path`, or the default config if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        Ok(Self::load_from(path)?.unwrap_or_default())
    }

    /// Save config to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Merge the fields present in `update` into the chat settings.
    ///
    /// Returns whether anything was provided.
    pub fn set_chat(&mut self, update: ChatConfig) -> bool {
        if update.is_empty() {
            return false;
        }
        let chat = &mut self.chat;
        chat.api_key = update.api_key.or_else(|| chat.api_key.take());
        chat.base_url = update.base_url.or_else(|| chat.base_url.take());
        chat.model = update.model.or_else(|| chat.model.take());
        chat.backend = update.backend.or_else(|| chat.backend.take());
        true
    }

    /// Clear all chat settings.
    pub fn reset_chat(&mut self) {
        self.chat = ChatConfig::default();
    }

    /// Check if an API key is stored.
    #[must_use]
    pub fn has_chat_config(&self) -> bool {
        self.chat.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Chat settings given on the command line.
pub type ChatOverrides = ChatConfig;

/// Where a resolved setting came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// A command-line flag.
    Override,
    /// The config file.
    File,
    /// The built-in default.
    Default,
}

/// Effective chat settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedChat {
    /// API key, if any.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Where the API key came from.
    pub api_key_source: Option<Source>,
    /// Base URL, if any.
    pub base_url: Option<String>,
    /// Model name.
    pub model: String,
    /// Where the model came from.
    pub model_source: Source,
    /// Requested backend, if any.
    pub backend: Option<String>,
}

impl ResolvedChat {
    /// Check if an API key is available.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

fn pick(over: Option<&String>, file: Option<&String>) -> Option<(String, Source)> {
    let present = |v: Option<&String>| v.filter(|s| !s.trim().is_empty()).cloned();
    present(over)
        .map(|v| (v, Source::Override))
        .or_else(|| present(file).map(|v| (v, Source::File)))
}

/// Resolve each chat setting independently: override, then file, then default.
#[must_use]
pub fn resolve_chat(overrides: &ChatOverrides, file: &ChatConfig) -> ResolvedChat {
    let api_key = pick(overrides.api_key.as_ref(), file.api_key.as_ref());
    let base_url = pick(overrides.base_url.as_ref(), file.base_url.as_ref());
    let backend = pick(overrides.backend.as_ref(), file.backend.as_ref());
    let (model, model_source) = pick(overrides.model.as_ref(), file.model.as_ref())
        .unwrap_or_else(|| (DEFAULT_MODEL.to_string(), Source::Default));

    ResolvedChat {
        api_key_source: api_key.as_ref().map(|(_, source)| *source),
        api_key: api_key.map(|(v, _)| v),
        base_url: base_url.map(|(v, _)| v),
        model,
        model_source,
        backend: backend.map(|(v, _)| v),
    }
}

/// Mask a secret for display, keeping only the last few characters.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count > 8 {
        let tail: String = secret.chars().skip(count - 4).collect();
        format!("{}{tail}", "*".repeat(count - 4))
    } else {
        "***".to_string()
    }
}
