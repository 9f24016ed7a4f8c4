//! Choosing which AI backend drives the assistant.
//!
//! Selection is a pure function of the requested backend (if any) and the set
//! of API keys that are available. Nothing here talks to a provider.

use crate::config::{ResolvedChat, Source};
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A supported assistant backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Alibaba DashScope (Qwen models).
    DashScope,
    /// Google Gemini.
    Gemini,
    /// OpenAI or any OpenAI-compatible endpoint.
    OpenAi,
}

impl Backend {
    /// Backends in automatic selection order.
    pub const PRIORITY: [Self; 3] = [Self::DashScope, Self::Gemini, Self::OpenAi];

    /// Parse a backend name or alias, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown names.
    pub fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dashscope" | "qwen" => Ok(Self::DashScope),
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::validation(format!(
                "unknown backend '{other}' (expected dashscope, gemini or openai)"
            ))),
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DashScope => "dashscope",
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::DashScope => "DashScope (Qwen)",
            Self::Gemini => "Google Gemini",
            Self::OpenAi => "OpenAI",
        }
    }

    /// Environment variable holding this backend's API key.
    #[must_use]
    pub const fn env_var(self) -> &'static str {
        match self {
            Self::DashScope => "DASHSCOPE_API_KEY",
            Self::Gemini => "GOOGLE_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Model used when none is configured.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::DashScope => "qwen-plus",
            Self::Gemini => "gemini-2.0-flash-exp",
            Self::OpenAi => "gpt-4o-mini",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API keys known to be available, per backend.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    keys: BTreeMap<Backend, String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys.keys()).finish()
    }
}

impl Credentials {
    /// Read keys from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read keys through `lookup`, which maps an environment variable name to
    /// its value. Blank values count as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Backend::PRIORITY
            .into_iter()
            .fold(Self::default(), |creds, backend| match lookup(backend.env_var()) {
                Some(key) => creds.with_key(backend, key),
                None => creds,
            })
    }

    /// Add a key for `backend`. Blank keys are ignored.
    #[must_use]
    pub fn with_key(mut self, backend: Backend, key: impl Into<String>) -> Self {
        let key = key.into();
        if !key.trim().is_empty() {
            self.keys.insert(backend, key);
        }
        self
    }

    /// Fold in the key from resolved chat settings, which drives an
    /// OpenAI-compatible endpoint.
    #[must_use]
    pub fn with_chat(self, chat: &ResolvedChat) -> Self {
        match &chat.api_key {
            Some(key) => self.with_key(Backend::OpenAi, key.clone()),
            None => self,
        }
    }

    /// Check if a key is present for `backend`.
    #[must_use]
    pub fn has(&self, backend: Backend) -> bool {
        self.keys.contains_key(&backend)
    }

    /// The key for `backend`, if present.
    #[must_use]
    pub fn key(&self, backend: Backend) -> Option<&str> {
        self.keys.get(&backend).map(String::as_str)
    }

    /// Backends with a key, in priority order.
    #[must_use]
    pub fn available(&self) -> Vec<Backend> {
        Backend::PRIORITY.into_iter().filter(|b| self.has(*b)).collect()
    }
}

/// The outcome of backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// The chosen backend.
    pub backend: Backend,
    /// The model to use.
    pub model: String,
    /// True when no key was available for any backend.
    pub credentials_missing: bool,
}

/// Pick a backend.
///
/// An explicit request must name a known backend whose key is present.
/// Otherwise the first backend in [`Backend::PRIORITY`] with a key wins, and
/// with no keys at all `OpenAi` is returned flagged as missing credentials.
///
/// # Errors
///
/// Returns a validation error for an unknown backend name or a requested
/// backend without a key.
pub fn select_backend(requested: Option<&str>, credentials: &Credentials) -> Result<Selection> {
    let requested = requested.map(str::trim).filter(|s| !s.is_empty());
    if let Some(name) = requested {
        let backend = Backend::from_str(name)?;
        if !credentials.has(backend) {
            return Err(Error::validation(format!(
                "{} requires {} to be set",
                backend.display_name(),
                backend.env_var()
            )));
        }
        return Ok(selection(backend, false));
    }

    Ok(match credentials.available().first() {
        Some(&backend) => selection(backend, false),
        None => selection(Backend::OpenAi, true),
    })
}

/// Pick a backend from resolved chat settings and environment credentials.
///
/// A model named explicitly by a flag or the config file replaces the
/// backend's default model.
///
/// # Errors
///
/// See [`select_backend`].
pub fn select_for_chat(chat: &ResolvedChat, credentials: &Credentials) -> Result<Selection> {
    let credentials = credentials.clone().with_chat(chat);
    let mut selected = select_backend(chat.backend.as_deref(), &credentials)?;
    if chat.model_source != Source::Default {
        selected.model.clone_from(&chat.model);
    }
    Ok(selected)
}

fn selection(backend: Backend, credentials_missing: bool) -> Selection {
    Selection { backend, model: backend.default_model().to_string(), credentials_missing }
}
