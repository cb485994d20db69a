//! Configuration management for aidev.
//!
//! Configuration is loaded from `~/.config/aidev/config.toml`.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Name of the backend used for generation.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Ollama server settings.
    #[serde(default)]
    pub ollama: OllamaSettings,
    /// Output preferences.
    #[serde(default)]
    pub display: DisplaySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            ollama: OllamaSettings::default(),
            display: DisplaySettings::default(),
        }
    }
}

/// Connection settings for a local Ollama server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OllamaSettings {
    /// Server URL (default: http://localhost:11434).
    #[serde(default = "default_ollama_url")]
    pub url: String,
    /// Model used when none is given on the command line.
    #[serde(default = "default_ollama_model")]
    pub default_model: String,
    /// End-to-end request timeout in seconds, streaming included.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            default_model: default_ollama_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// How responses are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Print text as it arrives instead of all at once.
    #[serde(default = "default_true")]
    pub stream: bool,
    /// Show `<think>` reasoning blocks.
    #[serde(default = "default_true")]
    pub show_thinking: bool,
    /// Colour output when writing to a terminal.
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            stream: true,
            show_thinking: true,
            color: true,
        }
    }
}

fn default_backend() -> String {
    "ollama".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "deepseek-r1:7b".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

/// Keys accepted by [`Config::set`].
pub const SETTABLE_KEYS: &[&str] = &[
    "backend",
    "ollama.url",
    "ollama.default_model",
    "ollama.timeout_secs",
    "display.stream",
    "display.show_thinking",
    "display.color",
];

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("aidev"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Directory holding saved API requests.
    pub fn requests_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("requests"))
    }

    /// Load configuration from file, using defaults if not found.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Update one setting by dotted key, e.g. `ollama.timeout_secs`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "backend" => self.backend = non_empty(key, value)?,
            "ollama.url" => {
                self.ollama.url = non_empty(key, value)?.trim_end_matches('/').to_string()
            }
            "ollama.default_model" => self.ollama.default_model = non_empty(key, value)?,
            "ollama.timeout_secs" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("{} must be a whole number of seconds", key))?;
                if secs == 0 {
                    bail!("{} must be greater than zero", key);
                }
                self.ollama.timeout_secs = secs;
            }
            "display.stream" => self.display.stream = parse_bool(key, value)?,
            "display.show_thinking" => self.display.show_thinking = parse_bool(key, value)?,
            "display.color" => self.display.color = parse_bool(key, value)?,
            _ => bail!(
                "Unknown setting '{}'. Known settings: {}",
                key,
                SETTABLE_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Flattened `(key, value)` view for display.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("backend", self.backend.clone()),
            ("ollama.url", self.ollama.url.clone()),
            ("ollama.default_model", self.ollama.default_model.clone()),
            ("ollama.timeout_secs", self.ollama.timeout_secs.to_string()),
            ("display.stream", self.display.stream.to_string()),
            ("display.show_thinking", self.display.show_thinking.to_string()),
            ("display.color", self.display.color.to_string()),
        ]
    }
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        bail!("{} must not be empty", key);
    }
    Ok(value.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(anyhow!("{} must be true or false, got '{}'", key, value)),
    }
}
