//! Named API requests stored as JSON files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A request that can be replayed with `aidev api load <name> --execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRequest {
    pub name: String,
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub stream: bool,
    /// Local time, `%Y-%m-%d %H:%M:%S`.
    pub saved_at: String,
}

impl SavedRequest {
    pub fn new(name: &str, prompt: &str, model: &str, temperature: f32, stream: bool) -> Self {
        Self {
            name: name.to_string(),
            prompt: prompt.to_string(),
            model: model.to_string(),
            temperature,
            stream,
            saved_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Directory of saved requests, one `<name>.json` per request.
pub struct RequestStore {
    dir: PathBuf,
}

impl RequestStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{}.json", name)))
    }

    /// Write `request`, replacing any request with the same name.
    pub fn save(&self, request: &SavedRequest) -> Result<PathBuf> {
        let path = self.path_for(&request.name)?;
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create requests directory: {}", self.dir.display())
        })?;
        let contents = serde_json::to_string_pretty(request)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write saved request: {}", path.display()))?;
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<SavedRequest> {
        let path = self.path_for(name)?;
        if !path.exists() {
            bail!("Request '{}' not found. List saved requests with: aidev api saved", name);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read saved request: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse saved request: {}", path.display()))
    }

    /// All readable saved requests, sorted by name. Unreadable files are
    /// skipped with a warning.
    pub fn list(&self) -> Result<Vec<SavedRequest>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read {}", self.dir.display()))?;

        let mut requests = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = std::fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|c| serde_json::from_str::<SavedRequest>(&c).map_err(Into::into));
            match parsed {
                Ok(request) => requests.push(request),
                Err(e) => warn!("Skipping unreadable saved request {}: {}", path.display(), e),
            }
        }
        requests.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(requests)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        bail!(
            "Invalid request name '{}': use letters, digits, '-' and '_'",
            name
        );
    }
    Ok(())
}
