//! Model backends.
//!
//! A backend turns a [`GenerateRequest`] into a chunk stream. Backends are
//! looked up by name in a [`BackendRegistry`] that the CLI layer builds from
//! configuration; nothing below this module reads configuration itself.

pub mod ollama;

use crate::error::GenerateError;
use crate::stream::ChunkStream;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// One generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: Option<u32>,
    /// Ask the backend for incremental chunks instead of one response.
    pub stream: bool,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            temperature: 0.7,
            max_tokens: None,
            stream: true,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// A model installed on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    /// Bytes on disk, when reported.
    pub size: Option<u64>,
    /// Date portion of the modification timestamp, when reported.
    pub modified: Option<String>,
}

/// Capability shared by every model server.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Short identifier used in configuration.
    fn name(&self) -> &'static str;

    /// Start a generation. With `request.stream == false` the stream yields a
    /// single final chunk.
    async fn generate(&self, request: &GenerateRequest) -> Result<ChunkStream, GenerateError>;

    /// Models available for generation.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, GenerateError>;
}

/// Backends registered by name.
#[derive(Default)]
pub struct BackendRegistry {
    backends: BTreeMap<String, Box<dyn ModelBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, backend: Box<dyn ModelBackend>) {
        self.backends.insert(backend.name().to_string(), backend);
    }

    pub fn get(&self, name: &str) -> Option<&dyn ModelBackend> {
        self.backends.get(name).map(|b| b.as_ref())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }
}

/// Outcome of matching a requested model against the installed ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelChoice {
    /// The requested model is installed.
    Requested(String),
    /// Fell back to another installed model.
    Fallback { requested: String, chosen: String },
    /// Nothing is installed.
    NoneInstalled,
}

/// Pick the model to use: the requested one if installed, else the default,
/// else the first installed model.
pub fn choose_model(installed: &[ModelInfo], requested: &str, default: &str) -> ModelChoice {
    let has = |name: &str| installed.iter().any(|m| m.name == name);

    if has(requested) {
        return ModelChoice::Requested(requested.to_string());
    }
    let chosen = if has(default) {
        default.to_string()
    } else if let Some(first) = installed.first() {
        first.name.clone()
    } else {
        return ModelChoice::NoneInstalled;
    };
    ModelChoice::Fallback {
        requested: requested.to_string(),
        chosen,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn models(names: &[&str]) -> Vec<ModelInfo> {
        names
            .iter()
            .map(|name| ModelInfo {
                name: name.to_string(),
                size: None,
                modified: None,
            })
            .collect()
    }

    #[test]
    fn test_choose_requested_model() {
        let installed = models(&["llama3.2:3b", "deepseek-r1:7b"]);
        assert_eq!(
            choose_model(&installed, "llama3.2:3b", "deepseek-r1:7b"),
            ModelChoice::Requested("llama3.2:3b".to_string())
        );
    }

    #[test]
    fn test_choose_falls_back_to_default() {
        let installed = models(&["llama3.2:3b", "deepseek-r1:7b"]);
        assert_eq!(
            choose_model(&installed, "qwen2.5-coder:7b", "deepseek-r1:7b"),
            ModelChoice::Fallback {
                requested: "qwen2.5-coder:7b".to_string(),
                chosen: "deepseek-r1:7b".to_string(),
            }
        );
    }

    #[test]
    fn test_choose_falls_back_to_first_installed() {
        let installed = models(&["llama3.2:3b", "mistral:7b"]);
        assert_eq!(
            choose_model(&installed, "qwen2.5-coder:7b", "deepseek-r1:7b"),
            ModelChoice::Fallback {
                requested: "qwen2.5-coder:7b".to_string(),
                chosen: "llama3.2:3b".to_string(),
            }
        );
    }

    #[test]
    fn test_choose_with_nothing_installed() {
        assert_eq!(
            choose_model(&[], "deepseek-r1:7b", "deepseek-r1:7b"),
            ModelChoice::NoneInstalled
        );
    }

    #[test]
    fn test_request_builder() {
        let request = GenerateRequest::new("deepseek-r1:7b", "hello")
            .with_system("be brief")
            .with_temperature(0.3)
            .with_max_tokens(Some(512))
            .with_stream(false);
        assert_eq!(request.system.as_deref(), Some("be brief"));
        assert_eq!(request.temperature, 0.3);
        assert_eq!(request.max_tokens, Some(512));
        assert!(!request.stream);
    }

    struct Canned;

    #[async_trait]
    impl ModelBackend for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<ChunkStream, GenerateError> {
            let chunk = crate::stream::StreamChunk {
                delta: request.prompt.to_uppercase(),
                is_final: true,
                stats: None,
            };
            Ok(futures::stream::iter(vec![Ok(chunk)]).boxed())
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>, GenerateError> {
            Ok(models(&["canned:1b"]))
        }
    }

    #[tokio::test]
    async fn test_registry_lookup() {
        let mut registry = BackendRegistry::new();
        registry.register(Box::new(Canned));
        assert_eq!(registry.names(), vec!["canned"]);
        assert!(registry.get("ollama").is_none());

        let backend = registry.get("canned").unwrap();
        let mut stream = backend
            .generate(&GenerateRequest::new("canned:1b", "hi"))
            .await
            .unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.delta, "HI");
    }
}
