//! Error taxonomy for talking to the model server.
//!
//! Command glue works in `anyhow::Result`; everything below the command layer
//! returns [`GenerateError`] so callers can tell a dead server from a slow one.

use thiserror::Error;

/// Failures produced while generating text from a backend.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The backend could not be reached at all.
    #[error("could not connect to the model server at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The end-to-end request timeout elapsed.
    #[error("the model server did not finish within {secs}s")]
    Timeout { secs: u64 },

    /// A single stream line was not valid JSON. The stream reader skips these.
    #[error("malformed stream chunk: {line}")]
    MalformedChunk {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// The backend answered with an error status, or reported an `error`
    /// field mid-stream (no status in that case).
    #[error(
        "model server error{}: {message}",
        .status.map(|s| format!(" ({})", s)).unwrap_or_default()
    )]
    Backend { status: Option<u16>, message: String },

    /// The requested model is not installed on the backend.
    #[error("model '{model}' is not available on the model server")]
    ModelNotFound { model: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing rendered text failed (closed pipe, full disk).
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    /// The user interrupted generation.
    #[error("interrupted")]
    Interrupted,
}

impl GenerateError {
    /// Classify a transport error, keeping the URL for connection failures.
    pub fn from_transport(err: reqwest::Error, url: &str, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            GenerateError::Timeout { secs: timeout_secs }
        } else if err.is_connect() {
            GenerateError::Connection {
                url: url.to_string(),
                source: err,
            }
        } else {
            GenerateError::Http(err)
        }
    }

    /// A one-line suggestion shown under the error message, if any.
    pub fn hint(&self) -> Option<String> {
        match self {
            GenerateError::Connection { .. } => {
                Some("Is Ollama running? Start it with: ollama serve".to_string())
            }
            GenerateError::Timeout { .. } => Some(
                "Raise the timeout with: aidev api config --set ollama.timeout_secs=120"
                    .to_string(),
            ),
            GenerateError::ModelNotFound { model } => {
                Some(format!("Pull it with: ollama pull {}", model))
            }
            _ => None,
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            GenerateError::Interrupted => 130,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_not_found_hint() {
        let err = GenerateError::ModelNotFound {
            model: "llama3.2:3b".to_string(),
        };
        assert_eq!(err.hint().unwrap(), "Pull it with: ollama pull llama3.2:3b");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_interrupted_exit_code() {
        assert_eq!(GenerateError::Interrupted.exit_code(), 130);
        assert!(GenerateError::Interrupted.hint().is_none());
    }

    #[test]
    fn test_backend_message() {
        let err = GenerateError::Backend {
            status: Some(500),
            message: "out of memory".to_string(),
        };
        assert_eq!(err.to_string(), "model server error (500): out of memory");

        let err = GenerateError::Backend {
            status: None,
            message: "model crashed".to_string(),
        };
        assert_eq!(err.to_string(), "model server error: model crashed");
    }
}
