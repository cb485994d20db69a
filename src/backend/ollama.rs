//! Ollama backend implementation.
//!
//! Ollama is a local LLM server. Generation uses `POST /api/generate`, which
//! answers with newline-delimited JSON when streaming and with a single JSON
//! object otherwise.

use super::{GenerateRequest, ModelBackend, ModelInfo};
use crate::config::OllamaSettings;
use crate::error::GenerateError;
use crate::stream::reader::WireChunk;
use crate::stream::{ChunkStream, StreamReader};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Timeout for metadata calls such as listing models.
const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Ollama backend for local LLM inference.
pub struct OllamaBackend {
    base_url: String,
    timeout_secs: u64,
    client: Client,
}

impl OllamaBackend {
    /// Create a new Ollama backend. The timeout bounds each whole request,
    /// including reading a streamed body.
    pub fn new(settings: &OllamaSettings) -> Result<Self, GenerateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            timeout_secs: settings.timeout_secs,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn transport_error(&self, err: reqwest::Error) -> GenerateError {
        GenerateError::from_transport(err, &self.base_url, self.timeout_secs)
    }
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<ChunkStream, GenerateError> {
        let url = self.endpoint("generate");
        let body = OllamaRequest {
            model: &request.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            stream: request.stream,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        info!(
            "Generating with {} (stream: {}, {} prompt bytes)",
            request.model,
            request.stream,
            request.prompt.len()
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = check_status(response, &request.model).await?;

        if request.stream {
            let body = Box::pin(response.bytes_stream());
            let reader = StreamReader::new(body, self.base_url.clone(), self.timeout_secs);
            Ok(reader.into_stream())
        } else {
            let wire: WireChunk = response.json().await.map_err(|e| self.transport_error(e))?;
            let chunk = wire.into_chunk()?;
            debug!("Received complete response ({} bytes)", chunk.delta.len());
            Ok(futures::stream::iter(vec![Ok(chunk)]).boxed())
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, GenerateError> {
        let response = self
            .client
            .get(self.endpoint("tags"))
            .timeout(METADATA_TIMEOUT)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = check_status(response, "").await?;

        let tags: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;
        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelInfo {
                name: m.name,
                size: m.size,
                modified: m
                    .modified_at
                    .map(|s| s.split('T').next().unwrap_or(s.as_str()).to_string()),
            })
            .collect())
    }
}

/// Turn an error status into a [`GenerateError`], reading Ollama's
/// `{"error": "..."}` body when present.
async fn check_status(response: Response, model: &str) -> Result<Response, GenerateError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<OllamaError>(&body) {
        Ok(err) => err.error,
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => body.trim().to_string(),
    };

    if status == StatusCode::NOT_FOUND && !model.is_empty() && message.contains("not found") {
        return Err(GenerateError::ModelNotFound {
            model: model.to_string(),
        });
    }
    Err(GenerateError::Backend {
        status: Some(status.as_u16()),
        message,
    })
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    modified_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accept one connection, capture the request, and answer with `response`.
    async fn serve_once(response: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (url, handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).to_string()
    }

    fn http_response(status: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nConnection: close\r\n\r\n{}",
            status, content_type, body
        )
    }

    fn backend(url: &str) -> OllamaBackend {
        OllamaBackend::new(&OllamaSettings {
            url: url.to_string(),
            default_model: "deepseek-r1:7b".to_string(),
            timeout_secs: 10,
        })
        .unwrap()
    }

    async fn collect_deltas(mut stream: ChunkStream) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.unwrap().delta);
        }
        out
    }

    #[tokio::test]
    async fn test_streaming_generate() {
        let body = concat!(
            "{\"response\":\"<think>hm\",\"done\":false}\n",
            "not json\n",
            "{\"response\":\"</think>ls -la\",\"done\":false}\n",
            "{\"response\":\"\",\"done\":true,\"eval_count\":3}\n",
        );
        let (url, server) = serve_once(http_response("200 OK", "application/x-ndjson", body)).await;

        let request = GenerateRequest::new("deepseek-r1:7b", "list files")
            .with_system("terse")
            .with_temperature(0.3);
        let stream = backend(&url).generate(&request).await.unwrap();
        assert_eq!(collect_deltas(stream).await, vec!["<think>hm", "</think>ls -la", ""]);

        let captured = server.await.unwrap();
        assert!(captured.starts_with("POST /api/generate"));
        assert!(captured.contains("\"model\":\"deepseek-r1:7b\""));
        assert!(captured.contains("\"stream\":true"));
        assert!(captured.contains("\"system\":\"terse\""));
        assert!(!captured.contains("num_predict"));
    }

    #[tokio::test]
    async fn test_non_streaming_generate() {
        let body = "{\"response\":\"echo hi\",\"done\":true,\"eval_count\":2}";
        let (url, server) = serve_once(http_response("200 OK", "application/json", body)).await;

        let request = GenerateRequest::new("llama3.2:3b", "say hi")
            .with_stream(false)
            .with_max_tokens(Some(64));
        let mut stream = backend(&url).generate(&request).await.unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.delta, "echo hi");
        assert!(chunk.is_final);
        assert_eq!(chunk.stats.unwrap().eval_count, 2);
        assert!(stream.next().await.is_none());

        let captured = server.await.unwrap();
        assert!(captured.contains("\"stream\":false"));
        assert!(captured.contains("\"num_predict\":64"));
    }

    #[tokio::test]
    async fn test_missing_model_maps_to_model_not_found() {
        let body = "{\"error\":\"model \\\"nope:1b\\\" not found, try pulling it first\"}";
        let (url, _server) =
            serve_once(http_response("404 Not Found", "application/json", body)).await;

        let err = match backend(&url).generate(&GenerateRequest::new("nope:1b", "x")).await {
            Err(err) => err,
            Ok(_) => panic!("expected an error"),
        };
        assert!(matches!(err, GenerateError::ModelNotFound { ref model } if model == "nope:1b"));
    }

    #[tokio::test]
    async fn test_server_error_body_maps_to_backend_error() {
        let body = "{\"error\":\"llama runner process has terminated\"}";
        let (url, _server) =
            serve_once(http_response("500 Internal Server Error", "application/json", body)).await;

        let err = match backend(&url).generate(&GenerateRequest::new("m", "x")).await {
            Err(err) => err,
            Ok(_) => panic!("expected an error"),
        };
        match err {
            GenerateError::Backend { status, message } => {
                assert_eq!(status, Some(500));
                assert_eq!(message, "llama runner process has terminated");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = match backend(&url).generate(&GenerateRequest::new("m", "x")).await {
            Err(err) => err,
            Ok(_) => panic!("expected an error"),
        };
        assert!(matches!(err, GenerateError::Connection { .. }), "{:?}", err);
        assert!(err.hint().unwrap().contains("ollama serve"));
    }

    #[tokio::test]
    async fn test_stalled_stream_times_out_after_partial_text() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let line = "{\"response\":\"partial\",\"done\":false}\n";
            let head = "HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\n\
                        Transfer-Encoding: chunked\r\n\r\n";
            let first_chunk = format!("{}{:x}\r\n{}\r\n", head, line.len(), line);
            socket.write_all(first_chunk.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            // Hold the connection open without finishing the body.
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let backend = OllamaBackend::new(&OllamaSettings {
            url: url.clone(),
            default_model: "deepseek-r1:7b".to_string(),
            timeout_secs: 1,
        })
        .unwrap();
        let mut stream = backend
            .generate(&GenerateRequest::new("deepseek-r1:7b", "x"))
            .await
            .unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.delta, "partial");
        assert!(!first.is_final);
        match stream.next().await {
            Some(Err(GenerateError::Timeout { secs })) => assert_eq!(secs, 1),
            other => panic!("expected a timeout, got {:?}", other),
        }
        assert!(stream.next().await.is_none());
        server.abort();
    }

    #[tokio::test]
    async fn test_connection_error_names_base_url() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = match backend(&format!("{}/", url))
            .generate(&GenerateRequest::new("m", "x"))
            .await
        {
            Err(err) => err,
            Ok(_) => panic!("expected an error"),
        };
        match err {
            GenerateError::Connection { url: reported, .. } => assert_eq!(reported, url),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_models() {
        let body = r#"{"models":[
            {"name":"deepseek-r1:7b","size":4683087332,"modified_at":"2025-01-28T10:12:44.1Z"},
            {"name":"llama3.2:3b"}
        ]}"#;
        let (url, server) = serve_once(http_response("200 OK", "application/json", body)).await;

        let models = backend(&url).list_models().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "deepseek-r1:7b");
        assert_eq!(models[0].size, Some(4683087332));
        assert_eq!(models[0].modified.as_deref(), Some("2025-01-28"));
        assert_eq!(models[1].size, None);

        assert!(server.await.unwrap().starts_with("GET /api/tags"));
    }
}
