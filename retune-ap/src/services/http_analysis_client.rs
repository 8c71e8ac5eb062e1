//! HTTP key/tempo analysis client
//!
//! Talks to a remote analysis service. Two request modes:
//! - `Url`: POST `{"audio_url": "<source url>"}` and let the service fetch the audio
//! - `Upload`: POST the downloaded file as a streamed `application/octet-stream` body
//!
//! The response schema differs between services, so key, scale and tempo are
//! located with JSON pointers (RFC 6901).

use crate::models::AnalysisResult;
use crate::types::{AnalysisError, AnalysisProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

const USER_AGENT: &str = concat!("retune/", env!("CARGO_PKG_VERSION"));

/// How the audio reaches the analysis service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    #[default]
    Url,
    Upload,
}

/// Response field locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePointers {
    /// Key name, or key root when `scale` is set
    pub key: String,
    /// Optional separate scale field ("major"/"minor")
    pub scale: Option<String>,
    pub tempo: String,
}

impl Default for ResponsePointers {
    fn default() -> Self {
        Self {
            key: "/key".to_string(),
            scale: None,
            tempo: "/tempo".to_string(),
        }
    }
}

/// HTTP analysis client
pub struct HttpAnalysisClient {
    http_client: Client,
    endpoint: String,
    api_key: Option<String>,
    mode: RequestMode,
    pointers: ResponsePointers,
}

impl HttpAnalysisClient {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        mode: RequestMode,
        pointers: ResponsePointers,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.to_string(),
            api_key,
            mode,
            pointers,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Normalize a service response into an [`AnalysisResult`]
    pub fn parse_response(&self, body: &Value) -> AnalysisResult {
        let key = body
            .pointer(&self.pointers.key)
            .and_then(Value::as_str)
            .map(|root| {
                let scale = self
                    .pointers
                    .scale
                    .as_deref()
                    .and_then(|p| body.pointer(p))
                    .and_then(Value::as_str)
                    .filter(|s| !s.trim().is_empty());
                match scale {
                    Some(scale) => format!("{} {}", root.trim(), capitalize(scale.trim())),
                    None => root.to_string(),
                }
            });

        let tempo = body.pointer(&self.pointers.tempo).and_then(tempo_value);
        AnalysisResult::new(key, tempo)
    }
}

/// Tempo as a number, a numeric string, or the first element of an array
fn tempo_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Array(items) => items.first().and_then(tempo_value),
        _ => None,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.map(|c| c.to_ascii_lowercase())).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl AnalysisProvider for HttpAnalysisClient {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn analyze(
        &self,
        audio_path: &Path,
        source_url: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        tracing::debug!(endpoint = %self.endpoint, mode = ?self.mode, "Requesting analysis");

        let mut request = self.http_client.post(&self.endpoint);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        request = match self.mode {
            RequestMode::Url => request.json(&serde_json::json!({ "audio_url": source_url })),
            RequestMode::Upload => {
                let file = tokio::fs::File::open(audio_path).await?;
                let size = file.metadata().await?.len();
                let stream = reqwest::Body::wrap_stream(tokio_util::io::ReaderStream::new(file));
                request
                    .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                    .header(reqwest::header::CONTENT_LENGTH, size)
                    .body(stream)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Api(status.as_u16(), error_text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::Parse(e.to_string()))?;

        let result = self.parse_response(&body);
        if result.is_empty() {
            return Err(AnalysisError::Parse(format!(
                "response has neither {} nor {}",
                self.pointers.key, self.pointers.tempo
            )));
        }

        tracing::info!(
            endpoint = %self.endpoint,
            has_key = result.detected_key.is_some(),
            has_tempo = result.detected_tempo.is_some(),
            "Analysis service responded"
        );
        Ok(result)
    }
}
