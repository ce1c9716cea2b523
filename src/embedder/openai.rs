//! OpenAI-compatible embedding client (`POST {base_url}/embeddings`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{Embedder, EmbedderError};

/// An [`Embedder`] backed by an OpenAI-compatible embeddings endpoint.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// Create a new embedder. Fails if `api_key` is empty.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Result<Self, EmbedderError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(EmbedderError::Misconfigured(
                "API key must not be empty".into(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimensions,
        })
    }
}

// ── API request/response types ─────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: ErrorDetail,
}

#[derive(Deserialize)]
pub(crate) struct ErrorDetail {
    pub(crate) message: String,
}

/// Pull the `error.message` out of an API error body, falling back to the raw body.
pub(crate) fn api_error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbedderError::InvalidResponse("API returned no embeddings".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(batch_size = texts.len(), model = %self.model, "embedding batch");

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "embedding request failed");
                EmbedderError::RequestFailed(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, "embedding API error");
            return Err(EmbedderError::Api(format!(
                "{status}: {}",
                api_error_detail(body)
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbedderError::InvalidResponse(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(EmbedderError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);

        if let Some(bad) = parsed
            .data
            .iter()
            .find(|d| d.embedding.len() != self.dimensions)
        {
            return Err(EmbedderError::InvalidResponse(format!(
                "expected {} dimensions, got {}",
                self.dimensions,
                bad.embedding.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::{Value, json};

    async fn spawn_api(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let result = OpenAiEmbedder::new("", "http://localhost", "m", 3);
        assert!(matches!(result, Err(EmbedderError::Misconfigured(_))));
    }

    #[test]
    fn test_api_error_detail() {
        let body = r#"{"error": {"message": "Incorrect API key provided"}}"#.to_string();
        assert_eq!(api_error_detail(body), "Incorrect API key provided");
        assert_eq!(api_error_detail("plain".to_string()), "plain");
    }

    #[tokio::test]
    async fn test_embed_batch_orders_by_index() {
        let app = Router::new().route(
            "/v1/embeddings",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "text-embedding-3-small");
                assert_eq!(body["input"].as_array().unwrap().len(), 2);
                Json(json!({
                    "data": [
                        {"index": 1, "embedding": [0.0, 1.0]},
                        {"index": 0, "embedding": [1.0, 0.0]}
                    ]
                }))
            }),
        );
        let base_url = spawn_api(app).await;

        let embedder =
            OpenAiEmbedder::new("sk-test", base_url, "text-embedding-3-small", 2).unwrap();
        let vectors = embedder.embed_batch(&["first", "second"]).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_api_error_surfaces_message() {
        let app = Router::new().route(
            "/v1/embeddings",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({"error": {"message": "Rate limit reached"}})),
                )
            }),
        );
        let base_url = spawn_api(app).await;

        let embedder = OpenAiEmbedder::new("sk-test", base_url, "m", 2).unwrap();
        let err = embedder.embed("hello").await.unwrap_err();
        match err {
            EmbedderError::Api(msg) => {
                assert!(msg.contains("429"), "got {msg}");
                assert!(msg.contains("Rate limit reached"), "got {msg}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let app = Router::new().route(
            "/v1/embeddings",
            post(|| async { Json(json!({"data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]})) }),
        );
        let base_url = spawn_api(app).await;

        let embedder = OpenAiEmbedder::new("sk-test", base_url, "m", 2).unwrap();
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, EmbedderError::InvalidResponse(_)));
    }
}
