//! Embedding provider boundary
//!
//! The adapter is fail-soft: provider errors never cross this boundary as
//! `Err`. Every input text maps to either a vector or an explicit
//! `Unavailable` with the reason, and batch output length always equals
//! input length. Ingestion and search carry on without vectors.

use crate::config::EmbeddingConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// The outcome of embedding one text
#[derive(Debug, Clone, PartialEq)]
pub enum Embedding {
    Vector(Vec<f32>),
    Unavailable(UnavailableReason),
}

impl Embedding {
    pub fn vector(&self) -> Option<&[f32]> {
        match self {
            Embedding::Vector(v) => Some(v),
            Embedding::Unavailable(_) => None,
        }
    }

    pub fn into_vector(self) -> Option<Vec<f32>> {
        match self {
            Embedding::Vector(v) => Some(v),
            Embedding::Unavailable(_) => None,
        }
    }
}

/// Why no vector was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// No API key configured; no network call was attempted
    MissingCredential,
    /// The provider call failed (network, quota, malformed response)
    Provider(String),
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::MissingCredential => f.write_str("no embedding credential configured"),
            UnavailableReason::Provider(msg) => write!(f, "embedding provider error: {msg}"),
        }
    }
}

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. Output length always equals input length;
    /// on any provider failure the whole batch is `Unavailable`.
    async fn embed_batch(&self, texts: &[String]) -> Vec<Embedding>;

    /// Embed a single text (query-time variant), same fail-soft contract.
    async fn embed_one(&self, text: &str) -> Embedding {
        self.embed_batch(std::slice::from_ref(&text.to_string()))
            .await
            .into_iter()
            .next()
            .unwrap_or(Embedding::Unavailable(UnavailableReason::Provider(
                "empty batch result".to_string(),
            )))
    }
}

/// OpenAI-compatible embedding client
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    config: EmbeddingConfig,
}

#[derive(Serialize)]
struct OpenAiRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// One batched request for all inputs. Any failure, including timeout,
    /// is an ordinary provider error; there is no retry and no
    /// partial-success decoding.
    async fn request(&self, texts: &[String], api_key: &str) -> anyhow::Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.config.api_base);

        let payload = OpenAiRequest {
            input: texts.to_vec(),
            model: self.config.model.clone(),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error {status}: {body}");
        }

        let parsed: OpenAiResponse = response.json().await?;
        Ok(parsed.data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Vec<Embedding> {
        if texts.is_empty() {
            return Vec::new();
        }

        // Cost/availability guard: no key, no network call
        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            return vec![Embedding::Unavailable(UnavailableReason::MissingCredential); texts.len()];
        };

        match self.request(texts, api_key).await {
            Ok(vectors) if vectors.len() == texts.len() => {
                metrics::counter!("tutorkb_embedding_requests_total", "status" => "success")
                    .increment(1);
                vectors.into_iter().map(Embedding::Vector).collect()
            }
            Ok(vectors) => {
                let reason = format!(
                    "response length mismatch: {} vectors for {} inputs",
                    vectors.len(),
                    texts.len()
                );
                tracing::warn!(%reason, "Embedding failed; continuing without vectors");
                metrics::counter!("tutorkb_embedding_requests_total", "status" => "error")
                    .increment(1);
                vec![Embedding::Unavailable(UnavailableReason::Provider(reason)); texts.len()]
            }
            Err(e) => {
                tracing::warn!(error = %e, "Embedding failed; continuing without vectors");
                metrics::counter!("tutorkb_embedding_requests_total", "status" => "error")
                    .increment(1);
                vec![
                    Embedding::Unavailable(UnavailableReason::Provider(e.to_string()));
                    texts.len()
                ]
            }
        }
    }
}

/// Deterministic embedder for tests and keyless local runs.
///
/// Fixture vectors can be pinned per text; anything else gets a vector
/// derived from its bytes, so equal texts always embed equally.
pub struct MockEmbedder {
    dimension: usize,
    fixtures: HashMap<String, Vec<f32>>,
    outage: Option<UnavailableReason>,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fixtures: HashMap::new(),
            outage: None,
        }
    }

    /// Pin the vector returned for an exact text
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.fixtures.insert(text.into(), vector);
        self
    }

    /// Make every call report the given unavailability
    pub fn with_outage(mut self, reason: UnavailableReason) -> Self {
        self.outage = Some(reason);
        self
    }

    fn derive(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimension];
        if self.dimension == 0 {
            return v;
        }
        for (i, b) in text.bytes().enumerate() {
            v[(i + b as usize) % self.dimension] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Vec<Embedding> {
        if let Some(reason) = &self.outage {
            return vec![Embedding::Unavailable(reason.clone()); texts.len()];
        }

        texts
            .iter()
            .map(|t| {
                self.fixtures
                    .get(t)
                    .cloned()
                    .map(Embedding::Vector)
                    .unwrap_or_else(|| Embedding::Vector(self.derive(t)))
            })
            .collect()
    }
}
