//! Embedding capability and the OpenAI-compatible HTTP client

use std::time::Duration;

use async_trait::async_trait;
use chatprobe_common::config::EmbeddingSettings;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GradeError, GradeResult};

/// Maps text to a fixed-dimensional vector.
///
/// Implementations are loaded once and shared for the whole process; the
/// same input must always produce the same vector.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn encode(&self, text: &str) -> GradeResult<Vec<f32>>;

    fn cosine_similarity(&self, a: &[f32], b: &[f32]) -> f64 {
        cosine_similarity(a, b)
    }
}

#[async_trait]
impl<M: EmbeddingModel + ?Sized> EmbeddingModel for &M {
    async fn encode(&self, text: &str) -> GradeResult<Vec<f32>> {
        (**self).encode(text).await
    }

    fn cosine_similarity(&self, a: &[f32], b: &[f32]) -> f64 {
        (**self).cosine_similarity(a, b)
    }
}

/// Cosine similarity clamped to [0, 1]. Returns 0.0 for zero-norm inputs
/// and for vectors of different dimension.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible `/embeddings` endpoint
pub struct HttpEmbedder {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl HttpEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> GradeResult<Self> {
        Self::build(base_url.into(), model.into(), None, Duration::from_secs(30))
    }

    /// Build a client from configuration, reading the bearer token from
    /// the configured environment variable when one is named.
    pub fn from_settings(settings: &EmbeddingSettings) -> GradeResult<Self> {
        let api_key = match &settings.api_key_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                GradeError::Embedding(format!("environment variable {} is not set", var))
            })?),
            None => None,
        };

        Self::build(
            settings.endpoint.clone(),
            settings.model.clone(),
            api_key,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn build(
        base_url: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> GradeResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| GradeError::Embedding(format!("invalid API key: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingModel for HttpEmbedder {
    async fn encode(&self, text: &str) -> GradeResult<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url);
        debug!(model = %self.model, chars = text.len(), "Embedding request");

        let response = self
            .http
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GradeError::Embedding(format!("{}: {}", status, body)));
        }

        let parsed: EmbeddingResponse = response.json().await?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| GradeError::Embedding("no embedding in response".to_string()))
    }
}
