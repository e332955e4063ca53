//! Remote scoring service client
//!
//! `POST {scorer_url}/analyze_images` with one JSON body carrying every
//! slot (null when empty) and the category. The service answers with
//! optional partial scores (0-100) and an optional `error_msg`.
//!
//! Exactly one request per analysis; nothing here retries.

use crate::error::ScoringError;
use async_trait::async_trait;
use posescore_common::config::TomlConfig;
use posescore_common::{Artifact, Category, SlotKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("posescore-booth/", env!("CARGO_PKG_VERSION"));

/// Request body for `/analyze_images`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzeRequest {
    pub happy: Option<Artifact>,
    pub serious: Option<Artifact>,
    pub body: Option<Artifact>,
    pub gender: Category,
}

impl AnalyzeRequest {
    /// Number of images carried by the request
    pub fn image_count(&self) -> usize {
        [&self.happy, &self.serious, &self.body]
            .iter()
            .filter(|a| a.is_some())
            .count()
    }

    pub fn slot(&self, slot: SlotKind) -> Option<&Artifact> {
        match slot {
            SlotKind::Happy => self.happy.as_ref(),
            SlotKind::Serious => self.serious.as_ref(),
            SlotKind::Body => self.body.as_ref(),
        }
    }
}

/// Response body of `/analyze_images`
///
/// `final_score` is never sent by the service; the aggregator fills it in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreResponse {
    #[serde(default)]
    pub emotion_score: Option<f64>,
    #[serde(default)]
    pub symmetry_score: Option<f64>,
    #[serde(default)]
    pub body_score: Option<f64>,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,
}

impl ScoreResponse {
    /// True when at least one partial score is present
    pub fn has_partial_scores(&self) -> bool {
        self.emotion_score.is_some() || self.symmetry_score.is_some() || self.body_score.is_some()
    }

    /// Server error text, ignoring empty strings
    pub fn server_error(&self) -> Option<&str> {
        self.error_msg.as_deref().filter(|m| !m.trim().is_empty())
    }
}

/// Remote scorer capability
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<ScoreResponse, ScoringError>;
}

/// reqwest-backed scorer
pub struct HttpScorer {
    http_client: reqwest::Client,
    analyze_url: String,
}

impl HttpScorer {
    /// Create a client for the given analysis endpoint URL
    ///
    /// `timeout` of `None` leaves the request bounded only by the transport.
    pub fn new(analyze_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ScoringError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ScoringError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            analyze_url: analyze_url.into(),
        })
    }

    pub fn from_config(config: &TomlConfig) -> Result<Self, ScoringError> {
        Self::new(config.analyze_url(), config.request_timeout())
    }

    pub fn analyze_url(&self) -> &str {
        &self.analyze_url
    }
}

#[async_trait]
impl Scorer for HttpScorer {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<ScoreResponse, ScoringError> {
        tracing::debug!(
            url = %self.analyze_url,
            images = request.image_count(),
            gender = %request.gender,
            "Posting images to scoring service"
        );

        let response = self
            .http_client
            .post(&self.analyze_url)
            .json(request)
            .send()
            .await
            .map_err(|e| ScoringError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let scores: ScoreResponse = response
            .json()
            .await
            .map_err(|e| ScoringError::Parse(e.to_string()))?;

        tracing::info!(
            emotion = ?scores.emotion_score,
            symmetry = ?scores.symmetry_score,
            body = ?scores.body_score,
            has_error = scores.server_error().is_some(),
            "Scoring service responded"
        );

        Ok(scores)
    }
}
