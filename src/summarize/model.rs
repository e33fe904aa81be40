use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{api_key_from_env, SummarizerConfig};
use crate::Result;

/// Generation settings sent with every chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Upper bound on summary length in tokens
    pub max_length: u32,
    /// Lower bound on summary length in tokens
    pub min_length: u32,
    /// Sample instead of decoding deterministically
    pub do_sample: bool,
    /// Beam search width
    pub num_beams: u32,
    /// Values above 1.0 favour longer summaries
    pub length_penalty: f32,
    /// N-grams of this size may not repeat
    pub no_repeat_ngram_size: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: 150,
            min_length: 30,
            do_sample: false,
            num_beams: 4,
            length_penalty: 2.0,
            no_repeat_ngram_size: 3,
        }
    }
}

/// Sequence-to-sequence summarization model
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SummaryModel: Send + Sync {
    async fn summarize(&self, text: &str, params: &GenerationParams) -> Result<String>;
}

/// Client for a Hugging Face Inference API summarization endpoint
pub struct HuggingFaceSummarizer {
    http: reqwest::Client,
    endpoint: String,
    api_token: String,
}

#[derive(Serialize)]
struct SummaryRequest<'a> {
    inputs: &'a str,
    parameters: &'a GenerationParams,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SummaryResponse {
    Summaries(Vec<SummaryText>),
    Error { error: String },
}

#[derive(Debug, Deserialize)]
struct SummaryText {
    summary_text: String,
}

impl HuggingFaceSummarizer {
    pub fn from_config(config: &SummarizerConfig) -> Result<Self> {
        let api_token = api_key_from_env(&config.api_key_env).with_context(|| {
            format!(
                "{} must be set to use the summarization model at {}",
                config.api_key_env, config.endpoint
            )
        })?;

        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build summarization client")?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_token,
        })
    }
}

#[async_trait]
impl SummaryModel for HuggingFaceSummarizer {
    async fn summarize(&self, text: &str, params: &GenerationParams) -> Result<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&SummaryRequest {
                inputs: text,
                parameters: params,
            })
            .send()
            .await
            .context("Failed to reach summarization service")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read summarization response")?;

        if !status.is_success() {
            anyhow::bail!("Summarization failed: HTTP {} {}", status, body.trim());
        }

        parse_summary(&body)
    }
}

fn parse_summary(body: &str) -> Result<String> {
    let response: SummaryResponse =
        serde_json::from_str(body).context("Failed to parse summarization response")?;

    match response {
        SummaryResponse::Summaries(summaries) => summaries
            .into_iter()
            .next()
            .map(|summary| summary.summary_text)
            .context("Summarization response contained no summary"),
        SummaryResponse::Error { error } => anyhow::bail!("Summarization model error: {}", error),
    }
}
