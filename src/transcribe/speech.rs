use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;

use crate::config::{api_key_from_env, SpeechConfig};
use crate::extractors::AudioFormat;
use crate::Result;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// One recognized stretch of speech
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeechSegment {
    pub text: String,
}

/// Speech-to-text model invoked with an audio file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<SpeechSegment>>;
}

/// Join recognized segments into one transcript
pub fn join_segments(segments: &[SpeechSegment]) -> String {
    segments
        .iter()
        .map(|segment| segment.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Client for an OpenAI-compatible `audio/transcriptions` endpoint
pub struct WhisperApiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    language: Option<String>,
    api_key: Option<String>,
    max_upload_bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<SpeechSegment>,
}

impl WhisperApiClient {
    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        let api_key = api_key_from_env(&config.api_key_env);
        if api_key.is_none() {
            tracing::debug!(
                "{} is not set, calling {} without credentials",
                config.api_key_env,
                config.endpoint
            );
        }

        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build speech recognition client")?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            language: config.language.clone(),
            api_key,
            max_upload_bytes: config.max_upload_mb.map(|mb| mb * BYTES_PER_MB),
        })
    }

    fn build_form(&self, audio_path: &Path, content: Vec<u8>) -> Result<Form> {
        let format = audio_path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(AudioFormat::from_extension)
            .unwrap_or(AudioFormat::Mp3);

        let file_name = audio_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("audio.{}", format.as_str()));

        let part = Part::bytes(content)
            .file_name(file_name)
            .mime_str(format.mime_type())?;

        let mut form = Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .part("file", part);

        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        Ok(form)
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperApiClient {
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<SpeechSegment>> {
        tracing::debug!("Uploading {} to {}", audio_path.display(), self.endpoint);

        let size = tokio::fs::metadata(audio_path)
            .await
            .with_context(|| format!("Failed to read audio file {}", audio_path.display()))?
            .len();
        check_upload_size(size, self.max_upload_bytes)?;

        let content = tokio::fs::read(audio_path)
            .await
            .with_context(|| format!("Failed to read audio file {}", audio_path.display()))?;
        let form = self.build_form(audio_path, content)?;

        let mut request = self.http.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("Failed to reach speech recognition service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Speech recognition failed: HTTP {} {}", status, body.trim());
        }

        let body = response
            .text()
            .await
            .context("Failed to read speech recognition response")?;
        parse_transcription(&body)
    }
}

/// Refuse uploads the endpoint would reject anyway
fn check_upload_size(size: u64, limit: Option<u64>) -> Result<()> {
    match limit {
        Some(limit) if size > limit => anyhow::bail!(
            "Audio file is {:.1} MB, above the {} MB upload limit of the speech service \
             (lower audio.audio_quality or raise speech.max_upload_mb)",
            size as f64 / BYTES_PER_MB as f64,
            limit / BYTES_PER_MB
        ),
        _ => Ok(()),
    }
}

/// Segments from a `verbose_json` response, or the plain text as one segment
fn parse_transcription(body: &str) -> Result<Vec<SpeechSegment>> {
    let response: TranscriptionResponse =
        serde_json::from_str(body).context("Failed to parse speech recognition response")?;

    if !response.segments.is_empty() {
        return Ok(response.segments);
    }

    if response.text.trim().is_empty() {
        return Ok(Vec::new());
    }

    Ok(vec![SpeechSegment {
        text: response.text,
    }])
}
