use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::extractors::AudioFormat;
use crate::summarize::GenerationParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Caption retrieval settings
    pub captions: CaptionsConfig,

    /// Audio download and conversion settings
    pub audio: AudioConfig,

    /// Speech recognition service
    pub speech: SpeechConfig,

    /// Summarization service and chunking
    pub summarizer: SummarizerConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionsConfig {
    /// yt-dlp executable used for captions and audio
    pub yt_dlp_path: String,

    /// Languages tried by the direct caption fetch, in order
    pub languages: Vec<String>,

    /// Language that generated or translated captions must end up in
    pub target_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Codec the downloaded audio is converted to
    pub audio_format: AudioFormat,

    /// Conversion quality handed to ffmpeg (kbps)
    pub audio_quality: String,

    /// Explicit ffmpeg binary, skips the search when set
    pub ffmpeg_path: Option<PathBuf>,

    /// Parent directory for the scoped download directory
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// OpenAI-compatible transcription endpoint
    pub endpoint: String,

    /// Model name sent with each request
    pub model: String,

    /// Environment variable holding the bearer token (optional for local servers)
    pub api_key_env: String,

    /// Spoken language hint (auto-detect if not specified)
    pub language: Option<String>,

    /// Largest upload the endpoint accepts in MB (OpenAI rejects files over 25 MB,
    /// about 17 minutes at 192 kbps); `null` disables the check for local servers
    pub max_upload_mb: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Inference endpoint of the summarization model
    pub endpoint: String,

    /// Environment variable holding the bearer token
    pub api_key_env: String,

    /// Characters per chunk
    pub chunk_size: usize,

    /// Chunks at or below this many characters are skipped
    pub min_chunk_chars: usize,

    /// Inputs below this many characters are not summarized
    pub min_input_chars: usize,

    /// Summaries with at least this many words are split into two paragraphs
    pub paragraph_split_words: usize,

    /// Generation parameters for each chunk
    pub generation: GenerationParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Show spinners for long-running steps
    pub show_progress: bool,
}

impl Default for CaptionsConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            languages: vec!["en".to_string()],
            target_language: "en".to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            audio_format: AudioFormat::Mp3,
            audio_quality: "192".to_string(),
            ffmpeg_path: None,
            temp_dir: None,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            model: "whisper-1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            language: None,
            max_upload_mb: Some(25),
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co/models/facebook/bart-large-cnn"
                .to_string(),
            api_key_env: "HF_TOKEN".to_string(),
            chunk_size: 1000,
            min_chunk_chars: 100,
            min_input_chars: 50,
            paragraph_split_words: 50,
            generation: GenerationParams::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { show_progress: true }
    }
}

impl Config {
    /// Load configuration from an explicit path, the usual locations, or defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover_path(),
        };

        let config = match path {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                tracing::debug!("No configuration file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config file")
    }

    /// First existing config file: `./config.yaml`, then the user config directory
    fn discover_path() -> Option<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("video-summarizer").join("config.yaml"))
            .filter(|path| path.exists())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.captions.languages.is_empty() {
            anyhow::bail!("At least one caption language must be configured");
        }

        if self.summarizer.chunk_size == 0 {
            anyhow::bail!("Summarizer chunk_size must be greater than zero");
        }

        let generation = &self.summarizer.generation;
        if generation.num_beams == 0 {
            anyhow::bail!("Summarizer num_beams must be at least 1");
        }
        if generation.min_length > generation.max_length {
            anyhow::bail!(
                "Summarizer min_length ({}) exceeds max_length ({})",
                generation.min_length,
                generation.max_length
            );
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  yt-dlp: {}", self.captions.yt_dlp_path);
        println!("  Caption Languages: {}", self.captions.languages.join(", "));
        println!("  Target Language: {}", self.captions.target_language);
        match &self.audio.ffmpeg_path {
            Some(path) => println!("  FFmpeg: {}", path.display()),
            None => println!("  FFmpeg: auto-detect"),
        }
        println!("  Speech Endpoint: {}", self.speech.endpoint);
        println!("  Speech Model: {}", self.speech.model);
        match self.speech.max_upload_mb {
            Some(limit) => println!("  Speech Upload Limit: {} MB", limit),
            None => println!("  Speech Upload Limit: none"),
        }
        println!("  Summarizer Endpoint: {}", self.summarizer.endpoint);
        println!("  Chunk Size: {}", self.summarizer.chunk_size);
    }
}

/// Read an API key from the named environment variable, ignoring blanks
pub fn api_key_from_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
