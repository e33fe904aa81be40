use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod captions;
pub mod youtube;

pub use captions::YtDlpCaptionSource;
pub use youtube::{VideoId, YoutubeAudioDownloader};

use crate::Result;

/// A caption track advertised for a video
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    /// Language code (en, de, pt-BR, ...)
    pub language_code: String,

    /// Human readable language name if the platform reports one
    pub language: Option<String>,

    /// Whether the track was generated by automatic speech recognition
    pub generated: bool,

    /// Where the track can be fetched in json3 format
    pub url: String,
}

impl CaptionTrack {
    /// Language name for display, falling back to the code
    pub fn display_language(&self) -> &str {
        self.language.as_deref().unwrap_or(&self.language_code)
    }
}

/// Supported audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    M4a,
    Wav,
    Flac,
    Ogg,
    Opus,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Opus => "opus",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "m4a" | "aac" => Some(AudioFormat::M4a),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "ogg" => Some(AudioFormat::Ogg),
            "opus" => Some(AudioFormat::Opus),
            _ => None,
        }
    }

    /// Get MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Opus => "audio/opus",
        }
    }
}

/// Caption retrieval service keyed by video identifier
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Fetch a manually authored track in the first available preferred language
    async fn fetch_transcript(&self, video_id: &VideoId, languages: &[String]) -> Result<String>;

    /// List every caption track of the video, manual tracks first
    async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>>;

    /// Fetch a listed track as plain text
    async fn fetch_track(&self, track: &CaptionTrack) -> Result<String>;

    /// Fetch a listed track machine-translated into `target_language`
    async fn translate_track(&self, track: &CaptionTrack, target_language: &str) -> Result<String>;
}

/// Media download utility keyed by source URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioDownloader: Send + Sync {
    /// Download the best audio stream into `dest_dir`, converted with the given ffmpeg,
    /// and return the path of the converted file
    async fn download_audio(&self, url: &str, ffmpeg: &Path, dest_dir: &Path) -> Result<PathBuf>;
}
