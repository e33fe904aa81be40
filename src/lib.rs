//! Video Summarizer - A Rust CLI tool for summarizing YouTube videos
//!
//! This library fetches a transcript for a video (platform captions, translated or
//! auto-generated captions, or speech recognition over the downloaded audio) and
//! condenses it into a one or two paragraph abstractive summary.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod pipeline;
pub mod summarize;
pub mod transcribe;
pub mod utils;

pub use cli::Cli;
pub use config::Config;
pub use extractors::{CaptionSource, CaptionTrack, VideoId};
pub use pipeline::SummaryPipeline;
pub use summarize::{Summarizer, Summary};
pub use transcribe::{Transcript, TranscriptAcquirer, TranscriptSource};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Outcomes that end a single summarization request
#[derive(thiserror::Error, Debug)]
pub enum SummarizerError {
    #[error("Invalid YouTube URL format: {0}")]
    InvalidUrl(String),

    #[error("Could not transcribe video {0} through any available method")]
    NoTranscript(String),

    #[error("FFmpeg not found, audio transcription is unavailable")]
    DecoderMissing,

    #[error("Could not download audio for video {video}")]
    AudioDownload { video: String, ffmpeg: String },

    #[error("No transcript available to summarize.")]
    NothingToSummarize,

    #[error("Text is too short to summarize ({0} characters)")]
    TooShort(usize),

    #[error("Could not generate a meaningful summary: {0}")]
    NoSummary(String),
}
