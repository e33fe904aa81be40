use clap::Parser;
use std::future::Future;
use std::path::PathBuf;

pub mod prompt;

pub use prompt::{handle_url, run_prompt};

#[derive(Parser, Debug)]
#[command(
    name = "video-summarizer",
    about = "Video Summarizer - Summarize YouTube videos from their captions or audio",
    version,
    long_about = "Fetches a transcript for a YouTube video (captions, translated captions, or speech recognition over the audio) and condenses it into a short abstractive summary. Without a URL it starts an interactive prompt."
)]
pub struct Cli {
    /// Video URL to summarize once (starts the interactive prompt if omitted)
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Configuration file (defaults to ./config.yaml or the user config directory)
    #[arg(short, long, value_name = "FILE", env = "VIDEO_SUMMARIZER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Show current configuration and exit
    #[arg(long)]
    pub show_config: bool,
}

/// Run `work` unless `interrupt` completes first.
///
/// On interruption `work` is dropped before this returns, so anything it holds
/// (download directories, yt-dlp children) is released.
pub async fn interruptible<F, I>(work: F, interrupt: I) -> Option<F::Output>
where
    F: Future,
    I: Future,
{
    tokio::select! {
        output = work => Some(output),
        _ = interrupt => None,
    }
}
