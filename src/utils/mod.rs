use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

pub mod ffmpeg;
pub mod lazy;

pub use ffmpeg::FfmpegLocator;
pub use lazy::LazyModel;

/// Strict check of a watch-page or short-link URL with an 11 character identifier.
///
/// The acquisition path does not gate on this; it only logs when a URL parses but
/// fails here.
pub fn validate_youtube_url(url: &str) -> bool {
    static YOUTUBE_URL: OnceLock<Regex> = OnceLock::new();
    YOUTUBE_URL
        .get_or_init(|| {
            Regex::new(r"^(https?://)?(www\.)?(youtube\.com/watch\?v=|youtu\.be/)([a-zA-Z0-9_-]{11})$")
                .expect("static regex")
        })
        .is_match(url)
}

/// Tidy a summary for display
pub fn format_summary(summary: &str) -> String {
    summary.trim().to_string()
}

/// Spinner for a long-running step, hidden when progress output is off
pub fn spinner(message: impl Into<String>, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(message.into());
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}

/// Check if the current environment has required tools
pub async fn check_dependencies(yt_dlp_path: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp_path).await {
        missing.push(format!(
            "{} - required for captions and audio download",
            yt_dlp_path
        ));
    }

    missing
}

/// Check if a command runs with `--version`
pub async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
