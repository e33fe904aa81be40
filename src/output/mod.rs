use console::style;
use std::io::{self, Write};

use crate::summarize::Summary;
use crate::utils::format_summary;
use crate::SummarizerError;

/// Width of the rule printed under a summary
const RULE_WIDTH: usize = 50;

/// Write a summary with its heading and closing rule
pub fn write_summary<W: Write>(out: &mut W, summary: &Summary) -> io::Result<()> {
    writeln!(out, "\n{}", style("=== Video Summary ===").bold().green())?;
    writeln!(out, "{}", format_summary(&summary.to_string()))?;
    writeln!(out, "\n{}\n", "=".repeat(RULE_WIDTH))
}

/// Explain a failed transcript request and how to recover
pub fn write_transcript_failure<W: Write>(out: &mut W, error: &SummarizerError) -> io::Result<()> {
    match error {
        SummarizerError::InvalidUrl(_) => {
            writeln!(out, "\n{} {}", style("Error:").red().bold(), error)?;
            writeln!(out, "Please use a complete YouTube URL like:")?;
            writeln!(out, "- https://www.youtube.com/watch?v=dQw4w9WgXcQ")?;
            writeln!(out, "- https://youtu.be/dQw4w9WgXcQ")?;
        }
        SummarizerError::DecoderMissing => {
            writeln!(out, "\n{} FFmpeg not found. Please install FFmpeg:", style("Error:").red().bold())?;
            writeln!(out, "- Windows: Run 'winget install -e --id Gyan.FFmpeg'")?;
            writeln!(out, "- Mac: Run 'brew install ffmpeg'")?;
            writeln!(out, "- Linux: Run 'sudo apt install ffmpeg' (Ubuntu) or equivalent")?;
            writeln!(out, "\nAfter installing, you may need to restart your terminal.")?;
        }
        SummarizerError::AudioDownload { ffmpeg, .. } => {
            writeln!(out, "\n{} {}", style("Error:").red().bold(), error)?;
            writeln!(out, "FFmpeg found at: {}", ffmpeg)?;
            writeln!(out, "But there might be an issue with the FFmpeg installation.")?;
            writeln!(out, "Try uninstalling and reinstalling FFmpeg:")?;
            writeln!(out, "1. Run: winget uninstall Gyan.FFmpeg")?;
            writeln!(out, "2. Run: winget install -e --id Gyan.FFmpeg")?;
            writeln!(out, "3. Restart your terminal")?;
        }
        other => writeln!(out, "{}", other)?,
    }

    writeln!(
        out,
        "Failed to fetch video transcript. Please check the URL and try again."
    )
}

/// Explain a failed summary request
pub fn write_summary_failure<W: Write>(out: &mut W, error: &SummarizerError) -> io::Result<()> {
    writeln!(out, "{}", error)?;
    writeln!(out, "Failed to generate summary.")
}
