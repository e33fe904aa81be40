use console::style;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::output;
use crate::pipeline::SummaryPipeline;

const QUIT: &str = "q";

/// Fetch, summarize and print one URL. Returns whether a summary was printed.
pub async fn handle_url<W: Write>(
    pipeline: &SummaryPipeline,
    url: &str,
    out: &mut W,
) -> io::Result<bool> {
    writeln!(out, "\nFetching video transcript...")?;
    out.flush()?;

    let transcript = match pipeline.fetch_transcript(url).await {
        Ok(transcript) => transcript,
        Err(e) => {
            output::write_transcript_failure(out, &e)?;
            return Ok(false);
        }
    };

    writeln!(out, "Generating summary...")?;
    out.flush()?;

    match pipeline.summarize(&transcript).await {
        Ok(summary) => {
            output::write_summary(out, &summary)?;
            Ok(true)
        }
        Err(e) => {
            output::write_summary_failure(out, &e)?;
            Ok(false)
        }
    }
}

/// Interactive loop: read URLs until `q` or end of input
pub async fn run_prompt<R: AsyncBufRead + Unpin, W: Write>(
    pipeline: &SummaryPipeline,
    mut input: R,
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "\n{}", style("=== YouTube Video Summarizer ===").bold())?;
    writeln!(out, "Enter a YouTube video URL (or '{}' to quit):", QUIT)?;

    let mut line = String::new();
    loop {
        write!(out, "\nYouTube URL > ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line).await? == 0 {
            writeln!(out, "\nGoodbye!")?;
            return Ok(());
        }

        let url = line.trim();
        if url.eq_ignore_ascii_case(QUIT) {
            writeln!(out, "Goodbye!")?;
            return Ok(());
        }

        if url.is_empty() {
            writeln!(out, "Please enter a valid URL!")?;
            continue;
        }

        handle_url(pipeline, url, out).await?;
    }
}
