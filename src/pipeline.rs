use crate::config::Config;
use crate::summarize::{Summarizer, Summary};
use crate::transcribe::{Transcript, TranscriptAcquirer};
use crate::SummarizerError;

/// Transcript acquisition followed by summarization, kept for the life of the process
pub struct SummaryPipeline {
    acquirer: TranscriptAcquirer,
    summarizer: Summarizer,
}

impl SummaryPipeline {
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            TranscriptAcquirer::from_config(config),
            Summarizer::from_config(config),
        )
    }

    pub fn new(acquirer: TranscriptAcquirer, summarizer: Summarizer) -> Self {
        Self {
            acquirer,
            summarizer,
        }
    }

    pub async fn fetch_transcript(&self, url: &str) -> Result<Transcript, SummarizerError> {
        self.acquirer.fetch_transcript(url).await
    }

    pub async fn summarize(&self, transcript: &Transcript) -> Result<Summary, SummarizerError> {
        tracing::debug!(
            "Summarizing {} characters from {}",
            transcript.text.chars().count(),
            transcript.source
        );
        self.summarizer.summarize(&transcript.text).await
    }
}
