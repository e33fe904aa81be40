use std::fmt;
use std::sync::Arc;

use crate::config::{Config, SummarizerConfig};
use crate::utils::{self, LazyModel};
use crate::SummarizerError;

pub mod model;

pub use model::{GenerationParams, HuggingFaceSummarizer, SummaryModel};

/// A summary of one or two paragraphs
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    paragraphs: Vec<String>,
}

impl Summary {
    /// Lay out combined chunk summaries: below `split_words` words it stays one
    /// paragraph, otherwise it is split at the middle word. Line breaks in the
    /// model output are collapsed.
    pub fn from_text(text: &str, split_words: usize) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() < split_words || words.len() < 2 {
            return Some(Self {
                paragraphs: vec![words.join(" ")],
            });
        }

        let mid_point = words.len() / 2;
        Some(Self {
            paragraphs: vec![words[..mid_point].join(" "), words[mid_point..].join(" ")],
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.paragraphs.join("\n\n"))
    }
}

/// Split text into chunks of `size` characters
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Abstractive summarizer over a lazily loaded sequence-to-sequence model
pub struct Summarizer {
    model: LazyModel<dyn SummaryModel>,
    settings: SummarizerConfig,
    show_progress: bool,
}

impl Summarizer {
    /// Create a summarizer backed by the configured inference endpoint
    pub fn from_config(config: &Config) -> Self {
        let settings = config.summarizer.clone();
        let model = LazyModel::new("summarization model", move || {
            let client = HuggingFaceSummarizer::from_config(&settings)?;
            Ok(Arc::new(client) as Arc<dyn SummaryModel>)
        });

        Self::new(model, config.summarizer.clone()).with_progress(config.app.show_progress)
    }

    pub fn new(model: LazyModel<dyn SummaryModel>, settings: SummarizerConfig) -> Self {
        Self {
            model,
            settings,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Generate a concise summary of the input text
    pub async fn summarize(&self, text: &str) -> Result<Summary, SummarizerError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SummarizerError::NothingToSummarize);
        }

        let length = trimmed.chars().count();
        if length < self.settings.min_input_chars {
            return Err(SummarizerError::TooShort(length));
        }

        // Only chunks with substantial content are summarized
        let chunks: Vec<String> = chunk_text(text, self.settings.chunk_size)
            .into_iter()
            .filter(|chunk| chunk.trim().chars().count() > self.settings.min_chunk_chars)
            .collect();

        if chunks.is_empty() {
            return Err(SummarizerError::NoSummary(
                "no chunk has enough content".to_string(),
            ));
        }

        let model = self
            .model
            .get()
            .await
            .map_err(|e| SummarizerError::NoSummary(format!("{:#}", e)))?;

        let progress = utils::spinner("Summarizing...", self.show_progress);
        let mut summaries = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            progress.set_message(format!("Summarizing part {}/{}...", index + 1, chunks.len()));
            tracing::debug!("Summarizing chunk {} ({} chars)", index + 1, chunk.chars().count());

            let summary = match model.summarize(chunk, &self.settings.generation).await {
                Ok(summary) => summary,
                Err(e) => {
                    progress.finish_and_clear();
                    tracing::warn!("Error in summarization: {:#}", e);
                    return Err(SummarizerError::NoSummary(format!("{:#}", e)));
                }
            };

            let summary = utils::format_summary(&summary);
            if !summary.is_empty() {
                summaries.push(summary);
            }
        }
        progress.finish_and_clear();

        Summary::from_text(&summaries.join(" "), self.settings.paragraph_split_words).ok_or_else(
            || SummarizerError::NoSummary("the model returned no text".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::MockSummaryModel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn summarizer(model: MockSummaryModel) -> Summarizer {
        Summarizer::new(
            LazyModel::ready("summarization model", Arc::new(model) as Arc<dyn SummaryModel>),
            SummarizerConfig::default(),
        )
    }

    fn unused_model() -> MockSummaryModel {
        let mut model = MockSummaryModel::new();
        model.expect_summarize().times(0);
        model
    }

    fn sentence_text(chars: usize) -> String {
        "The quick brown fox jumps over the lazy dog. "
            .repeat(chars / 45 + 1)
            .chars()
            .take(chars)
            .collect()
    }

    #[test]
    fn test_chunk_text_counts_characters() {
        let chunks = chunk_text(&"é".repeat(2500), 1000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 1000);
        assert_eq!(chunks[2].chars().count(), 500);
        assert!(chunk_text("", 1000).is_empty());
    }

    #[test]
    fn test_short_summary_is_one_paragraph() {
        let summary = Summary::from_text("  A short summary of the video.  ", 50).unwrap();
        assert_eq!(summary.paragraphs, ["A short summary of the video."]);
        assert_eq!(summary.to_string(), "A short summary of the video.");
    }

    #[test]
    fn test_long_summary_splits_at_middle_word() {
        let words: Vec<String> = (0..61).map(|i| format!("w{}", i)).collect();
        let summary = Summary::from_text(&words.join(" "), 50).unwrap();

        assert_eq!(summary.paragraphs.len(), 2);
        assert_eq!(summary.paragraphs[0].split_whitespace().count(), 30);
        assert_eq!(summary.paragraphs[1].split_whitespace().count(), 31);
        assert!(summary.paragraphs[1].starts_with("w30 "));
        assert_eq!(summary.to_string().matches("\n\n").count(), 1);
    }

    #[test]
    fn test_summary_never_exceeds_two_paragraphs() {
        for words in [1, 2, 49, 50, 51, 500] {
            let text = vec!["word"; words].join(" ");
            let summary = Summary::from_text(&text, 50).unwrap();
            let count = summary.paragraphs.len();
            assert!((1..=2).contains(&count), "{} words gave {} paragraphs", words, count);
        }
        assert!(Summary::from_text("   ", 50).is_none());
    }

    #[tokio::test]
    async fn test_empty_input_has_nothing_to_summarize() {
        let summarizer = summarizer(unused_model());
        let result = summarizer.summarize("").await;
        assert!(matches!(result, Err(SummarizerError::NothingToSummarize)));

        let result = summarizer.summarize(" \n\t ").await;
        assert!(matches!(result, Err(SummarizerError::NothingToSummarize)));
    }

    #[tokio::test]
    async fn test_short_input_yields_no_summary() {
        let summarizer = summarizer(unused_model());
        let result = summarizer.summarize("This is a single line.").await;

        assert!(matches!(result, Err(SummarizerError::TooShort(22))));
    }

    #[tokio::test]
    async fn test_input_without_substantial_chunk() {
        let summarizer = summarizer(unused_model());
        let result = summarizer.summarize(&sentence_text(80)).await;
        assert!(matches!(result, Err(SummarizerError::NoSummary(_))));
    }

    #[tokio::test]
    async fn test_each_substantial_chunk_is_summarized() {
        let mut model = MockSummaryModel::new();
        model
            .expect_summarize()
            .withf(|chunk, params| {
                chunk.chars().count() > 100 && chunk.chars().count() <= 1000 && params.num_beams == 4
            })
            .times(2)
            .returning(|_, _| Ok(" The fox jumps. ".to_string()));

        // Two full chunks and a 50 character tail that is skipped
        let summary = summarizer(model)
            .summarize(&sentence_text(2050))
            .await
            .unwrap();

        assert_eq!(summary.paragraphs, ["The fox jumps. The fox jumps."]);
    }

    #[tokio::test]
    async fn test_long_combined_summary_has_two_paragraphs() {
        let mut model = MockSummaryModel::new();
        model
            .expect_summarize()
            .times(3)
            .returning(|_, _| Ok(vec!["summary"; 20].join(" ")));

        let summary = summarizer(model)
            .summarize(&sentence_text(3000))
            .await
            .unwrap();

        assert_eq!(summary.paragraphs.len(), 2);
        assert_eq!(summary.paragraphs[0].split_whitespace().count(), 30);
    }

    #[tokio::test]
    async fn test_blank_lines_in_model_output_stay_one_paragraph() {
        let mut model = MockSummaryModel::new();
        model
            .expect_summarize()
            .times(1)
            .returning(|_, _| Ok("First point.\n\nSecond point.\n\nThird point.".to_string()));

        let summary = summarizer(model)
            .summarize(&sentence_text(500))
            .await
            .unwrap();

        assert_eq!(summary.paragraphs, ["First point. Second point. Third point."]);
        assert!(!summary.to_string().contains('\n'));
    }

    #[tokio::test]
    async fn test_model_failure_yields_no_summary() {
        let mut model = MockSummaryModel::new();
        model
            .expect_summarize()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("HTTP 503 model loading")));

        let result = summarizer(model).summarize(&sentence_text(2500)).await;
        assert!(matches!(result, Err(SummarizerError::NoSummary(ref reason)) if reason.contains("503")));
    }

    #[tokio::test]
    async fn test_blank_model_output_yields_no_summary() {
        let mut model = MockSummaryModel::new();
        model
            .expect_summarize()
            .returning(|_, _| Ok("  ".to_string()));

        let result = summarizer(model).summarize(&sentence_text(500)).await;
        assert!(matches!(result, Err(SummarizerError::NoSummary(_))));
    }

    #[tokio::test]
    async fn test_model_is_loaded_once_across_requests() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let model: LazyModel<dyn SummaryModel> = LazyModel::new("summarization model", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut model = MockSummaryModel::new();
            model
                .expect_summarize()
                .returning(|_, _| Ok("Summary.".to_string()));
            Ok(Arc::new(model) as Arc<dyn SummaryModel>)
        });
        let summarizer = Summarizer::new(model, SummarizerConfig::default());

        // Rejected input never loads the model
        assert!(summarizer.summarize("too short").await.is_err());
        assert_eq!(loads.load(Ordering::SeqCst), 0);

        summarizer.summarize(&sentence_text(400)).await.unwrap();
        summarizer.summarize(&sentence_text(600)).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }
}
