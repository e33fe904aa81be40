use anyhow::Context;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::extractors::{
    AudioDownloader, CaptionSource, CaptionTrack, VideoId, YoutubeAudioDownloader,
    YtDlpCaptionSource,
};
use crate::utils::{self, FfmpegLocator, LazyModel};
use crate::{Result, SummarizerError};

pub mod speech;

use speech::{SpeechRecognizer, WhisperApiClient};

/// Where a transcript came from
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptSource {
    /// A manually authored caption track
    Captions { language: String },
    /// An auto-generated caption track
    GeneratedCaptions { language: String },
    /// A caption track machine-translated from another language
    TranslatedCaptions { from: String, to: String },
    /// Speech recognition over the downloaded audio
    Audio,
}

impl fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptSource::Captions { language } => write!(f, "{} captions", language),
            TranscriptSource::GeneratedCaptions { language } => {
                write!(f, "auto-generated {} captions", language)
            }
            TranscriptSource::TranslatedCaptions { from, to } => {
                write!(f, "{} captions translated to {}", from, to)
            }
            TranscriptSource::Audio => write!(f, "audio transcription"),
        }
    }
}

/// Plain transcript text of one video
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub source: TranscriptSource,
}

/// Which listed track to use when no preferred manual track exists
#[derive(Debug, Clone, PartialEq)]
pub enum TrackChoice<'a> {
    /// Use the track as-is
    Direct(&'a CaptionTrack),
    /// Request a machine translation of the track
    Translate(&'a CaptionTrack),
}

/// Prefer an auto-generated track in the target language, otherwise take the first
/// track and translate it unless it already is in the target language
pub fn select_fallback_track<'a>(
    tracks: &'a [CaptionTrack],
    target_language: &str,
) -> Option<TrackChoice<'a>> {
    if let Some(track) = tracks
        .iter()
        .find(|track| track.generated && track.language_code == target_language)
    {
        return Some(TrackChoice::Direct(track));
    }

    let first = tracks.first()?;
    if first.language_code == target_language {
        Some(TrackChoice::Direct(first))
    } else {
        Some(TrackChoice::Translate(first))
    }
}

/// How the audio tier failed
enum AudioFailure {
    /// yt-dlp could not fetch or convert the audio with the ffmpeg found
    Download(anyhow::Error),
    Other(anyhow::Error),
}

impl From<anyhow::Error> for AudioFailure {
    fn from(error: anyhow::Error) -> Self {
        AudioFailure::Other(error)
    }
}

/// Fetches a transcript through captions, translated captions, then audio transcription
pub struct TranscriptAcquirer {
    captions: Arc<dyn CaptionSource>,
    downloader: Arc<dyn AudioDownloader>,
    recognizer: LazyModel<dyn SpeechRecognizer>,
    locator: FfmpegLocator,
    ffmpeg: OnceCell<Option<PathBuf>>,
    languages: Vec<String>,
    target_language: String,
    temp_root: Option<PathBuf>,
    show_progress: bool,
}

impl TranscriptAcquirer {
    /// Create an acquirer wired to yt-dlp, ffmpeg and the configured speech service
    pub fn from_config(config: &Config) -> Self {
        let speech_config = config.speech.clone();
        let recognizer = LazyModel::new("speech recognition model", move || {
            let client = WhisperApiClient::from_config(&speech_config)?;
            Ok(Arc::new(client) as Arc<dyn SpeechRecognizer>)
        });

        Self::new(
            Arc::new(YtDlpCaptionSource::new(&config.captions.yt_dlp_path)),
            Arc::new(YoutubeAudioDownloader::new(
                &config.captions.yt_dlp_path,
                config.audio.audio_format,
                &config.audio.audio_quality,
            )),
            recognizer,
            FfmpegLocator::new(config.audio.ffmpeg_path.clone()),
        )
        .with_languages(
            config.captions.languages.clone(),
            &config.captions.target_language,
        )
        .with_temp_root(config.audio.temp_dir.clone())
        .with_progress(config.app.show_progress)
    }

    pub fn new(
        captions: Arc<dyn CaptionSource>,
        downloader: Arc<dyn AudioDownloader>,
        recognizer: LazyModel<dyn SpeechRecognizer>,
        locator: FfmpegLocator,
    ) -> Self {
        Self {
            captions,
            downloader,
            recognizer,
            locator,
            ffmpeg: OnceCell::new(),
            languages: vec!["en".to_string()],
            target_language: "en".to_string(),
            temp_root: None,
            show_progress: false,
        }
    }

    pub fn with_languages(mut self, languages: Vec<String>, target_language: &str) -> Self {
        self.languages = languages;
        self.target_language = target_language.to_string();
        self
    }

    pub fn with_temp_root(mut self, temp_root: Option<PathBuf>) -> Self {
        self.temp_root = temp_root;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Skip the ffmpeg search and use the given result
    pub fn with_ffmpeg(mut self, ffmpeg: Option<PathBuf>) -> Self {
        self.ffmpeg = OnceCell::new_with(Some(ffmpeg));
        self
    }

    /// Fetch a transcript for the video a URL points at.
    ///
    /// Only a malformed URL and the exhaustion of every method are reported; failures
    /// of individual methods are logged and the next one is tried.
    pub async fn fetch_transcript(&self, url: &str) -> std::result::Result<Transcript, SummarizerError> {
        let url = url.trim();
        let video_id = VideoId::from_url(url)?;

        if !utils::validate_youtube_url(url) {
            tracing::debug!(
                "{} does not look like a standard video URL, continuing with identifier {:?}",
                url,
                video_id.as_str()
            );
        }

        if let Some(transcript) = self.try_captions(&video_id).await {
            tracing::info!("Using {}", transcript.source);
            return Ok(transcript);
        }

        tracing::info!("No captions found. Attempting audio transcription...");

        let Some(ffmpeg) = self.ffmpeg_path().await else {
            tracing::warn!("FFmpeg not found, skipping audio transcription");
            return Err(SummarizerError::DecoderMissing);
        };

        match self.try_audio_transcription(url, &ffmpeg).await {
            Ok(text) => Ok(Transcript {
                text,
                source: TranscriptSource::Audio,
            }),
            Err(AudioFailure::Download(e)) => {
                tracing::warn!("Error during audio download: {:#}", e);
                Err(SummarizerError::AudioDownload {
                    video: video_id.to_string(),
                    ffmpeg: ffmpeg.display().to_string(),
                })
            }
            Err(AudioFailure::Other(e)) => {
                tracing::warn!("Error during audio transcription: {:#}", e);
                Err(SummarizerError::NoTranscript(video_id.to_string()))
            }
        }
    }

    /// Direct caption fetch, then generated or translated captions
    async fn try_captions(&self, video_id: &VideoId) -> Option<Transcript> {
        match self.captions.fetch_transcript(video_id, &self.languages).await {
            Ok(text) if !text.trim().is_empty() => {
                let language = self.languages.first().cloned().unwrap_or_default();
                return Some(Transcript {
                    text,
                    source: TranscriptSource::Captions { language },
                });
            }
            Ok(_) => tracing::debug!("Direct caption fetch returned no text"),
            Err(e) => tracing::debug!("Direct caption fetch failed: {:#}", e),
        }

        match self.try_listed_captions(video_id).await {
            Ok(transcript) => transcript,
            Err(e) => {
                tracing::debug!("Caption fallback failed: {:#}", e);
                None
            }
        }
    }

    async fn try_listed_captions(&self, video_id: &VideoId) -> Result<Option<Transcript>> {
        let tracks = self.captions.list_tracks(video_id).await?;
        tracing::debug!("{} caption tracks available", tracks.len());

        let Some(choice) = select_fallback_track(&tracks, &self.target_language) else {
            return Ok(None);
        };

        let (text, source) = match choice {
            TrackChoice::Direct(track) => {
                let text = self.captions.fetch_track(track).await?;
                let language = track.language_code.clone();
                let source = if track.generated {
                    TranscriptSource::GeneratedCaptions { language }
                } else {
                    TranscriptSource::Captions { language }
                };
                (text, source)
            }
            TrackChoice::Translate(track) => {
                tracing::info!(
                    "Found transcript in {}. Translating to {}...",
                    track.display_language(),
                    self.target_language
                );
                let text = self
                    .captions
                    .translate_track(track, &self.target_language)
                    .await?;
                let source = TranscriptSource::TranslatedCaptions {
                    from: track.language_code.clone(),
                    to: self.target_language.clone(),
                };
                (text, source)
            }
        };

        if text.trim().is_empty() {
            anyhow::bail!("Caption track for {} is empty", video_id);
        }

        Ok(Some(Transcript { text, source }))
    }

    /// ffmpeg location, searched once per acquirer
    async fn ffmpeg_path(&self) -> Option<PathBuf> {
        self.ffmpeg
            .get_or_init(|| async {
                let found = self.locator.locate().await;
                match &found {
                    Some(path) => tracing::debug!("FFmpeg found at {}", path.display()),
                    None => tracing::debug!("FFmpeg not found in any known location"),
                }
                found
            })
            .await
            .clone()
    }

    /// Download the audio into a scoped directory and run speech recognition over it
    async fn try_audio_transcription(
        &self,
        url: &str,
        ffmpeg: &std::path::Path,
    ) -> std::result::Result<String, AudioFailure> {
        let recognizer = self.recognizer.get().await?;

        // Removed when dropped, whichever way this function returns
        let temp_dir = self.create_temp_dir()?;

        let progress = utils::spinner("Downloading audio...", self.show_progress);
        let download = self
            .downloader
            .download_audio(url, ffmpeg, temp_dir.path())
            .await;
        let audio_path = match download {
            Ok(path) => {
                progress.finish_with_message("Audio downloaded successfully.");
                path
            }
            Err(e) => {
                progress.finish_and_clear();
                return Err(AudioFailure::Download(e));
            }
        };

        let progress = utils::spinner(
            "Transcribing audio... (this may take a while)",
            self.show_progress,
        );
        let segments = recognizer.transcribe(&audio_path).await;
        progress.finish_and_clear();

        let text = speech::join_segments(&segments?);
        if text.is_empty() {
            return Err(anyhow::anyhow!("Speech recognition produced no text").into());
        }

        Ok(text)
    }

    fn create_temp_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("video-summarizer-");

        let temp_dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };

        temp_dir.context("Failed to create temporary directory")
    }
}
