use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use url::Url;

use super::{AudioDownloader, AudioFormat};
use crate::{Result, SummarizerError};

/// Hosts that serve the canonical watch page
const WATCH_HOSTS: &[&str] = &["www.youtube.com", "youtube.com"];

/// Short-link host
const SHORT_HOST: &str = "youtu.be";

/// Share-tracking parameter appended by the platform's share button
const SHARE_TRACKING: &str = "?si=";

/// Identifier of a single video, as embedded in its URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Extract the identifier from a short-link or watch-page URL.
    ///
    /// Only the host and the location of the identifier are checked; the token itself
    /// is passed through as-is.
    pub fn from_url(raw: &str) -> std::result::Result<Self, SummarizerError> {
        let trimmed = raw.trim();
        let without_tracking = trimmed.split(SHARE_TRACKING).next().unwrap_or(trimmed);

        let invalid = || SummarizerError::InvalidUrl(trimmed.to_string());
        let parsed = Url::parse(without_tracking).map_err(|_| invalid())?;
        let host = parsed.host_str().ok_or_else(invalid)?;

        let id = if host == SHORT_HOST {
            parsed.path().trim_start_matches('/').to_string()
        } else if WATCH_HOSTS.contains(&host) && parsed.path() == "/watch" {
            parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())
                .ok_or_else(invalid)?
        } else {
            return Err(invalid());
        };

        if id.is_empty() {
            return Err(invalid());
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier has the platform's 11 character shape
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 11
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    /// Canonical watch-page URL for this video
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// YouTube audio downloader using yt-dlp
pub struct YoutubeAudioDownloader {
    yt_dlp_path: String,
    format: AudioFormat,
    quality: String,
}

impl YoutubeAudioDownloader {
    pub fn new(yt_dlp_path: impl Into<String>, format: AudioFormat, quality: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            format,
            quality: quality.into(),
        }
    }

    /// Name of the file yt-dlp leaves behind after conversion
    fn converted_path(&self, dest_dir: &Path) -> PathBuf {
        dest_dir.join(format!("audio.{}", self.format.as_str()))
    }
}

/// Directory to hand yt-dlp as `--ffmpeg-location`, if ffmpeg isn't just the PATH entry
pub fn ffmpeg_location(ffmpeg: &Path) -> Option<&Path> {
    ffmpeg.parent().filter(|dir| !dir.as_os_str().is_empty())
}

#[async_trait]
impl AudioDownloader for YoutubeAudioDownloader {
    async fn download_audio(&self, url: &str, ffmpeg: &Path, dest_dir: &Path) -> Result<PathBuf> {
        tracing::debug!("Downloading audio for {} into {}", url, dest_dir.display());

        let template = dest_dir.join("audio.%(ext)s");
        let quality = format!("{}K", self.quality);

        let mut command = Command::new(&self.yt_dlp_path);
        command
            .arg("--output")
            .arg(&template)
            .args([
                "--format",
                "bestaudio/best",
                "--extract-audio",
                "--audio-format",
                self.format.as_str(),
                "--audio-quality",
                quality.as_str(),
                "--no-playlist",
                "--newline",
            ]);

        if let Some(location) = ffmpeg_location(ffmpeg) {
            command.arg("--ffmpeg-location").arg(location);
        }

        let output = command
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to download audio: {}", error.trim());
        }

        let converted = self.converted_path(dest_dir);
        if !converted.exists() {
            anyhow::bail!(
                "Audio file was not properly converted to {}",
                self.format.as_str().to_uppercase()
            );
        }

        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_link() {
        let id = VideoId::from_url("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_watch_page_with_tracking_parameter() {
        let id = VideoId::from_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&si=abc").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");

        let id = VideoId::from_url("https://youtu.be/dQw4w9WgXcQ?si=Xy12_ab").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_watch_page_variants() {
        for url in [
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
            "http://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42",
            "  https://www.youtube.com/watch?v=dQw4w9WgXcQ\n",
        ] {
            assert_eq!(VideoId::from_url(url).unwrap().as_str(), "dQw4w9WgXcQ", "{}", url);
        }
    }

    #[test]
    fn test_rejects_other_shapes() {
        for url in [
            "",
            "not a url",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "https://vimeo.com/123456",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?list=PL123",
            "https://www.youtube.com/watch?v=",
            "https://youtu.be/",
        ] {
            assert!(
                matches!(VideoId::from_url(url), Err(SummarizerError::InvalidUrl(_))),
                "{:?} should be rejected",
                url
            );
        }
    }

    #[test]
    fn test_identifier_shape_is_not_enforced() {
        let id = VideoId::from_url("https://www.youtube.com/watch?v=short").unwrap();
        assert_eq!(id.as_str(), "short");
        assert!(!id.is_well_formed());
        assert!(VideoId::from_url("https://youtu.be/dQw4w9WgXcQ").unwrap().is_well_formed());
    }

    #[test]
    fn test_watch_url() {
        let id = VideoId::from_url("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(id.to_string(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_ffmpeg_location() {
        assert_eq!(ffmpeg_location(Path::new("ffmpeg")), None);
        assert_eq!(
            ffmpeg_location(Path::new("/usr/local/bin/ffmpeg")),
            Some(Path::new("/usr/local/bin"))
        );
    }

    #[test]
    fn test_converted_path_uses_format_extension() {
        let downloader = YoutubeAudioDownloader::new("yt-dlp", AudioFormat::Mp3, "192");
        assert_eq!(
            downloader.converted_path(Path::new("/tmp/x")),
            PathBuf::from("/tmp/x/audio.mp3")
        );
    }
}
