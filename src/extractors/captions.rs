use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::process::Stdio;
use tokio::process::Command;
use url::Url;

use super::{CaptionSource, CaptionTrack, VideoId};
use crate::Result;

/// Caption format requested from the platform
const CAPTION_FORMAT: &str = "json3";

/// Pseudo-language yt-dlp reports for live chat replays
const LIVE_CHAT: &str = "live_chat";

/// Caption retrieval backed by yt-dlp metadata and the platform's timed-text endpoint
pub struct YtDlpCaptionSource {
    yt_dlp_path: String,
    http: reqwest::Client,
}

impl YtDlpCaptionSource {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Get video information using yt-dlp
    async fn get_video_info(&self, video_id: &VideoId) -> Result<Value> {
        tracing::debug!("Extracting caption metadata for: {}", video_id);

        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--dump-json",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                &video_id.watch_url(),
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        let info: Value = serde_json::from_slice(&output.stdout)?;
        Ok(info)
    }

    async fn download_captions(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("Failed to download captions")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download captions: HTTP {}", response.status());
        }

        let body = response.text().await.context("Failed to read captions")?;
        non_empty(json3_to_text(&body)?)
    }
}

#[async_trait]
impl CaptionSource for YtDlpCaptionSource {
    async fn fetch_transcript(&self, video_id: &VideoId, languages: &[String]) -> Result<String> {
        let temp_dir = tempfile::tempdir().context("Failed to create caption directory")?;
        let template = temp_dir.path().join("%(id)s.%(ext)s");

        let output = Command::new(&self.yt_dlp_path)
            .arg("--output")
            .arg(&template)
            .args([
                "--skip-download",
                "--write-subs",
                "--sub-langs",
                &languages.join(","),
                "--sub-format",
                CAPTION_FORMAT,
                "--no-playlist",
                "--no-warnings",
                &video_id.watch_url(),
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        // yt-dlp names the files <id>.<lang>.json3
        for language in languages {
            let path = temp_dir
                .path()
                .join(format!("{}.{}.{}", video_id, language, CAPTION_FORMAT));
            if path.exists() {
                tracing::debug!("Found {} captions at {}", language, path.display());
                let body = fs_err::read_to_string(&path)?;
                return non_empty(json3_to_text(&body)?);
            }
        }

        anyhow::bail!(
            "No captions available for {} in {}",
            video_id,
            languages.join(", ")
        )
    }

    async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>> {
        let info = self.get_video_info(video_id).await?;
        Ok(tracks_from_info(&info))
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<String> {
        self.download_captions(&track.url).await
    }

    async fn translate_track(&self, track: &CaptionTrack, target_language: &str) -> Result<String> {
        let url = translation_url(&track.url, target_language)?;
        self.download_captions(&url).await
    }
}

/// Collect caption tracks from yt-dlp's `--dump-json` output, manual tracks first,
/// each group in the order yt-dlp lists them.
///
/// `automatic_captions` also lists every machine translation of the generated track;
/// those carry a `tlang` parameter and are left out.
pub fn tracks_from_info(info: &Value) -> Vec<CaptionTrack> {
    let mut tracks = collect_tracks(&info["subtitles"], false);
    tracks.extend(collect_tracks(&info["automatic_captions"], true));
    tracks
}

fn collect_tracks(section: &Value, generated: bool) -> Vec<CaptionTrack> {
    let Some(languages) = section.as_object() else {
        return Vec::new();
    };

    languages
        .iter()
        .filter(|(code, _)| !code.starts_with(LIVE_CHAT))
        .filter_map(|(code, formats)| {
            let format = formats
                .as_array()?
                .iter()
                .find(|format| format["ext"].as_str() == Some(CAPTION_FORMAT))?;
            let url = format["url"].as_str()?;

            if generated && url.contains("tlang=") {
                return None;
            }

            Some(CaptionTrack {
                language_code: code.clone(),
                language: format["name"].as_str().map(|name| name.to_string()),
                generated,
                url: url.to_string(),
            })
        })
        .collect()
}

/// Point a timed-text URL at its machine translation
pub fn translation_url(track_url: &str, target_language: &str) -> Result<String> {
    let mut url = Url::parse(track_url).context("Invalid caption URL")?;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "tlang")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("tlang", target_language);

    Ok(url.to_string())
}

#[derive(Debug, Deserialize)]
struct Json3Captions {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(default)]
    segs: Vec<Json3Segment>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Flatten a json3 caption payload into one line of text
pub fn json3_to_text(body: &str) -> Result<String> {
    let captions: Json3Captions =
        serde_json::from_str(body).context("Failed to parse caption payload")?;

    let lines: Vec<String> = captions
        .events
        .iter()
        .map(|event| {
            let text: String = event.segs.iter().map(|seg| seg.utf8.as_str()).collect();
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect();

    Ok(lines.join(" "))
}

fn non_empty(text: String) -> Result<String> {
    if text.trim().is_empty() {
        anyhow::bail!("Caption track is empty");
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json3_to_text() {
        let body = r#"{
            "wireMagic": "pb3",
            "events": [
                {"tStartMs": 0, "dDurationMs": 1000},
                {"tStartMs": 0, "segs": [{"utf8": "Never gonna"}, {"utf8": " give you up"}]},
                {"tStartMs": 1200, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 1500, "segs": [{"utf8": "never gonna\nlet you down"}]}
            ]
        }"#;

        assert_eq!(
            json3_to_text(body).unwrap(),
            "Never gonna give you up never gonna let you down"
        );
    }

    #[test]
    fn test_json3_rejects_garbage() {
        assert!(json3_to_text("<transcript/>").is_err());
        assert_eq!(json3_to_text("{}").unwrap(), "");
    }

    #[test]
    fn test_tracks_from_info() {
        let info = json!({
            "id": "dQw4w9WgXcQ",
            "subtitles": {
                "de": [
                    {"ext": "vtt", "url": "https://www.youtube.com/api/timedtext?v=x&lang=de&fmt=vtt", "name": "German"},
                    {"ext": "json3", "url": "https://www.youtube.com/api/timedtext?v=x&lang=de&fmt=json3", "name": "German"}
                ],
                "live_chat": [
                    {"ext": "json", "url": "https://www.youtube.com/live_chat_replay"}
                ]
            },
            "automatic_captions": {
                "en": [
                    {"ext": "json3", "url": "https://www.youtube.com/api/timedtext?v=x&lang=en&kind=asr&fmt=json3", "name": "English"}
                ],
                "fr": [
                    {"ext": "json3", "url": "https://www.youtube.com/api/timedtext?v=x&lang=en&kind=asr&fmt=json3&tlang=fr", "name": "French"}
                ]
            }
        });

        let tracks = tracks_from_info(&info);
        assert_eq!(tracks.len(), 2);

        assert_eq!(tracks[0].language_code, "de");
        assert!(!tracks[0].generated);
        assert!(tracks[0].url.ends_with("fmt=json3"));
        assert_eq!(tracks[0].language.as_deref(), Some("German"));

        assert_eq!(tracks[1].language_code, "en");
        assert!(tracks[1].generated);
    }

    #[test]
    fn test_tracks_keep_listing_order() {
        let info: Value = serde_json::from_str(
            r#"{
                "subtitles": {
                    "pt-BR": [{"ext": "json3", "url": "https://www.youtube.com/api/timedtext?lang=pt-BR"}],
                    "de": [{"ext": "json3", "url": "https://www.youtube.com/api/timedtext?lang=de"}]
                }
            }"#,
        )
        .unwrap();

        let codes: Vec<String> = tracks_from_info(&info)
            .into_iter()
            .map(|track| track.language_code)
            .collect();
        assert_eq!(codes, ["pt-BR", "de"]);
    }

    #[test]
    fn test_tracks_from_info_without_captions() {
        let info = json!({"id": "dQw4w9WgXcQ", "subtitles": {}, "automatic_captions": null});
        assert!(tracks_from_info(&info).is_empty());
        assert!(tracks_from_info(&json!({})).is_empty());
    }

    #[test]
    fn test_translation_url() {
        let url = translation_url(
            "https://www.youtube.com/api/timedtext?v=x&lang=de&fmt=json3",
            "en",
        )
        .unwrap();
        assert_eq!(
            url,
            "https://www.youtube.com/api/timedtext?v=x&lang=de&fmt=json3&tlang=en"
        );

        let url = translation_url(
            "https://www.youtube.com/api/timedtext?v=x&tlang=fr&fmt=json3",
            "en",
        )
        .unwrap();
        assert_eq!(url, "https://www.youtube.com/api/timedtext?v=x&fmt=json3&tlang=en");
    }
}
