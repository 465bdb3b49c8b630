// subtitles/ytdlp.rs - yt-dlp subtitle fallback
// Last resort when the caption listing is unavailable: ask yt-dlp for the
// auto-generated subtitles as json3 and read the caption events out of it.
// Scratch files are named after the video id and are always removed, whether
// or not parsing succeeds.

use super::{SubtitleError, SubtitleStrategy, PREFERRED_LANGUAGES};
use crate::classify::VideoId;
use crate::content::{truncate_chars, MAX_BODY_CHARS};
use async_trait::async_trait;
use log::{debug, info, trace, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub const DOWNLOADER_TIMEOUT: Duration = Duration::from_secs(30);

const SUBTITLE_EXTENSION: &str = "json3";

pub struct YtDlpSubtitles {
    program: String,
    base_args: Vec<String>,
    scratch_dir: PathBuf,
    timeout: Duration,
}

impl YtDlpSubtitles {
    /// `command` is split on whitespace, so `python3 -m yt_dlp` works as well as a bare path.
    pub fn new(command: &str, scratch_dir: impl Into<PathBuf>) -> Self {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| "yt-dlp".to_string());
        Self {
            program,
            base_args: parts.collect(),
            scratch_dir: scratch_dir.into(),
            timeout: DOWNLOADER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run_downloader(&self, video_id: &VideoId) -> Result<(), SubtitleError> {
        let output_template = self.scratch_dir.join(video_id.as_str());
        let video_url = format!("https://www.youtube.com/watch?v={}", video_id);

        let mut command = Command::new(&self.program);
        command
            .args(&self.base_args)
            .arg("--skip-download")
            .arg("--write-auto-subs")
            .arg("--sub-langs")
            .arg(PREFERRED_LANGUAGES.join(","))
            .arg("--sub-format")
            .arg(SUBTITLE_EXTENSION)
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg("--output")
            .arg(&output_template)
            .arg(&video_url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("🚀 Running {} for {} (timeout {}s)", self.program, video_id, self.timeout.as_secs());
        trace!("🔍 yt-dlp output template: {}", output_template.display());

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(|e| SubtitleError::Downloader(format!("could not run {}: {}", self.program, e)))?,
            // Dropping the output future kills the child.
            Err(_) => return Err(SubtitleError::DownloaderTimeout(self.timeout.as_secs())),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubtitleError::Downloader(format!(
                "exit status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SubtitleStrategy for YtDlpSubtitles {
    fn name(&self) -> &'static str {
        "yt-dlp auto subtitles"
    }

    async fn fetch(&self, video_id: &VideoId) -> Result<String, SubtitleError> {
        let scratch = ScratchFiles::new(&self.scratch_dir, video_id);

        self.run_downloader(video_id).await?;

        let path = scratch.find_subtitle_file().ok_or(SubtitleError::SubtitleFileMissing)?;
        info!("📄 yt-dlp wrote {}", path.display());

        let raw = tokio::fs::read_to_string(&path).await?;
        let text = parse_json3(&raw)?;
        Ok(truncate_chars(&text, MAX_BODY_CHARS))
    }
}

/// Scratch subtitle files for one video; removed when dropped. Only the
/// languages passed to `--sub-langs` can be written, so the candidate paths
/// are known up front and the scratch directory is never listed.
pub struct ScratchFiles {
    candidates: Vec<PathBuf>,
}

impl ScratchFiles {
    pub fn new(dir: &Path, video_id: &VideoId) -> Self {
        let candidates = PREFERRED_LANGUAGES
            .iter()
            .map(|lang| dir.join(format!("{}.{}.{}", video_id, lang, SUBTITLE_EXTENSION)))
            .collect();
        Self { candidates }
    }

    /// The subtitle file for the most preferred language that was written.
    pub fn find_subtitle_file(&self) -> Option<PathBuf> {
        self.candidates.iter().find(|path| path.is_file()).cloned()
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in &self.candidates {
            match std::fs::remove_file(path) {
                Ok(()) => trace!("🧹 Removed scratch file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("⚠️ Could not remove scratch file {}: {}", path.display(), e),
            }
        }
    }
}

// json3 timed-caption format
#[derive(Debug, Deserialize)]
struct Json3Document {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    segs: Option<Vec<Json3Segment>>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Joins every non-blank caption segment with single spaces.
pub fn parse_json3(raw: &str) -> Result<String, SubtitleError> {
    let document: Json3Document = serde_json::from_str(raw)?;
    let text = document
        .events
        .into_iter()
        .filter_map(|event| event.segs)
        .flatten()
        .map(|seg| seg.utf8.trim().to_string())
        .filter(|seg| !seg.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::extract_video_id;

    fn video_id() -> VideoId {
        extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap()
    }

    const SAMPLE_JSON3: &str = r#"{
        "wireMagic": "pb3",
        "events": [
            {"tStartMs": 0, "dDurationMs": 5000, "id": 1, "wpWinPosId": 1, "wsWinStyleId": 1},
            {"tStartMs": 0, "dDurationMs": 3000, "segs": [{"utf8": "오늘은"}, {"utf8": " 금리", "tOffsetMs": 400}, {"utf8": " 이야기"}]},
            {"tStartMs": 2900, "aAppend": 1, "segs": [{"utf8": "\n"}]},
            {"tStartMs": 3000, "dDurationMs": 2000, "segs": [{"utf8": "해보겠습니다"}, {"utf8": "   "}]}
        ]
    }"#;

    #[test]
    fn test_parse_json3() {
        assert_eq!(parse_json3(SAMPLE_JSON3).unwrap(), "오늘은 금리 이야기 해보겠습니다");
    }

    #[test]
    fn test_parse_json3_without_events() {
        assert_eq!(parse_json3("{}").unwrap(), "");
        assert!(matches!(parse_json3("not json"), Err(SubtitleError::Parse(_))));
    }

    #[test]
    fn test_find_subtitle_file_prefers_korean() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dQw4w9WgXcQ.en.json3"), "{}").unwrap();
        std::fs::write(dir.path().join("dQw4w9WgXcQ.ko.json3"), "{}").unwrap();
        std::fs::write(dir.path().join("otherVideo1.ko.json3"), "{}").unwrap();

        let scratch = ScratchFiles::new(dir.path(), &video_id());
        assert_eq!(
            scratch.find_subtitle_file(),
            Some(dir.path().join("dQw4w9WgXcQ.ko.json3"))
        );
    }

    #[test]
    fn test_find_subtitle_file_falls_back_to_english() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dQw4w9WgXcQ.en.json3"), "{}").unwrap();
        std::fs::write(dir.path().join("dQw4w9WgXcQ.ja.json3"), "{}").unwrap();

        let scratch = ScratchFiles::new(dir.path(), &video_id());
        assert_eq!(
            scratch.find_subtitle_file(),
            Some(dir.path().join("dQw4w9WgXcQ.en.json3"))
        );
    }

    #[test]
    fn test_scratch_files_only_touch_known_paths() {
        let dir = tempfile::tempdir().unwrap();
        let unrelated = dir.path().join("dQw4w9WgXcQ.ja.json3");
        std::fs::write(&unrelated, "{}").unwrap();

        {
            let scratch = ScratchFiles::new(dir.path(), &video_id());
            assert_eq!(scratch.find_subtitle_file(), None);
        }
        assert!(unrelated.exists());

        let missing_dir = dir.path().join("never-created");
        drop(ScratchFiles::new(&missing_dir, &video_id()));
    }

    #[test]
    fn test_scratch_files_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let ours = dir.path().join("dQw4w9WgXcQ.ko.json3");
        let theirs = dir.path().join("otherVideo1.ko.json3");
        std::fs::write(&ours, "not json at all").unwrap();
        std::fs::write(&theirs, "{}").unwrap();

        {
            let scratch = ScratchFiles::new(dir.path(), &video_id());
            let path = scratch.find_subtitle_file().unwrap();
            let raw = std::fs::read_to_string(path).unwrap();
            assert!(parse_json3(&raw).is_err());
        }

        assert!(!ours.exists());
        assert!(theirs.exists());
    }

    #[tokio::test]
    async fn test_missing_downloader_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = YtDlpSubtitles::new("definitely-not-a-real-yt-dlp-binary", dir.path());
        let err = strategy.fetch(&video_id()).await.unwrap_err();
        assert!(matches!(err, SubtitleError::Downloader(_)), "got {:?}", err);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_downloader_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-yt-dlp.sh");
        std::fs::write(&script, "sleep 5\n").unwrap();

        let strategy = YtDlpSubtitles::new(&format!("sh {}", script.display()), dir.path())
            .with_timeout(Duration::from_millis(200));
        let err = strategy.fetch(&video_id()).await.unwrap_err();
        assert!(matches!(err, SubtitleError::DownloaderTimeout(_)), "got {:?}", err);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_downloader_output_is_parsed_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-yt-dlp.sh");
        // Writes "<output template>.ko.json3", mimicking yt-dlp's naming.
        let body = r#"while [ "$#" -gt 0 ]; do
  if [ "$1" = "--output" ]; then shift; out="$1"; fi
  shift
done
printf '%s' '{"events":[{"segs":[{"utf8":"가짜"},{"utf8":" 자막"}]}]}' > "$out.ko.json3"
"#;
        std::fs::write(&script, body).unwrap();

        let strategy = YtDlpSubtitles::new(&format!("sh {}", script.display()), dir.path());
        let text = strategy.fetch(&video_id()).await.unwrap();
        assert_eq!(text, "가짜 자막");
        assert!(!dir.path().join("dQw4w9WgXcQ.ko.json3").exists());
    }
}
