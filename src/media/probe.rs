//! Source metadata probing through `ffprobe`.

use std::path::{Path, PathBuf};

use crate::foundation::{CutError, CutResult};

/// Metadata about a media source file.
#[derive(Clone, Debug, serde::Serialize)]
pub struct MediaInfo {
    /// Absolute source path used for probing and decoding.
    pub source_path: PathBuf,
    /// Width in pixels, zero for audio-only sources.
    pub width: u32,
    /// Height in pixels, zero for audio-only sources.
    pub height: u32,
    /// Whether ffprobe detected at least one video stream.
    pub has_video: bool,
    /// Whether ffprobe detected at least one audio stream.
    pub has_audio: bool,
    /// Container duration in seconds, zero when ffprobe omits it.
    pub duration_sec: f64,
}

/// Probe a media file's streams and duration through `ffprobe`.
pub fn probe_media(source_path: &Path) -> CutResult<MediaInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| CutError::decode(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(CutError::decode(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| CutError::decode(format!("ffprobe json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));
    let duration_sec = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(MediaInfo {
        source_path: source_path.to_path_buf(),
        width: video.and_then(|s| s.width).unwrap_or(0),
        height: video.and_then(|s| s.height).unwrap_or(0),
        has_video: video.is_some(),
        has_audio,
        duration_sec,
    })
}

// No unit tests here: probing shells out to `ffprobe` and is validated by
// integration tests that are skipped when the tool is unavailable.
