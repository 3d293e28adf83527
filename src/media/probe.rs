use std::path::Path;

use crate::foundation::core::{Dimensions, Fps};
use crate::foundation::error::{BurnoverError, BurnoverResult};

/// Everything the pipeline needs to know about a source before a run starts.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct VideoMetadata {
    /// Native width in pixels.
    pub width: u32,
    /// Native height in pixels.
    pub height: u32,
    /// Declared frame rate. Falls back to 30/1 when the container does not
    /// carry a usable rate.
    pub fps: Fps,
    /// Container duration in seconds; 0.0 when unknown.
    pub duration_sec: f64,
    /// Whether the container carries at least one audio stream.
    pub has_audio: bool,
}

impl VideoMetadata {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

/// Probe a media file with ffprobe and parse its stream/format report.
pub fn probe_video(source_path: &Path) -> BurnoverResult<VideoMetadata> {
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
        .map_err(|e| {
            BurnoverError::metadata(format!(
                "failed to launch ffprobe: {e}. Make sure ffprobe is installed and in PATH."
            ))
        })?;
    if !out.status.success() {
        return Err(BurnoverError::metadata(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let meta = parse_probe_output(&out.stdout)?;
    tracing::debug!(
        path = %source_path.display(),
        dims = %meta.dimensions(),
        fps = %meta.fps,
        duration_sec = meta.duration_sec,
        has_audio = meta.has_audio,
        "probed source"
    );
    Ok(meta)
}

/// Parse the JSON body of `ffprobe -print_format json -show_streams -show_format`.
pub fn parse_probe_output(json: &[u8]) -> BurnoverResult<VideoMetadata> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
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

    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| BurnoverError::metadata(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| BurnoverError::metadata("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| BurnoverError::metadata("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| BurnoverError::metadata("missing video height from ffprobe"))?;

    let fps = video_stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_ff_ratio)
        .and_then(|(num, den)| Fps::new(num, den).ok())
        .unwrap_or(Fps { num: 30, den: 1 });
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoMetadata {
        width,
        height,
        fps,
        duration_sec,
        has_audio,
    })
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "streams": [
            {"codec_type": "video", "width": 1280, "height": 720, "r_frame_rate": "30000/1001"},
            {"codec_type": "audio", "sample_rate": "48000"}
        ],
        "format": {"duration": "1.500000"}
    }"#;

    #[test]
    fn parses_streams_and_format() {
        let meta = parse_probe_output(FIXTURE.as_bytes()).unwrap();
        assert_eq!(meta.width, 1280);
        assert_eq!(meta.height, 720);
        assert_eq!(meta.fps, Fps { num: 30000, den: 1001 });
        assert!((meta.duration_sec - 1.5).abs() < 1e-9);
        assert!(meta.has_audio);
    }

    #[test]
    fn no_audio_stream_reports_has_audio_false() {
        let json = r#"{"streams":[{"codec_type":"video","width":64,"height":64,"r_frame_rate":"30/1"}],"format":{"duration":"2.0"}}"#;
        let meta = parse_probe_output(json.as_bytes()).unwrap();
        assert!(!meta.has_audio);
    }

    #[test]
    fn missing_video_stream_is_metadata_error() {
        let json = r#"{"streams":[{"codec_type":"audio"}],"format":{}}"#;
        let err = parse_probe_output(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("no video stream"));
    }

    #[test]
    fn unusable_frame_rate_falls_back_to_30() {
        let json = r#"{"streams":[{"codec_type":"video","width":64,"height":64,"r_frame_rate":"0/0"}],"format":{}}"#;
        let meta = parse_probe_output(json.as_bytes()).unwrap();
        assert_eq!(meta.fps, Fps { num: 30, den: 1 });
        assert_eq!(meta.duration_sec, 0.0);
    }

    #[test]
    fn ff_ratio_parsing() {
        assert_eq!(parse_ff_ratio("30/1"), Some((30, 1)));
        assert_eq!(parse_ff_ratio("30000/1001"), Some((30000, 1001)));
        assert_eq!(parse_ff_ratio("30"), None);
        assert_eq!(parse_ff_ratio("30/0"), None);
        assert_eq!(parse_ff_ratio("x/y"), None);
    }
}
