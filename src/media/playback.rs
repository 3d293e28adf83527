use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::foundation::core::{Dimensions, Fps};
use crate::foundation::error::{BurnoverError, BurnoverResult};
use crate::media::probe::VideoMetadata;

/// One decoded straight-alpha RGBA8 frame.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    pub dims: Dimensions,
    pub data: Vec<u8>,
}

impl VideoFrame {
    pub fn black(dims: Dimensions) -> BurnoverResult<Self> {
        let len = dims.rgba_len()?;
        let mut data = vec![0u8; len];
        for px in data.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Ok(Self { dims, data })
    }
}

/// Ordered access to the frames of a playing source.
///
/// `frame_at` advances to the frame visible at a media time and returns it;
/// once the decoder runs out, the last decoded frame is frozen and returned
/// for every later time, with `exhausted` reporting end-of-stream.
pub trait FrameFeed {
    fn dimensions(&self) -> Dimensions;

    /// Advance playback to `media_time` seconds and return the frame visible
    /// at that instant. Never seeks backwards; earlier times return the
    /// current frame.
    fn frame_at(&mut self, media_time: f64) -> BurnoverResult<&VideoFrame>;

    /// True once no frames exist beyond the one currently shown.
    fn exhausted(&self) -> bool;
}

/// Streaming decoder backed by a spawned ffmpeg process.
///
/// Opening the feed reads the first frame, so a successful `open` means
/// playback has actually started; failures surface as playback errors with a
/// corrective hint instead of a raw pipe error.
pub struct FfmpegFrameFeed {
    child: Child,
    stdout: ChildStdout,
    stderr_drain: Option<std::thread::JoinHandle<Vec<u8>>>,
    fps: Fps,
    current: VideoFrame,
    scratch: Vec<u8>,
    decoded: u64,
    eof: bool,
}

impl FfmpegFrameFeed {
    pub fn open(path: &Path, meta: &VideoMetadata) -> BurnoverResult<Self> {
        let dims = meta.dimensions();
        if dims.is_empty() {
            return Err(BurnoverError::playback("source dimensions are zero"));
        }
        let frame_len = dims.rgba_len()?;

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "-an", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BurnoverError::playback(format!(
                    "could not start playback: failed to launch ffmpeg: {e}. \
                     Make sure ffmpeg is installed and in PATH."
                ))
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BurnoverError::playback("ffmpeg decoder stdout unavailable"))?;
        let stderr_drain = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                buf
            })
        });

        let mut feed = Self {
            child,
            stdout,
            stderr_drain,
            fps: meta.fps,
            current: VideoFrame {
                dims,
                data: vec![0u8; frame_len],
            },
            scratch: vec![0u8; frame_len],
            decoded: 0,
            eof: false,
        };
        if !feed.read_next()? {
            return Err(feed.fail(format!(
                "could not start playback of '{}': decoder produced no frames",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), dims = %dims, "playback started");
        Ok(feed)
    }

    /// Pull one frame off the pipe; false on end of stream.
    fn read_next(&mut self) -> BurnoverResult<bool> {
        if self.eof {
            return Ok(false);
        }
        match self.stdout.read_exact(&mut self.scratch) {
            Ok(()) => {
                std::mem::swap(&mut self.current.data, &mut self.scratch);
                self.decoded += 1;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // Partial tails land in scratch; the current frame stays the
                // last complete one.
                self.eof = true;
                Ok(false)
            }
            Err(e) => Err(self.fail(format!("video frame stream broke: {e}"))),
        }
    }

    fn fail(&mut self, context: String) -> BurnoverError {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let stderr = self
            .stderr_drain
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        let stderr = String::from_utf8_lossy(&stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            BurnoverError::playback(context)
        } else {
            BurnoverError::playback(format!("{context}: {stderr}"))
        }
    }
}

impl FrameFeed for FfmpegFrameFeed {
    fn dimensions(&self) -> Dimensions {
        self.current.dims
    }

    fn frame_at(&mut self, media_time: f64) -> BurnoverResult<&VideoFrame> {
        let target = self.fps.secs_to_frames_floor(media_time.max(0.0));
        while !self.eof && self.decoded <= target {
            self.read_next()?;
        }
        Ok(&self.current)
    }

    fn exhausted(&self) -> bool {
        self.eof
    }
}

impl Drop for FfmpegFrameFeed {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(h) = self.stderr_drain.take() {
            let _ = h.join();
        }
    }
}

/// Deterministic in-process feed for tests: frame N is a solid gray whose
/// shade is `shade_for(N)`.
pub struct SyntheticFeed {
    dims: Dimensions,
    fps: Fps,
    frame_count: u64,
    current: VideoFrame,
    current_index: u64,
}

impl SyntheticFeed {
    pub fn new(dims: Dimensions, fps: Fps, frame_count: u64) -> BurnoverResult<Self> {
        if dims.is_empty() {
            return Err(BurnoverError::playback("synthetic feed dimensions are zero"));
        }
        let len = dims.rgba_len()?;
        let mut feed = Self {
            dims,
            fps,
            frame_count: frame_count.max(1),
            current: VideoFrame {
                dims,
                data: vec![0u8; len],
            },
            current_index: 0,
        };
        feed.render(0);
        Ok(feed)
    }

    /// Gray level of synthetic frame `index`.
    pub fn shade_for(index: u64) -> u8 {
        (32 + (index * 13) % 192) as u8
    }

    fn render(&mut self, index: u64) {
        let v = Self::shade_for(index);
        for px in self.current.data.chunks_exact_mut(4) {
            px[0] = v;
            px[1] = v;
            px[2] = v;
            px[3] = 255;
        }
        self.current_index = index;
    }
}

impl FrameFeed for SyntheticFeed {
    fn dimensions(&self) -> Dimensions {
        self.dims
    }

    fn frame_at(&mut self, media_time: f64) -> BurnoverResult<&VideoFrame> {
        let target = self
            .fps
            .secs_to_frames_floor(media_time.max(0.0))
            .min(self.frame_count - 1);
        if target > self.current_index {
            self.render(target);
        }
        Ok(&self.current)
    }

    fn exhausted(&self) -> bool {
        self.current_index + 1 >= self.frame_count
    }
}

/// One-shot decode of the frame visible at `time_sec`.
pub fn decode_frame_at(path: &Path, meta: &VideoMetadata, time_sec: f64) -> BurnoverResult<VideoFrame> {
    let dims = meta.dimensions();
    if dims.is_empty() {
        return Err(BurnoverError::playback("source dimensions are zero"));
    }
    let expected = dims.rgba_len()?;

    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{:.9}", time_sec.max(0.0))])
        .arg("-i")
        .arg(path)
        .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgba", "-an", "pipe:1"])
        .output()
        .map_err(|e| {
            BurnoverError::playback(format!(
                "failed to launch ffmpeg: {e}. Make sure ffmpeg is installed and in PATH."
            ))
        })?;
    if !out.status.success() {
        return Err(BurnoverError::playback(format!(
            "ffmpeg frame decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    if out.stdout.len() < expected {
        return Err(BurnoverError::playback(format!(
            "no frame decodable at {time_sec:.3}s in '{}'",
            path.display()
        )));
    }

    Ok(VideoFrame {
        dims,
        data: out.stdout[..expected].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_30fps(frames: u64) -> SyntheticFeed {
        SyntheticFeed::new(
            Dimensions::new(8, 6),
            Fps { num: 30, den: 1 },
            frames,
        )
        .unwrap()
    }

    #[test]
    fn synthetic_feed_advances_by_media_time() {
        let mut feed = feed_30fps(30);
        let f0 = feed.frame_at(0.0).unwrap().data[0];
        assert_eq!(f0, SyntheticFeed::shade_for(0));
        let f15 = feed.frame_at(0.5).unwrap().data[0];
        assert_eq!(f15, SyntheticFeed::shade_for(15));
        assert!(!feed.exhausted());
    }

    #[test]
    fn synthetic_feed_freezes_after_last_frame() {
        let mut feed = feed_30fps(10);
        let last = feed.frame_at(10.0).unwrap().data[0];
        assert_eq!(last, SyntheticFeed::shade_for(9));
        assert!(feed.exhausted());
        // Frozen on the final frame for any later time.
        assert_eq!(feed.frame_at(99.0).unwrap().data[0], last);
    }

    #[test]
    fn synthetic_feed_never_seeks_backwards() {
        let mut feed = feed_30fps(30);
        feed.frame_at(0.5).unwrap();
        let v = feed.frame_at(0.0).unwrap().data[0];
        assert_eq!(v, SyntheticFeed::shade_for(15));
    }

    #[test]
    fn black_frame_is_opaque() {
        let f = VideoFrame::black(Dimensions::new(2, 2)).unwrap();
        assert_eq!(f.data, vec![0, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0, 255]);
    }
}
