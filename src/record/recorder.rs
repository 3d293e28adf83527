use std::io::Read;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::foundation::error::{BurnoverError, BurnoverResult};
use crate::record::profile::EncodingProfile;
use crate::record::stream::CombinedStream;

/// A finished recording: the container bytes plus what they are.
#[derive(Clone, Debug)]
pub struct Recording {
    pub data: Vec<u8>,
    pub mime: String,
    pub extension: String,
}

/// Recorder tuning knobs.
#[derive(Clone, Copy, Debug)]
pub struct RecorderOpts {
    /// Target video bitrate in bits per second.
    pub video_bitrate: u32,
    /// How often buffered encoder output is cut into an ordered slice.
    pub slice_interval: Duration,
}

impl Default for RecorderOpts {
    fn default() -> Self {
        Self {
            video_bitrate: 6_000_000,
            slice_interval: Duration::from_millis(150),
        }
    }
}

/// Consumes composited frames in presentation order and yields the encoded
/// recording when stopped.
///
/// `stop` takes the recorder by value, so a recording finalizes exactly once.
pub trait FrameRecorder: Send {
    /// Append one RGBA8 frame. Frames arrive in presentation order.
    fn push_frame(&mut self, rgba: &[u8]) -> BurnoverResult<()>;

    /// Flush the encoder and hand back everything it produced.
    fn stop(self: Box<Self>) -> BurnoverResult<Recording>;
}

/// Recorder that streams raw frames into a spawned ffmpeg and collects the
/// muxed container from its stdout.
///
/// Output is drained on a background thread and cut into slices on the
/// configured cadence; `stop` concatenates the slices in arrival order, which
/// is also presentation order because a pipe cannot reorder.
pub struct FfmpegRecorder {
    mime: &'static str,
    extension: &'static str,
    frame_len: usize,
    child: Child,
    stdin: Option<ChildStdin>,
    slices: Arc<Mutex<Vec<Vec<u8>>>>,
    stdout_drain: Option<JoinHandle<()>>,
    stderr_drain: Option<JoinHandle<Vec<u8>>>,
    frames_pushed: u64,
    finished: bool,
}

impl FfmpegRecorder {
    pub fn open(
        stream: &CombinedStream,
        profile: &EncodingProfile,
        opts: &RecorderOpts,
    ) -> BurnoverResult<Self> {
        Self::open_program("ffmpeg", stream, profile, opts)
    }

    fn open_program(
        program: &str,
        stream: &CombinedStream,
        profile: &EncodingProfile,
        opts: &RecorderOpts,
    ) -> BurnoverResult<Self> {
        let dims = stream.video.dims;
        if dims.is_empty() {
            return Err(BurnoverError::export("recording dimensions are zero"));
        }
        let frame_len = dims.rgba_len()?;
        let fps = stream.video.fps;

        let mut cmd = Command::new(program);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args(["-v", "error"]);
        cmd.args([
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", dims.width, dims.height),
            "-r",
            &format!("{}/{}", fps.num, fps.den),
            "-i",
            "pipe:0",
        ]);
        if let Some(audio) = &stream.audio {
            cmd.arg("-i").arg(audio);
            cmd.args(["-map", "0:v:0", "-map", "1:a:0", "-shortest"]);
        } else {
            cmd.args(["-map", "0:v:0", "-an"]);
        }
        if let Some(enc) = profile.video_encoder {
            cmd.args(["-c:v", enc]);
        }
        cmd.args(["-b:v", &opts.video_bitrate.to_string()]);
        if stream.has_audio() {
            if let Some(enc) = profile.audio_encoder {
                cmd.args(["-c:a", enc]);
            }
        }
        if dims.width % 2 != 0 || dims.height % 2 != 0 {
            // Subsampled pixel formats need even dimensions.
            cmd.args(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"]);
        }
        cmd.args(profile.mux_args);
        cmd.args(["-f", profile.muxer, "pipe:1"]);

        let mut child = cmd.spawn().map_err(|e| {
            BurnoverError::unsupported_format(format!(
                "could not start recording: failed to launch {program}: {e}. \
                 Make sure ffmpeg is installed and in PATH."
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BurnoverError::unsupported_format("ffmpeg encoder stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BurnoverError::unsupported_format("ffmpeg encoder stdout unavailable"))?;
        let stderr_drain = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                buf
            })
        });

        let slices = Arc::new(Mutex::new(Vec::new()));
        let stdout_drain = Some(spawn_slicer(stdout, Arc::clone(&slices), opts.slice_interval));

        tracing::debug!(
            profile = profile.name,
            dims = %dims,
            audio = stream.has_audio(),
            "recording started"
        );
        Ok(Self {
            mime: profile.mime,
            extension: profile.extension,
            frame_len,
            child,
            stdin: Some(stdin),
            slices,
            stdout_drain,
            stderr_drain,
            frames_pushed: 0,
            finished: false,
        })
    }

    fn fail(&mut self, context: String) -> BurnoverError {
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.finished = true;
        if let Some(h) = self.stdout_drain.take() {
            let _ = h.join();
        }
        let stderr = self
            .stderr_drain
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        let stderr = String::from_utf8_lossy(&stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            BurnoverError::export(context)
        } else {
            BurnoverError::export(format!("{context}: {stderr}"))
        }
    }
}

impl FrameRecorder for FfmpegRecorder {
    fn push_frame(&mut self, rgba: &[u8]) -> BurnoverResult<()> {
        if rgba.len() != self.frame_len {
            return Err(BurnoverError::export(format!(
                "frame byte length mismatch: got {}, expected {}",
                rgba.len(),
                self.frame_len
            )));
        }
        let written = match self.stdin.as_mut() {
            Some(stdin) => {
                use std::io::Write as _;
                stdin.write_all(rgba)
            }
            None => return Err(BurnoverError::export("recorder is already stopped")),
        };
        if let Err(e) = written {
            return Err(self.fail(format!("encoder rejected a frame: {e}")));
        }
        self.frames_pushed += 1;
        Ok(())
    }

    fn stop(mut self: Box<Self>) -> BurnoverResult<Recording> {
        drop(self.stdin.take());

        // The slicer thread keeps the stdout pipe drained while we wait, so
        // the child can always make progress toward exit.
        let status = self.child.wait().map_err(|e| {
            BurnoverError::export(format!("failed to wait for the encoder to finish: {e}"))
        })?;
        self.finished = true;
        if let Some(h) = self.stdout_drain.take() {
            h.join()
                .map_err(|_| BurnoverError::export("encoder output drain thread panicked"))?;
        }
        let stderr = match self.stderr_drain.take() {
            Some(h) => h
                .join()
                .map_err(|_| BurnoverError::export("encoder stderr drain thread panicked"))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(BurnoverError::export(format!(
                "encoder exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        let slices = std::mem::take(&mut *lock(&self.slices));
        let total = slices.iter().map(Vec::len).sum();
        let mut data = Vec::with_capacity(total);
        for slice in &slices {
            data.extend_from_slice(slice);
        }
        if data.is_empty() {
            return Err(BurnoverError::export("recording produced no data"));
        }
        tracing::debug!(
            frames = self.frames_pushed,
            slices = slices.len(),
            bytes = data.len(),
            "recording finished"
        );
        Ok(Recording {
            data,
            mime: self.mime.to_string(),
            extension: self.extension.to_string(),
        })
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(h) = self.stdout_drain.take() {
            let _ = h.join();
        }
        if let Some(h) = self.stderr_drain.take() {
            let _ = h.join();
        }
    }
}

/// Read encoded output until EOF, cutting a slice whenever the cadence
/// elapses. The final partial slice is flushed on EOF.
fn spawn_slicer(
    mut stdout: impl Read + Send + 'static,
    slices: Arc<Mutex<Vec<Vec<u8>>>>,
    interval: Duration,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut current: Vec<u8> = Vec::new();
        let mut last_cut = Instant::now();
        let mut buf = [0u8; 64 * 1024];
        loop {
            match stdout.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    current.extend_from_slice(&buf[..n]);
                    if last_cut.elapsed() >= interval && !current.is_empty() {
                        lock(&slices).push(std::mem::take(&mut current));
                        last_cut = Instant::now();
                    }
                }
                Err(_) => break,
            }
        }
        if !current.is_empty() {
            lock(&slices).push(current);
        }
    })
}

fn lock(slices: &Mutex<Vec<Vec<u8>>>) -> MutexGuard<'_, Vec<Vec<u8>>> {
    slices.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory recorder for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that observes pushed frames after the recorder is boxed away.
    pub fn frames_handle(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        Arc::clone(&self.frames)
    }
}

impl FrameRecorder for MemoryRecorder {
    fn push_frame(&mut self, rgba: &[u8]) -> BurnoverResult<()> {
        lock(&self.frames).push(rgba.to_vec());
        Ok(())
    }

    fn stop(self: Box<Self>) -> BurnoverResult<Recording> {
        let frames = lock(&self.frames);
        let mut data = Vec::new();
        for frame in frames.iter() {
            data.extend_from_slice(frame);
        }
        Ok(Recording {
            data,
            mime: "application/octet-stream".to_string(),
            extension: "bin".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{Dimensions, Fps};
    use crate::record::profile::GENERIC_PROFILE;
    use crate::record::stream::SurfaceSpec;

    #[test]
    fn defaults_are_six_megabit_and_150ms() {
        let opts = RecorderOpts::default();
        assert_eq!(opts.video_bitrate, 6_000_000);
        assert_eq!(opts.slice_interval, Duration::from_millis(150));
    }

    #[test]
    fn zero_dimensions_are_rejected_before_spawning() {
        let stream = CombinedStream {
            video: SurfaceSpec {
                dims: Dimensions::new(0, 360),
                fps: Fps { num: 30, den: 1 },
            },
            audio: None,
        };
        let err = FfmpegRecorder::open(&stream, &GENERIC_PROFILE, &RecorderOpts::default())
            .map(|_| ())
            .unwrap_err();
        assert!(err.to_string().contains("dimensions"));
    }

    #[test]
    fn unlaunchable_encoder_is_an_unsupported_format() {
        let stream = CombinedStream {
            video: SurfaceSpec {
                dims: Dimensions::new(64, 64),
                fps: Fps { num: 30, den: 1 },
            },
            audio: None,
        };
        let err = FfmpegRecorder::open_program(
            "burnover-no-such-encoder",
            &stream,
            &GENERIC_PROFILE,
            &RecorderOpts::default(),
        )
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, BurnoverError::UnsupportedFormat(_)));
        assert!(err.to_string().contains("installed"));
    }

    #[test]
    fn memory_recorder_concatenates_in_order() {
        let mut rec = MemoryRecorder::new();
        let handle = rec.frames_handle();
        rec.push_frame(&[1, 2]).unwrap();
        rec.push_frame(&[3]).unwrap();
        assert_eq!(handle.lock().unwrap().len(), 2);

        let recording = Box::new(rec).stop().unwrap();
        assert_eq!(recording.data, vec![1, 2, 3]);
        assert_eq!(recording.extension, "bin");
    }

    #[test]
    fn slicer_flushes_trailing_bytes_on_eof() {
        let slices = Arc::new(Mutex::new(Vec::new()));
        let payload: &[u8] = b"encoded-bytes";
        let handle = spawn_slicer(payload, Arc::clone(&slices), Duration::from_secs(60));
        handle.join().unwrap();

        let slices = slices.lock().unwrap();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0], payload);
    }

    #[test]
    fn slicer_cuts_on_cadence_and_preserves_order() {
        struct Dribble {
            chunks: Vec<Vec<u8>>,
        }
        impl Read for Dribble {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                match self.chunks.pop() {
                    Some(chunk) => {
                        std::thread::sleep(Duration::from_millis(5));
                        buf[..chunk.len()].copy_from_slice(&chunk);
                        Ok(chunk.len())
                    }
                    None => Ok(0),
                }
            }
        }

        let slices = Arc::new(Mutex::new(Vec::new()));
        let source = Dribble {
            chunks: vec![b"cc".to_vec(), b"bb".to_vec(), b"aa".to_vec()],
        };
        let handle = spawn_slicer(source, Arc::clone(&slices), Duration::from_millis(1));
        handle.join().unwrap();

        let slices = slices.lock().unwrap();
        let joined: Vec<u8> = slices.iter().flatten().copied().collect();
        assert_eq!(joined, b"aabbcc");
        assert!(slices.len() >= 2);
    }
}
