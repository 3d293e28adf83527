use std::path::{Path, PathBuf};

use crate::foundation::core::{Dimensions, Fps};
use crate::media::probe::VideoMetadata;

/// Geometry and rate of the composited video stream.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceSpec {
    pub dims: Dimensions,
    pub fps: Fps,
}

/// What the recorder will mux: the composited video plus, when the source
/// carries one, its audio track.
#[derive(Clone, Debug)]
pub struct CombinedStream {
    pub video: SurfaceSpec,
    /// File whose audio track rides along unchanged. `None` produces a
    /// video-only recording, which is a normal outcome for silent sources.
    pub audio: Option<PathBuf>,
}

impl CombinedStream {
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

/// Combine the capture surface with the source's audio track.
///
/// Audio is attached only when probing found a track; a missing track is not
/// an error, the export simply comes out silent.
pub fn assemble(video: SurfaceSpec, source: &Path, meta: &VideoMetadata) -> CombinedStream {
    let audio = if meta.has_audio {
        Some(source.to_path_buf())
    } else {
        tracing::debug!("source has no audio track, recording video only");
        None
    };
    CombinedStream { video, audio }
}
