use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::foundation::error::{BurnoverError, BurnoverResult};
use crate::media::probe::{self, VideoMetadata};

/// Container extensions accepted as video input, paired with their MIME type.
const VIDEO_CONTAINERS: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("ts", "video/mp2t"),
    ("wmv", "video/x-ms-wmv"),
];

/// MIME type for a path whose extension names a known video container.
pub fn container_kind(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    VIDEO_CONTAINERS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Readiness of a source's metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyState {
    /// Nothing resolved yet; the first `await_ready` will probe.
    Unknown,
    /// Dimensions and duration are known.
    MetadataLoaded,
    /// The probe failed; the failure is latched.
    Failed,
}

/// Handle to one loaded media source.
///
/// The metadata gate is a one-shot latch: the first `await_ready` resolves it
/// by probing the file, every later (or concurrent) caller observes the same
/// resolution. Exactly one resolution path is ever taken.
#[derive(Debug)]
pub struct SourceVideo {
    path: PathBuf,
    mime: &'static str,
    gate: OnceLock<Result<VideoMetadata, String>>,
}

impl SourceVideo {
    /// Register a media file as the export source.
    ///
    /// Rejects paths whose extension is not a known video container; nothing
    /// is touched on disk here, the probe is deferred to the readiness gate.
    pub fn load(path: impl Into<PathBuf>) -> BurnoverResult<Self> {
        let path = path.into();
        let Some(mime) = container_kind(&path) else {
            return Err(BurnoverError::invalid_input(format!(
                "'{}' is not a video file, pick an mp4/webm/mov/mkv style container",
                path.display()
            )));
        };
        Ok(Self {
            path,
            mime,
            gate: OnceLock::new(),
        })
    }

    /// Build a source whose metadata is already resolved, skipping the probe.
    pub fn preloaded(path: impl Into<PathBuf>, meta: VideoMetadata) -> Self {
        let gate = OnceLock::new();
        let _ = gate.set(Ok(meta));
        Self {
            path: path.into(),
            mime: "video/mp4",
            gate,
        }
    }

    /// Wait for the source metadata, probing it on first call.
    ///
    /// Resolves immediately once the latch holds either outcome. No timeout
    /// is imposed: a probe that never returns leaves the gate pending, which
    /// is a documented limitation of the pipeline.
    pub fn await_ready(&self) -> BurnoverResult<VideoMetadata> {
        let resolved = self.gate.get_or_init(|| {
            match probe::probe_video(&self.path) {
                Ok(meta) => Ok(meta),
                Err(BurnoverError::Metadata(msg)) => Err(msg),
                Err(other) => Err(other.to_string()),
            }
        });
        match resolved {
            Ok(meta) => Ok(meta.clone()),
            Err(msg) => Err(BurnoverError::metadata(msg.clone())),
        }
    }

    /// Current latch state without triggering a probe.
    pub fn ready_state(&self) -> ReadyState {
        match self.gate.get() {
            None => ReadyState::Unknown,
            Some(Ok(_)) => ReadyState::MetadataLoaded,
            Some(Err(_)) => ReadyState::Failed,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// MIME type implied by the container extension.
    pub fn container_mime(&self) -> &'static str {
        self.mime
    }

    /// Input filename without its extension, for artifact naming.
    pub fn file_stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }
}
