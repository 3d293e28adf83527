//! Burnover overlays live caption, headline, and body text onto a video and
//! re-encodes the composited frames together with the source audio.
//!
//! The pipeline decodes frames in playback order, composites the overlay in
//! lock-step with a tick clock, feeds the composite stream to an encoder, and
//! finalizes the encoded output into a single artifact:
//!
//! - Load a source with [`ExportSession::set_source`]
//! - Adjust text through the session's [`OverlayHandle`]
//! - Run [`ExportSession::export`] and save the returned [`ArtifactHandle`]
#![forbid(unsafe_code)]

pub mod artifact;
pub mod capture;
pub mod foundation;
pub mod media;
pub mod overlay;
pub mod record;
pub mod session;
pub mod text;

pub use crate::artifact::store::{ArtifactHandle, ArtifactStore};
pub use crate::capture::driver::{CaptureDriver, CaptureStats, EndReason, FrameProgress};
pub use crate::capture::ticker::{CancelHandle, ManualTicker, RefreshTicker, Tick, Ticker};
pub use crate::foundation::core::{Dimensions, Fps};
pub use crate::foundation::error::{BurnoverError, BurnoverResult};
pub use crate::media::playback::{
    FfmpegFrameFeed, FrameFeed, SyntheticFeed, VideoFrame, decode_frame_at,
};
pub use crate::media::probe::{VideoMetadata, probe_video};
pub use crate::media::source::{ReadyState, SourceVideo};
pub use crate::overlay::compositor::draw_frame;
pub use crate::overlay::config::{AccentColor, OverlayConfig, OverlayHandle};
pub use crate::overlay::raster::Surface;
pub use crate::record::profile::{EncoderInventory, EncodingProfile, negotiate};
pub use crate::record::recorder::{
    FfmpegRecorder, FrameRecorder, MemoryRecorder, RecorderOpts, Recording,
};
pub use crate::record::stream::{CombinedStream, SurfaceSpec, assemble};
pub use crate::session::export::{
    ExportOpts, ExportOutcome, ExportPhase, ExportPipeline, ExportSession, FfmpegPipeline,
    SessionOpts, SkipReason,
};
pub use crate::text::font::{FontLibrary, FontWeight};
