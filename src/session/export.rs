use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::artifact::store::{ArtifactHandle, ArtifactStore};
use crate::capture::driver::{CaptureDriver, EndReason, FrameProgress};
use crate::capture::ticker::Ticker;
use crate::foundation::core::Dimensions;
use crate::foundation::error::{BurnoverError, BurnoverResult};
use crate::media::playback::{FfmpegFrameFeed, FrameFeed};
use crate::media::probe::VideoMetadata;
use crate::media::source::SourceVideo;
use crate::overlay::compositor::draw_frame;
use crate::overlay::config::OverlayHandle;
use crate::overlay::raster::Surface;
use crate::record::profile::{self, EncoderInventory, EncodingProfile};
use crate::record::recorder::{FfmpegRecorder, FrameRecorder, RecorderOpts};
use crate::record::stream::{self, CombinedStream, SurfaceSpec};
use crate::text::font::FontLibrary;

/// Where the export state machine currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportPhase {
    /// Nothing running; a new export may start.
    Idle,
    /// Resolving source metadata and opening the recording chain.
    Priming,
    /// The draw loop is feeding composited frames to the recorder.
    Recording,
    /// Flushing the encoder and publishing the artifact.
    Finalizing,
}

struct PhaseCell(AtomicU8);

impl PhaseCell {
    const IDLE: u8 = 0;
    const PRIMING: u8 = 1;
    const RECORDING: u8 = 2;
    const FINALIZING: u8 = 3;

    fn new() -> Self {
        Self(AtomicU8::new(Self::IDLE))
    }

    fn get(&self) -> ExportPhase {
        match self.0.load(Ordering::SeqCst) {
            Self::PRIMING => ExportPhase::Priming,
            Self::RECORDING => ExportPhase::Recording,
            Self::FINALIZING => ExportPhase::Finalizing,
            _ => ExportPhase::Idle,
        }
    }

    fn set(&self, phase: ExportPhase) {
        let code = match phase {
            ExportPhase::Idle => Self::IDLE,
            ExportPhase::Priming => Self::PRIMING,
            ExportPhase::Recording => Self::RECORDING,
            ExportPhase::Finalizing => Self::FINALIZING,
        };
        self.0.store(code, Ordering::SeqCst);
    }

    /// Idle to Priming, or `false` when an export is already in flight.
    fn try_begin(&self) -> bool {
        self.0
            .compare_exchange(Self::IDLE, Self::PRIMING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Why an export request was declined without running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Another export is in flight; the request is a no-op.
    AlreadyActive,
    /// No source is loaded.
    NoSource,
}

/// Result of an export request.
#[derive(Debug)]
pub enum ExportOutcome {
    /// The artifact is published and ready to save.
    Completed(ArtifactHandle),
    /// The request did not start.
    Skipped(SkipReason),
}

/// Factory seam for the moving parts of an export, so the state machine can
/// be driven deterministically in tests.
pub trait ExportPipeline: Send + Sync {
    fn encoder_inventory(&self) -> EncoderInventory;

    fn open_playback(
        &self,
        source: &SourceVideo,
        meta: &VideoMetadata,
    ) -> BurnoverResult<Box<dyn FrameFeed>>;

    fn open_recorder(
        &self,
        stream: &CombinedStream,
        profile: &EncodingProfile,
        opts: &RecorderOpts,
    ) -> BurnoverResult<Box<dyn FrameRecorder>>;
}

/// The production pipeline: ffmpeg decode, ffmpeg encode.
pub struct FfmpegPipeline;

impl ExportPipeline for FfmpegPipeline {
    fn encoder_inventory(&self) -> EncoderInventory {
        EncoderInventory::detect()
    }

    fn open_playback(
        &self,
        source: &SourceVideo,
        meta: &VideoMetadata,
    ) -> BurnoverResult<Box<dyn FrameFeed>> {
        Ok(Box::new(FfmpegFrameFeed::open(source.path(), meta)?))
    }

    fn open_recorder(
        &self,
        stream: &CombinedStream,
        profile: &EncodingProfile,
        opts: &RecorderOpts,
    ) -> BurnoverResult<Box<dyn FrameRecorder>> {
        Ok(Box::new(FfmpegRecorder::open(stream, profile, opts)?))
    }
}

/// Session-lifetime options.
#[derive(Clone, Debug, Default)]
pub struct SessionOpts {
    /// Explicit font file to rasterize with; system sans-serif when `None`.
    pub font_path: Option<PathBuf>,
}

/// Per-export options.
#[derive(Clone, Debug, Default)]
pub struct ExportOpts {
    /// Recorder tuning.
    pub recorder: RecorderOpts,
    /// Re-render at this size instead of the source's own. The overlay lays
    /// itself out from the surface, so any size keeps the same look.
    pub surface_dims: Option<Dimensions>,
}

#[derive(Default)]
struct SessionState {
    source: Option<Arc<SourceVideo>>,
    message: Option<String>,
}

/// Drives one export at a time from a loaded source to a published artifact.
///
/// Phases walk Idle, Priming, Recording, Finalizing and back to Idle; a
/// failure anywhere cuts straight back to Idle after cleanup, leaving the
/// session ready for the next attempt. An export request while one is in
/// flight, or without a source, is a no-op rather than an error.
///
/// All methods take `&self`, so the session can sit behind an `Arc` and be
/// queried (phase, message, overlay edits) while an export runs.
pub struct ExportSession {
    overlay: OverlayHandle,
    fonts: FontLibrary,
    phase: PhaseCell,
    state: Mutex<SessionState>,
    artifacts: ArtifactStore,
    pipeline: Box<dyn ExportPipeline>,
}

impl ExportSession {
    pub fn new(opts: SessionOpts) -> BurnoverResult<Self> {
        Self::with_pipeline(opts, Box::new(FfmpegPipeline))
    }

    pub fn with_pipeline(
        opts: SessionOpts,
        pipeline: Box<dyn ExportPipeline>,
    ) -> BurnoverResult<Self> {
        Ok(Self {
            overlay: OverlayHandle::default(),
            fonts: FontLibrary::load(opts.font_path.as_deref())?,
            phase: PhaseCell::new(),
            state: Mutex::new(SessionState::default()),
            artifacts: ArtifactStore::new()?,
            pipeline,
        })
    }

    /// Shared handle to the overlay text; edits land on the next drawn frame,
    /// including frames of an export already recording.
    pub fn overlay(&self) -> &OverlayHandle {
        &self.overlay
    }

    /// Swap in a new source. An export already running keeps the source it
    /// started with.
    pub fn set_source(&self, source: SourceVideo) {
        self.lock_state().source = Some(Arc::new(source));
    }

    pub fn clear_source(&self) {
        self.lock_state().source = None;
    }

    pub fn source(&self) -> Option<Arc<SourceVideo>> {
        self.lock_state().source.clone()
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase.get()
    }

    /// Operator-facing message from the most recent failed export.
    pub fn last_message(&self) -> Option<String> {
        self.lock_state().message.clone()
    }

    /// Path of the currently published artifact, if an export has completed.
    pub fn artifact_path(&self) -> Option<PathBuf> {
        self.artifacts.current_path()
    }

    /// Run one export to completion on the calling thread.
    ///
    /// Ticks come from `ticker`; its cancel handle aborts the export. The
    /// returned handle is also retrievable later through `artifact_path`.
    pub fn export(
        &self,
        ticker: &mut dyn Ticker,
        opts: &ExportOpts,
    ) -> BurnoverResult<ExportOutcome> {
        let Some(source) = self.lock_state().source.clone() else {
            return Ok(ExportOutcome::Skipped(SkipReason::NoSource));
        };
        if !self.phase.try_begin() {
            return Ok(ExportOutcome::Skipped(SkipReason::AlreadyActive));
        }
        self.lock_state().message = None;

        let result = self.run(&source, ticker, opts);
        self.phase.set(ExportPhase::Idle);
        match result {
            Ok(handle) => Ok(ExportOutcome::Completed(handle)),
            Err(e) => {
                self.lock_state().message = Some(e.to_string());
                Err(e)
            }
        }
    }

    #[tracing::instrument(skip_all, fields(source = %source.path().display()))]
    fn run(
        &self,
        source: &SourceVideo,
        ticker: &mut dyn Ticker,
        opts: &ExportOpts,
    ) -> BurnoverResult<ArtifactHandle> {
        let meta = source.await_ready()?;

        let dims = opts.surface_dims.unwrap_or_else(|| meta.dimensions());
        let mut surface = Surface::new(dims)?;
        let spec = SurfaceSpec {
            dims,
            fps: ticker.fps(),
        };
        let combined = stream::assemble(spec, source.path(), &meta);
        let chosen = profile::negotiate(&self.pipeline.encoder_inventory());
        let mut recorder = self
            .pipeline
            .open_recorder(&combined, &chosen, &opts.recorder)?;
        let mut feed = self.pipeline.open_playback(source, &meta)?;

        self.phase.set(ExportPhase::Recording);
        let driver = CaptureDriver::new();
        let duration = (meta.duration_sec > 0.0).then_some(meta.duration_sec);
        let fonts = &self.fonts;
        let overlay = &self.overlay;
        let stats = driver.run(ticker, duration, |tick| {
            let frame = feed.frame_at(tick.media_time)?;
            let config = overlay.snapshot();
            draw_frame(&mut surface, frame, &config, fonts);
            recorder.push_frame(surface.data())?;
            Ok(if feed.exhausted() {
                FrameProgress::SourceExhausted
            } else {
                FrameProgress::Drawn
            })
        })?;
        if stats.end_reason == EndReason::Cancelled {
            return Err(BurnoverError::export(
                "export cancelled before the clip finished",
            ));
        }

        self.phase.set(ExportPhase::Finalizing);
        let recording = recorder.stop()?;
        tracing::info!(
            frames = stats.frames_drawn,
            bytes = recording.data.len(),
            "export finished"
        );
        self.artifacts.publish(&recording, source.file_stem())
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ticker::ManualTicker;
    use crate::foundation::core::Fps;

    #[test]
    fn phase_cell_admits_one_export() {
        let cell = PhaseCell::new();
        assert!(cell.try_begin());
        assert!(!cell.try_begin());
        cell.set(ExportPhase::Recording);
        assert_eq!(cell.get(), ExportPhase::Recording);
        cell.set(ExportPhase::Idle);
        assert!(cell.try_begin());
    }

    #[test]
    fn export_without_source_is_a_noop() {
        let session = ExportSession::new(SessionOpts::default()).unwrap();
        let mut ticker = ManualTicker::new(Fps { num: 30, den: 1 }, 10);
        let outcome = session.export(&mut ticker, &ExportOpts::default()).unwrap();
        assert!(matches!(
            outcome,
            ExportOutcome::Skipped(SkipReason::NoSource)
        ));
        assert_eq!(session.phase(), ExportPhase::Idle);
        assert!(session.last_message().is_none());
    }

    #[test]
    fn cleared_source_skips_again() {
        let meta = VideoMetadata {
            width: 64,
            height: 36,
            fps: Fps { num: 30, den: 1 },
            duration_sec: 1.0,
            has_audio: false,
        };
        let session = ExportSession::new(SessionOpts::default()).unwrap();
        session.set_source(SourceVideo::preloaded("clip.mp4", meta));
        assert!(session.source().is_some());

        session.clear_source();
        let mut ticker = ManualTicker::new(Fps { num: 30, den: 1 }, 10);
        let outcome = session.export(&mut ticker, &ExportOpts::default()).unwrap();
        assert!(matches!(
            outcome,
            ExportOutcome::Skipped(SkipReason::NoSource)
        ));
    }
}
