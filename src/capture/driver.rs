use std::sync::atomic::{AtomicBool, Ordering};

use crate::capture::ticker::{Tick, Ticker};
use crate::foundation::error::{BurnoverError, BurnoverResult};

/// What the draw callback observed on a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameProgress {
    /// Frame composited and delivered.
    Drawn,
    /// Frame delivered, and the source has no frames beyond it.
    SourceExhausted,
}

/// Why the draw loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// Natural end of playback: the clip duration was reached.
    Completed,
    /// Natural end of playback: the decoder ran out before a known duration.
    SourceExhausted,
    /// The ticker was cancelled (or ran out) before end of playback.
    Cancelled,
}

/// Draw-loop accounting reported after a run.
#[derive(Clone, Copy, Debug)]
pub struct CaptureStats {
    pub ticks: u64,
    pub frames_drawn: u64,
    pub end_reason: EndReason,
}

/// Runs the per-tick draw loop for one capture.
///
/// At most one loop is active per driver; a second `run` while one is in
/// flight is rejected, so no duplicate loops can stack up. Stopping is the
/// ticker's cancel handle, which is safe to trigger at any time, repeatedly.
#[derive(Default)]
pub struct CaptureDriver {
    active: AtomicBool,
}

impl CaptureDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive `draw` once per tick until end of playback or cancellation.
    ///
    /// When `duration_sec` is known, the first tick at or past it is the
    /// final draw, with its media time clamped to the duration so the true
    /// last frame is captured before the loop tears down. With an unknown
    /// duration the loop ends on the draw that showed the decoder's final
    /// frame. Either way the terminal frame is drawn exactly once before the
    /// loop exits.
    pub fn run(
        &self,
        ticker: &mut dyn Ticker,
        duration_sec: Option<f64>,
        mut draw: impl FnMut(Tick) -> BurnoverResult<FrameProgress>,
    ) -> BurnoverResult<CaptureStats> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(BurnoverError::export("draw loop already running"));
        }
        let _guard = ActiveGuard(&self.active);

        let end_at = duration_sec.filter(|d| *d > 0.0);
        let mut stats = CaptureStats {
            ticks: 0,
            frames_drawn: 0,
            end_reason: EndReason::Cancelled,
        };

        while let Some(mut tick) = ticker.next_tick() {
            stats.ticks += 1;
            let final_tick = match end_at {
                Some(d) if tick.media_time >= d => {
                    tick.media_time = d;
                    true
                }
                _ => false,
            };
            let progress = draw(tick)?;
            stats.frames_drawn += 1;
            if final_tick {
                stats.end_reason = EndReason::Completed;
                break;
            }
            if end_at.is_none() && progress == FrameProgress::SourceExhausted {
                stats.end_reason = EndReason::SourceExhausted;
                break;
            }
        }

        tracing::debug!(
            ticks = stats.ticks,
            frames = stats.frames_drawn,
            reason = ?stats.end_reason,
            "draw loop ended"
        );
        Ok(stats)
    }
}

struct ActiveGuard<'a>(&'a AtomicBool);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
