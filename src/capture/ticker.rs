use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::foundation::core::Fps;

/// One scheduled draw instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    /// 0-based tick index.
    pub index: u64,
    /// Media time in seconds this tick samples, derived from the index.
    pub media_time: f64,
}

/// Cancels a ticker's pending and future ticks. Cloneable, idempotent.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Refresh clock for the draw loop.
///
/// Media time is derived from the tick index, never from the wall clock, so
/// the captured output is identical whether or not a ticker paces itself.
pub trait Ticker {
    /// Rate at which ticks advance media time.
    fn fps(&self) -> Fps;

    /// Deliver the next tick, or `None` once cancelled or out of ticks.
    fn next_tick(&mut self) -> Option<Tick>;

    /// Handle that stops the loop; safe to trigger from another thread.
    fn cancel_handle(&self) -> CancelHandle;
}

/// Fixed-rate ticker, optionally paced to the wall clock.
///
/// Unpaced it delivers ticks as fast as the loop consumes them, which is the
/// default for exports; paced mode sleeps each tick to its due time, checking
/// for cancellation in short slices so a pending tick is abandoned promptly.
pub struct RefreshTicker {
    fps: Fps,
    next_index: u64,
    pace: bool,
    started: Option<Instant>,
    cancel: CancelHandle,
}

impl RefreshTicker {
    pub fn new(fps: Fps) -> Self {
        Self {
            fps,
            next_index: 0,
            pace: false,
            started: None,
            cancel: CancelHandle::new(),
        }
    }

    /// Ticker that holds each tick until its wall-clock due time.
    pub fn paced(fps: Fps) -> Self {
        Self {
            pace: true,
            ..Self::new(fps)
        }
    }
}

impl Ticker for RefreshTicker {
    fn fps(&self) -> Fps {
        self.fps
    }

    fn next_tick(&mut self) -> Option<Tick> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let index = self.next_index;
        let media_time = self.fps.frames_to_secs(index);
        if self.pace {
            let started = *self.started.get_or_insert_with(Instant::now);
            let due = started + Duration::from_secs_f64(media_time);
            loop {
                if self.cancel.is_cancelled() {
                    return None;
                }
                let now = Instant::now();
                if now >= due {
                    break;
                }
                std::thread::sleep((due - now).min(Duration::from_millis(10)));
            }
        }
        self.next_index += 1;
        Some(Tick { index, media_time })
    }

    fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

/// Delivers a fixed number of ticks; deterministic clock for tests.
pub struct ManualTicker {
    fps: Fps,
    next_index: u64,
    remaining: u64,
    cancel: CancelHandle,
}

impl ManualTicker {
    pub fn new(fps: Fps, ticks: u64) -> Self {
        Self {
            fps,
            next_index: 0,
            remaining: ticks,
            cancel: CancelHandle::new(),
        }
    }
}

impl Ticker for ManualTicker {
    fn fps(&self) -> Fps {
        self.fps
    }

    fn next_tick(&mut self) -> Option<Tick> {
        if self.cancel.is_cancelled() || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let index = self.next_index;
        self.next_index += 1;
        Some(Tick {
            index,
            media_time: self.fps.frames_to_secs(index),
        })
    }

    fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}
