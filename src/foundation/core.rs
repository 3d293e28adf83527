use crate::foundation::error::{BurnoverError, BurnoverResult};

pub use kurbo::{Point, Rect};

/// Frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Return `true` when either axis is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Byte length of one RGBA8 frame at these dimensions, overflow-checked.
    pub fn rgba_len(self) -> BurnoverResult<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| BurnoverError::surface("frame byte size overflows usize"))
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> BurnoverResult<Self> {
        if den == 0 {
            return Err(BurnoverError::metadata("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(BurnoverError::metadata("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Whole frames per second, for hosts that only take an integer rate.
    pub fn whole(rate: u32) -> BurnoverResult<Self> {
        Self::new(rate, 1)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Convert frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    /// Convert seconds to frame count using floor semantics.
    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        (secs * self.as_f64()).floor().max(0.0) as u64
    }

    /// Nearest integer rate, clamped into `1..=max`.
    pub fn rounded_clamped(self, max: u32) -> u32 {
        let r = self.as_f64().round();
        if !r.is_finite() || r < 1.0 {
            return 1;
        }
        (r as u32).min(max)
    }
}

impl std::fmt::Display for Fps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_rgba_len() {
        let d = Dimensions::new(64, 36);
        assert_eq!(d.rgba_len().unwrap(), 64 * 36 * 4);
        assert!(!d.is_empty());
        assert!(Dimensions::new(0, 36).is_empty());
    }

    #[test]
    fn dimensions_rgba_len_overflow_is_error() {
        let d = Dimensions::new(u32::MAX, u32::MAX);
        assert!(d.rgba_len().is_err());
    }

    #[test]
    fn fps_rejects_zero() {
        assert!(Fps::new(30, 0).is_err());
        assert!(Fps::new(0, 1).is_err());
        assert!(Fps::new(30000, 1001).is_ok());
    }

    #[test]
    fn fps_roundtrip_math() {
        let fps = Fps::new(30, 1).unwrap();
        assert_eq!(fps.as_f64(), 30.0);
        assert_eq!(fps.secs_to_frames_floor(1.0), 30);
        assert_eq!(fps.frames_to_secs(30), 1.0);
    }

    #[test]
    fn fps_ntsc_rounds_to_30() {
        let fps = Fps::new(30000, 1001).unwrap();
        assert_eq!(fps.rounded_clamped(120), 30);
    }

    #[test]
    fn fps_rounded_is_clamped() {
        let fps = Fps::new(240, 1).unwrap();
        assert_eq!(fps.rounded_clamped(120), 120);
    }
}
