use std::sync::{Arc, PoisonError, RwLock};

use crate::foundation::error::{BurnoverError, BurnoverResult};

/// Overlay accent color, parsed from `#rgb` / `#rrggbb` hex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccentColor(pub [u8; 3]);

impl AccentColor {
    pub const DEFAULT: Self = Self([0xff, 0x47, 0x57]);

    pub fn parse(s: &str) -> BurnoverResult<Self> {
        let hex = s.trim().trim_start_matches('#');
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| {
                c.to_digit(16)
                    .map(|d| d as u8)
                    .ok_or_else(|| bad_color(s))
            })
            .collect::<BurnoverResult<_>>()?;
        match digits.len() {
            3 => Ok(Self([
                digits[0] * 16 + digits[0],
                digits[1] * 16 + digits[1],
                digits[2] * 16 + digits[2],
            ])),
            6 => Ok(Self([
                digits[0] * 16 + digits[1],
                digits[2] * 16 + digits[3],
                digits[4] * 16 + digits[5],
            ])),
            _ => Err(bad_color(s)),
        }
    }

    /// Opaque straight-alpha RGBA.
    pub fn rgba(self) -> [u8; 4] {
        [self.0[0], self.0[1], self.0[2], 255]
    }
}

fn bad_color(s: &str) -> BurnoverError {
    BurnoverError::invalid_input(format!("'{s}' is not a #rgb or #rrggbb color"))
}

impl std::fmt::Display for AccentColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

impl std::str::FromStr for AccentColor {
    type Err = BurnoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for AccentColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for AccentColor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// The text and color drawn over every frame.
///
/// All fields are optional with defaults; blank strings suppress their
/// element entirely.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Live caption line; off when blank.
    pub caption: String,
    /// Headline, drawn upper-cased in the accent color.
    pub headline: String,
    /// Supporting paragraph, word-wrapped under the headline.
    pub body: String,
    /// Headline color.
    pub accent: AccentColor,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            caption: String::new(),
            headline: "Launch Day".to_string(),
            body: "Add a headline and supporting copy, then export a share-ready clip."
                .to_string(),
            accent: AccentColor::DEFAULT,
        }
    }
}

/// Shared handle to the overlay configuration.
///
/// The compositor snapshots the latest value on every frame, so edits made
/// while an export is recording land on later frames. That live behavior is
/// intentional.
#[derive(Clone, Default)]
pub struct OverlayHandle(Arc<RwLock<OverlayConfig>>);

impl OverlayHandle {
    pub fn new(config: OverlayConfig) -> Self {
        Self(Arc::new(RwLock::new(config)))
    }

    /// Copy of the current configuration.
    pub fn snapshot(&self) -> OverlayConfig {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the configuration wholesale.
    pub fn set(&self, config: OverlayConfig) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Edit the configuration in place.
    pub fn update(&self, edit: impl FnOnce(&mut OverlayConfig)) {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        edit(&mut guard);
    }
}
