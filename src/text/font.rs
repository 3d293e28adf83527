use std::path::Path;
use std::sync::Arc;

use fontdue::{Font, FontSettings};

use crate::foundation::error::{BurnoverError, BurnoverResult};
use crate::overlay::raster::{self, Surface};

/// Overlay font weights, resolved independently so hosts with real weight
/// families render the caption, headline, and body distinctly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontWeight {
    /// Body copy (400).
    Regular,
    /// Caption (600).
    SemiBold,
    /// Headline (800).
    ExtraBold,
}

impl FontWeight {
    fn css(self) -> u16 {
        match self {
            Self::Regular => 400,
            Self::SemiBold => 600,
            Self::ExtraBold => 800,
        }
    }
}

/// Sans-serif faces for the three overlay weights.
///
/// A host with no discoverable fonts yields an empty library: measurement
/// returns zero and drawing is a no-op, so the composite degrades to a
/// text-free frame instead of failing the export.
pub struct FontLibrary {
    regular: Option<Arc<Font>>,
    semibold: Option<Arc<Font>>,
    extrabold: Option<Arc<Font>>,
}

impl FontLibrary {
    /// Resolve faces from the system font database, or load every weight
    /// from one explicit font file.
    pub fn load(explicit: Option<&Path>) -> BurnoverResult<Self> {
        if let Some(path) = explicit {
            let bytes = std::fs::read(path).map_err(|e| {
                BurnoverError::invalid_input(format!(
                    "could not read font '{}': {e}",
                    path.display()
                ))
            })?;
            let font = Font::from_bytes(bytes.as_slice(), FontSettings::default()).map_err(|e| {
                BurnoverError::invalid_input(format!(
                    "could not parse font '{}': {e}",
                    path.display()
                ))
            })?;
            let font = Arc::new(font);
            return Ok(Self {
                regular: Some(font.clone()),
                semibold: Some(font.clone()),
                extrabold: Some(font),
            });
        }

        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let regular = query_sans(&db, FontWeight::Regular.css());
        let semibold = query_sans(&db, FontWeight::SemiBold.css());
        let extrabold = query_sans(&db, FontWeight::ExtraBold.css());

        let mut lib = Self {
            regular,
            semibold,
            extrabold,
        };
        lib.fill_missing_weights();
        if lib.is_empty() {
            tracing::warn!("no system sans-serif font found, text overlays will be skipped");
        }
        Ok(lib)
    }

    /// Reuse any resolved face for weights the host could not supply.
    fn fill_missing_weights(&mut self) {
        let fallback = self
            .semibold
            .clone()
            .or_else(|| self.regular.clone())
            .or_else(|| self.extrabold.clone());
        let Some(fallback) = fallback else {
            return;
        };
        self.regular.get_or_insert_with(|| fallback.clone());
        self.semibold.get_or_insert_with(|| fallback.clone());
        self.extrabold.get_or_insert_with(|| fallback.clone());
    }

    pub fn is_empty(&self) -> bool {
        self.regular.is_none() && self.semibold.is_none() && self.extrabold.is_none()
    }

    fn face(&self, weight: FontWeight) -> Option<&Font> {
        match weight {
            FontWeight::Regular => self.regular.as_deref(),
            FontWeight::SemiBold => self.semibold.as_deref(),
            FontWeight::ExtraBold => self.extrabold.as_deref(),
        }
    }

    /// Advance width of `text` at `px`, zero when no face is loaded.
    pub fn measure_width(&self, text: &str, px: f32, weight: FontWeight) -> f32 {
        let Some(font) = self.face(weight) else {
            return 0.0;
        };
        text.chars()
            .map(|ch| font.metrics(ch, px).advance_width)
            .sum()
    }

    /// Distance from baseline to the top of a line box.
    pub fn ascent(&self, px: f32, weight: FontWeight) -> f32 {
        self.face(weight)
            .and_then(|f| f.horizontal_line_metrics(px))
            .map(|m| m.ascent)
            .unwrap_or(px * 0.8)
    }

    /// Distance from baseline to the bottom of a line box, as a positive px
    /// count.
    pub fn descent(&self, px: f32, weight: FontWeight) -> f32 {
        self.face(weight)
            .and_then(|f| f.horizontal_line_metrics(px))
            .map(|m| (-m.descent).max(0.0))
            .unwrap_or(px * 0.25)
    }

    /// Rasterize one line of text with its left edge at `x` and its baseline
    /// at `baseline_y`.
    pub fn draw_line(
        &self,
        surface: &mut Surface,
        text: &str,
        x: f64,
        baseline_y: f64,
        px: f32,
        weight: FontWeight,
        color: [u8; 4],
    ) {
        let Some(font) = self.face(weight) else {
            return;
        };
        let mut pen_x = x as f32;
        let baseline = baseline_y as f32;
        for ch in text.chars() {
            let (metrics, bitmap) = font.rasterize(ch, px);
            if metrics.width > 0 && metrics.height > 0 {
                let left = (pen_x + metrics.xmin as f32).round() as i64;
                let top =
                    (baseline - (metrics.height as i32 + metrics.ymin) as f32).round() as i64;
                surface.blend_coverage(left, top, metrics.width, metrics.height, &bitmap, color);
            }
            pen_x += metrics.advance_width;
        }
    }

    /// Draw the blurred shadow for one line of text: the line's coverage is
    /// rasterized into a padded tile, box-blurred, and blended in `color`.
    pub fn draw_line_shadow(
        &self,
        surface: &mut Surface,
        text: &str,
        x: f64,
        baseline_y: f64,
        px: f32,
        weight: FontWeight,
        radius: usize,
        color: [u8; 4],
    ) {
        let Some(font) = self.face(weight) else {
            return;
        };
        let width = self.measure_width(text, px, weight);
        let ascent = self.ascent(px, weight);
        let descent = self.descent(px, weight);
        let pad = radius + 2;

        let tile_w = (width.ceil() as usize).saturating_add(2 * pad);
        let tile_h = ((ascent + descent).ceil() as usize).saturating_add(2 * pad);
        if tile_w == 0 || tile_h == 0 || tile_w.saturating_mul(tile_h) > 1 << 26 {
            return;
        }
        let mut tile = vec![0u8; tile_w * tile_h];

        // Tile origin maps to (x - pad, baseline - ascent - pad) on the surface.
        let mut pen_x = pad as f32;
        let baseline = pad as f32 + ascent;
        for ch in text.chars() {
            let (metrics, bitmap) = font.rasterize(ch, px);
            if metrics.width > 0 && metrics.height > 0 {
                let left = (pen_x + metrics.xmin as f32).round() as i64;
                let top =
                    (baseline - (metrics.height as i32 + metrics.ymin) as f32).round() as i64;
                stamp_coverage(&mut tile, tile_w, tile_h, left, top, &metrics, &bitmap);
            }
            pen_x += metrics.advance_width;
        }

        let blurred = raster::blur_coverage(&tile, tile_w, tile_h, radius);
        let left = (x - pad as f64).round() as i64;
        let top = (baseline_y - f64::from(ascent) - pad as f64).round() as i64;
        surface.blend_coverage(left, top, tile_w, tile_h, &blurred, color);
    }
}

fn query_sans(db: &fontdb::Database, weight: u16) -> Option<Arc<Font>> {
    let query = fontdb::Query {
        families: &[fontdb::Family::SansSerif],
        weight: fontdb::Weight(weight),
        ..fontdb::Query::default()
    };
    let id = db.query(&query)?;
    db.with_face_data(id, |data, index| {
        Font::from_bytes(
            data,
            FontSettings {
                collection_index: index,
                ..FontSettings::default()
            },
        )
        .ok()
        .map(Arc::new)
    })
    .flatten()
}

/// Saturating-add a glyph bitmap into the coverage tile, clipped.
fn stamp_coverage(
    tile: &mut [u8],
    tile_w: usize,
    tile_h: usize,
    left: i64,
    top: i64,
    metrics: &fontdue::Metrics,
    bitmap: &[u8],
) {
    for gy in 0..metrics.height {
        let ty = top + gy as i64;
        if ty < 0 || ty >= tile_h as i64 {
            continue;
        }
        for gx in 0..metrics.width {
            let tx = left + gx as i64;
            if tx < 0 || tx >= tile_w as i64 {
                continue;
            }
            let idx = ty as usize * tile_w + tx as usize;
            tile[idx] = tile[idx].saturating_add(bitmap[gy * metrics.width + gx]);
        }
    }
}
