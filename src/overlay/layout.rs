use kurbo::{Point, Rect};

use crate::foundation::core::Dimensions;

/// Percent-of-frame overlay geometry.
///
/// Every measurement derives from the current frame dimensions, so the same
/// configuration lands proportionally on any input resolution.
#[derive(Clone, Copy, Debug)]
pub struct OverlayLayout {
    width: f64,
    height: f64,
}

impl OverlayLayout {
    pub fn new(dims: Dimensions) -> Self {
        Self {
            width: f64::from(dims.width),
            height: f64::from(dims.height),
        }
    }

    /// Readability scrim over the bottom 35% of the frame.
    pub fn scrim_band(&self) -> Rect {
        Rect::new(0.0, self.height * 0.65, self.width, self.height)
    }

    /// Scrim alpha at the bottom edge (75% opaque black).
    pub fn scrim_max_alpha(&self) -> u8 {
        191
    }

    /// Caption text size: 3.5% of frame width.
    pub fn caption_px(&self) -> f64 {
        self.width * 0.035
    }

    /// Left-aligned caption baseline in the upper band.
    pub fn caption_origin(&self) -> Point {
        Point::new(self.width * 0.04, self.height * 0.08)
    }

    /// Chip behind the caption, padded around the measured text box.
    pub fn caption_chip(&self, text_width: f64, ascent: f64, descent: f64) -> Rect {
        let origin = self.caption_origin();
        let pad_x = self.width * 0.012;
        let pad_y = self.height * 0.008;
        Rect::new(
            origin.x - pad_x,
            origin.y - ascent - pad_y,
            origin.x + text_width + pad_x,
            origin.y + descent + pad_y,
        )
    }

    /// Headline text size: 7.5% of frame width.
    pub fn headline_px(&self) -> f64 {
        self.width * 0.075
    }

    /// Headline baseline sits at 78% of frame height.
    pub fn headline_baseline_y(&self) -> f64 {
        self.height * 0.78
    }

    /// Headline drop-shadow blur radius: about 0.8% of frame width.
    pub fn headline_shadow_radius(&self) -> usize {
        (self.width * 0.008).round().max(1.0) as usize
    }

    /// Body text size: 3.2% of frame width.
    pub fn body_px(&self) -> f64 {
        self.width * 0.032
    }

    /// First body baseline at 85% of frame height.
    pub fn body_first_baseline_y(&self) -> f64 {
        self.height * 0.85
    }

    /// Body line advance: 5% of frame height.
    pub fn body_line_height(&self) -> f64 {
        self.height * 0.05
    }

    /// Maximum body line width: 70% of frame width.
    pub fn body_max_width(&self) -> f64 {
        self.width * 0.70
    }

    /// X coordinate that centers a run of `text_width` pixels.
    pub fn centered_x(&self, text_width: f64) -> f64 {
        (self.width - text_width) / 2.0
    }
}

/// Greedy word wrap against a caller-supplied measure function.
///
/// Each line is a slice of the original text running from its first word to
/// its last, so whitespace between words survives the wrap and text that
/// already fits comes back as one line equal to the input. On overflow the
/// current line is flushed and the word starts the next one, dropping the
/// run it broke on. A single word wider than the limit still gets its own
/// line, so the wrap terminates for whitespace-free input. The final partial
/// line is flushed after the last word.
pub fn wrap_lines(text: &str, max_width: f64, measure: impl Fn(&str) -> f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line: Option<(usize, usize)> = None;
    for (start, end) in word_spans(text) {
        match line {
            None => line = Some((start, end)),
            Some((line_start, line_end)) => {
                if measure(&text[line_start..end]) > max_width {
                    lines.push(text[line_start..line_end].to_string());
                    line = Some((start, end));
                } else {
                    line = Some((line_start, end));
                }
            }
        }
    }
    if let Some((line_start, line_end)) = line {
        lines.push(text[line_start..line_end].to_string());
    }
    lines
}

/// Byte ranges of the maximal non-whitespace runs in `text`.
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    // Ten pixels per character keeps the wrap math easy to eyeball.
    fn measure(s: &str) -> f64 {
        s.chars().count() as f64 * 10.0
    }

    #[test]
    fn wrap_of_fitting_text_is_the_input() {
        let lines = wrap_lines("hello brave world", 1000.0, measure);
        assert_eq!(lines, vec!["hello brave world".to_string()]);
    }

    #[test]
    fn wrap_flushes_on_overflow() {
        let lines = wrap_lines("aaaa bbbb cccc", 100.0, measure);
        assert_eq!(lines, vec!["aaaa bbbb".to_string(), "cccc".to_string()]);
    }

    #[test]
    fn wrap_empty_and_blank_produce_no_lines() {
        assert!(wrap_lines("", 100.0, measure).is_empty());
        assert!(wrap_lines("   \t  ", 100.0, measure).is_empty());
    }

    #[test]
    fn wrap_keeps_interior_whitespace_runs() {
        let text = "brand  drop   incoming";
        let lines = wrap_lines(text, 1000.0, measure);
        assert_eq!(lines, vec![text.to_string()]);

        // The run at a break point is still consumed by the break.
        let lines = wrap_lines("aa  bb", 40.0, measure);
        assert_eq!(lines, vec!["aa".to_string(), "bb".to_string()]);
    }

    #[test]
    fn wrap_terminates_for_whitespace_free_input() {
        let word: String = std::iter::repeat('x').take(500).collect();
        let lines = wrap_lines(&word, 100.0, measure);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 500);
    }

    #[test]
    fn wrap_oversized_word_gets_own_line() {
        let lines = wrap_lines("a gigantic-word-wider-than-any-line b", 120.0, measure);
        assert_eq!(
            lines,
            vec![
                "a".to_string(),
                "gigantic-word-wider-than-any-line".to_string(),
                "b".to_string(),
            ]
        );
    }

    #[test]
    fn geometry_scales_with_dimensions() {
        let small = OverlayLayout::new(Dimensions::new(640, 360));
        let large = OverlayLayout::new(Dimensions::new(1280, 720));

        assert_eq!(small.headline_baseline_y() * 2.0, large.headline_baseline_y());
        assert_eq!(small.caption_px() * 2.0, large.caption_px());
        assert_eq!(small.body_max_width() * 2.0, large.body_max_width());
        assert_eq!(small.scrim_band().y0 * 2.0, large.scrim_band().y0);
        assert_eq!(small.body_line_height() * 2.0, large.body_line_height());
    }

    #[test]
    fn geometry_ratios_match_the_design() {
        let l = OverlayLayout::new(Dimensions::new(1920, 1080));
        assert!((l.headline_baseline_y() / 1080.0 - 0.78).abs() < 1e-9);
        assert!((l.body_first_baseline_y() / 1080.0 - 0.85).abs() < 1e-9);
        assert!((l.headline_px() / 1920.0 - 0.075).abs() < 1e-9);
        assert!((l.scrim_band().y0 / 1080.0 - 0.65).abs() < 1e-9);
    }

    #[test]
    fn centered_x_centers() {
        let l = OverlayLayout::new(Dimensions::new(100, 100));
        assert_eq!(l.centered_x(40.0), 30.0);
    }

    #[test]
    fn caption_chip_wraps_text_box() {
        let l = OverlayLayout::new(Dimensions::new(1000, 1000));
        let chip = l.caption_chip(200.0, 30.0, 8.0);
        let origin = l.caption_origin();
        assert!(chip.x0 < origin.x);
        assert!(chip.x1 > origin.x + 200.0);
        assert!(chip.y0 < origin.y - 30.0);
        assert!(chip.y1 > origin.y + 8.0);
    }
}
