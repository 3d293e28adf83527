use crate::media::playback::VideoFrame;
use crate::overlay::config::OverlayConfig;
use crate::overlay::layout::{self, OverlayLayout};
use crate::overlay::raster::Surface;
use crate::text::font::{FontLibrary, FontWeight};

const WHITE: [u8; 4] = [255, 255, 255, 255];
const CHIP_FILL: [u8; 4] = [0, 0, 0, 140];
const SHADOW: [u8; 4] = [0, 0, 0, 204];

/// Composite one frame: video image, readability scrim, caption chip,
/// headline with drop shadow, wrapped body copy.
///
/// Pure side effect on `surface`. Any string content is safe, including
/// empty (element suppressed), very long, and whitespace-free text.
pub fn draw_frame(
    surface: &mut Surface,
    frame: &VideoFrame,
    config: &OverlayConfig,
    fonts: &FontLibrary,
) {
    let layout = OverlayLayout::new(surface.dimensions());

    surface.blit_scaled(frame);

    surface.fill_vertical_gradient(
        layout.scrim_band(),
        [0, 0, 0],
        0,
        layout.scrim_max_alpha(),
    );

    let caption = config.caption.trim();
    if !caption.is_empty() {
        let px = layout.caption_px() as f32;
        let text_width = f64::from(fonts.measure_width(caption, px, FontWeight::SemiBold));
        let ascent = f64::from(fonts.ascent(px, FontWeight::SemiBold));
        let descent = f64::from(fonts.descent(px, FontWeight::SemiBold));
        let origin = layout.caption_origin();
        surface.fill_rect(layout.caption_chip(text_width, ascent, descent), CHIP_FILL);
        fonts.draw_line(
            surface,
            caption,
            origin.x,
            origin.y,
            px,
            FontWeight::SemiBold,
            WHITE,
        );
    }

    let headline = config.headline.trim();
    if !headline.is_empty() {
        let text = headline.to_uppercase();
        let px = layout.headline_px() as f32;
        let text_width = f64::from(fonts.measure_width(&text, px, FontWeight::ExtraBold));
        let x = layout.centered_x(text_width);
        let y = layout.headline_baseline_y();
        fonts.draw_line_shadow(
            surface,
            &text,
            x,
            y,
            px,
            FontWeight::ExtraBold,
            layout.headline_shadow_radius(),
            SHADOW,
        );
        fonts.draw_line(
            surface,
            &text,
            x,
            y,
            px,
            FontWeight::ExtraBold,
            config.accent.rgba(),
        );
    }

    let body = config.body.trim();
    if !body.is_empty() {
        let px = layout.body_px() as f32;
        let lines = layout::wrap_lines(body, layout.body_max_width(), |s| {
            f64::from(fonts.measure_width(s, px, FontWeight::Regular))
        });
        let mut baseline = layout.body_first_baseline_y();
        for line in &lines {
            let text_width = f64::from(fonts.measure_width(line, px, FontWeight::Regular));
            fonts.draw_line(
                surface,
                line,
                layout.centered_x(text_width),
                baseline,
                px,
                FontWeight::Regular,
                WHITE,
            );
            baseline += layout.body_line_height();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Dimensions;
    use crate::overlay::config::AccentColor;

    fn white_frame(dims: Dimensions) -> VideoFrame {
        let mut f = VideoFrame::black(dims).unwrap();
        for px in f.data.chunks_exact_mut(4) {
            px[0] = 255;
            px[1] = 255;
            px[2] = 255;
        }
        f
    }

    fn blank_config() -> OverlayConfig {
        OverlayConfig {
            caption: String::new(),
            headline: String::new(),
            body: String::new(),
            accent: AccentColor::DEFAULT,
        }
    }

    fn any_fonts() -> FontLibrary {
        FontLibrary::load(None).unwrap()
    }

    fn system_fonts() -> Option<FontLibrary> {
        let lib = any_fonts();
        if lib.is_empty() { None } else { Some(lib) }
    }

    #[test]
    fn scrim_darkens_only_the_bottom_band() {
        let dims = Dimensions::new(64, 100);
        let mut surface = Surface::new(dims).unwrap();
        draw_frame(&mut surface, &white_frame(dims), &blank_config(), &any_fonts());

        // Above the band the video shows through untouched.
        assert_eq!(surface.pixel(10, 10), [255, 255, 255, 255]);
        assert_eq!(surface.pixel(10, 60), [255, 255, 255, 255]);
        // Near the bottom roughly a quarter of the luminance survives.
        let bottom = surface.pixel(10, 99)[0];
        assert!((i32::from(bottom) - 64).abs() <= 6, "bottom {bottom}");
    }

    #[test]
    fn scrim_band_position_scales_with_resolution() {
        for dims in [Dimensions::new(64, 100), Dimensions::new(128, 200)] {
            let mut surface = Surface::new(dims).unwrap();
            draw_frame(&mut surface, &white_frame(dims), &blank_config(), &any_fonts());
            let first_dark = (0..dims.height)
                .find(|&y| surface.pixel(1, y)[0] != 255)
                .unwrap();
            let ratio = f64::from(first_dark) / f64::from(dims.height);
            assert!((ratio - 0.65).abs() < 0.03, "{dims}: ratio {ratio}");
        }
    }

    #[test]
    fn caption_chip_appears_only_for_nonblank_caption() {
        let dims = Dimensions::new(200, 100);
        let mut without = Surface::new(dims).unwrap();
        draw_frame(&mut without, &white_frame(dims), &blank_config(), &any_fonts());

        let mut with = Surface::new(dims).unwrap();
        let cfg = OverlayConfig {
            caption: "LIVE".to_string(),
            ..blank_config()
        };
        draw_frame(&mut with, &white_frame(dims), &cfg, &any_fonts());

        // The chip rectangle shades the upper band even on fontless hosts.
        assert_ne!(with.data(), without.data());
        let mut blank_caption = Surface::new(dims).unwrap();
        let cfg = OverlayConfig {
            caption: "   ".to_string(),
            ..blank_config()
        };
        draw_frame(&mut blank_caption, &white_frame(dims), &cfg, &any_fonts());
        assert_eq!(blank_caption.data(), without.data());
    }

    #[test]
    fn never_panics_for_hostile_strings() {
        let dims = Dimensions::new(120, 80);
        let fonts = any_fonts();
        let long_word = "x".repeat(500);
        let spaced = "word ".repeat(100);
        for caption in ["", "short", long_word.as_str(), spaced.as_str()] {
            for body in ["", long_word.as_str(), spaced.as_str(), "\u{1F600}\u{0}"] {
                let cfg = OverlayConfig {
                    caption: caption.to_string(),
                    headline: long_word.clone(),
                    body: body.to_string(),
                    accent: AccentColor::DEFAULT,
                };
                let mut surface = Surface::new(dims).unwrap();
                draw_frame(&mut surface, &white_frame(dims), &cfg, &fonts);
            }
        }
    }

    #[test]
    fn headline_renders_and_uppercases() {
        let Some(fonts) = system_fonts() else {
            return;
        };
        let dims = Dimensions::new(320, 180);
        let mut with_upper = Surface::new(dims).unwrap();
        let cfg = OverlayConfig {
            headline: "go".to_string(),
            ..blank_config()
        };
        draw_frame(&mut with_upper, &white_frame(dims), &cfg, &fonts);

        let mut explicit_upper = Surface::new(dims).unwrap();
        let cfg = OverlayConfig {
            headline: "GO".to_string(),
            ..blank_config()
        };
        draw_frame(&mut explicit_upper, &white_frame(dims), &cfg, &fonts);

        let mut without = Surface::new(dims).unwrap();
        draw_frame(&mut without, &white_frame(dims), &blank_config(), &fonts);

        assert_eq!(with_upper.data(), explicit_upper.data());
        assert_ne!(with_upper.data(), without.data());
    }

    #[test]
    fn empty_body_suppresses_body_but_keeps_headline() {
        let Some(fonts) = system_fonts() else {
            return;
        };
        let dims = Dimensions::new(320, 180);
        let headline_only = {
            let mut s = Surface::new(dims).unwrap();
            let cfg = OverlayConfig {
                headline: "NEWS".to_string(),
                ..blank_config()
            };
            draw_frame(&mut s, &white_frame(dims), &cfg, &fonts);
            s
        };
        let with_body = {
            let mut s = Surface::new(dims).unwrap();
            let cfg = OverlayConfig {
                headline: "NEWS".to_string(),
                body: "Something happened today".to_string(),
                ..blank_config()
            };
            draw_frame(&mut s, &white_frame(dims), &cfg, &fonts);
            s
        };
        let plain = {
            let mut s = Surface::new(dims).unwrap();
            draw_frame(&mut s, &white_frame(dims), &blank_config(), &fonts);
            s
        };

        // Headline drew in both; the body only in one.
        assert_ne!(headline_only.data(), plain.data());
        assert_ne!(with_body.data(), headline_only.data());
    }

    #[test]
    fn accent_color_reaches_the_headline_pixels() {
        let Some(fonts) = system_fonts() else {
            return;
        };
        let dims = Dimensions::new(320, 180);
        let mut red = Surface::new(dims).unwrap();
        let cfg = OverlayConfig {
            headline: "GO".to_string(),
            accent: AccentColor([255, 0, 0]),
            ..blank_config()
        };
        draw_frame(&mut red, &white_frame(dims), &cfg, &fonts);

        let mut green = Surface::new(dims).unwrap();
        let cfg = OverlayConfig {
            headline: "GO".to_string(),
            accent: AccentColor([0, 255, 0]),
            ..blank_config()
        };
        draw_frame(&mut green, &white_frame(dims), &cfg, &fonts);

        assert_ne!(red.data(), green.data());
    }
}
