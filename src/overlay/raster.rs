use kurbo::Rect;

use crate::foundation::core::Dimensions;
use crate::foundation::error::{BurnoverError, BurnoverResult};
use crate::media::playback::VideoFrame;

/// Off-screen straight-alpha RGBA8 bitmap the composite is drawn onto.
///
/// The surface always matches the source video's native resolution and every
/// pixel stays opaque; overlay elements are blended over the video image.
pub struct Surface {
    dims: Dimensions,
    data: Vec<u8>,
}

impl Surface {
    pub fn new(dims: Dimensions) -> BurnoverResult<Self> {
        if dims.is_empty() {
            return Err(BurnoverError::surface(format!(
                "cannot acquire a {dims} drawing surface"
            )));
        }
        let len = dims.rgba_len()?;
        let mut data = vec![0u8; len];
        for px in data.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Ok(Self { dims, data })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn width(&self) -> u32 {
        self.dims.width
    }

    pub fn height(&self) -> u32 {
        self.dims.height
    }

    /// Raw RGBA8 bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.dims.width + x) * 4) as usize;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Draw `frame` scaled to exactly fill the surface (nearest neighbor,
    /// aspect distortion accepted). Equal dimensions degenerate to a copy.
    pub fn blit_scaled(&mut self, frame: &VideoFrame) {
        if frame.dims == self.dims {
            self.data.copy_from_slice(&frame.data);
            return;
        }
        let (sw, sh) = (frame.dims.width as u64, frame.dims.height as u64);
        let (dw, dh) = (self.dims.width as u64, self.dims.height as u64);
        for y in 0..dh {
            let sy = y * sh / dh;
            let src_row = (sy * sw * 4) as usize;
            let dst_row = (y * dw * 4) as usize;
            for x in 0..dw {
                let sx = (x * sw / dw) as usize;
                let s = src_row + sx * 4;
                let d = dst_row + (x as usize) * 4;
                self.data[d] = frame.data[s];
                self.data[d + 1] = frame.data[s + 1];
                self.data[d + 2] = frame.data[s + 2];
                self.data[d + 3] = 255;
            }
        }
    }

    /// Blend a solid color over the clipped rectangle.
    pub fn fill_rect(&mut self, rect: Rect, color: [u8; 4]) {
        let Some((x0, x1)) = clip_span(rect.x0, rect.x1, self.dims.width) else {
            return;
        };
        let Some((y0, y1)) = clip_span(rect.y0, rect.y1, self.dims.height) else {
            return;
        };
        for y in y0..y1 {
            let row = (y * self.dims.width * 4) as usize;
            for x in x0..x1 {
                let idx = row + (x as usize) * 4;
                blend_px(&mut self.data[idx..idx + 4], color);
            }
        }
    }

    /// Blend a vertical gradient of `color` whose alpha runs from
    /// `top_alpha` at the rectangle's top edge to `bottom_alpha` at its
    /// bottom edge.
    pub fn fill_vertical_gradient(
        &mut self,
        rect: Rect,
        color: [u8; 3],
        top_alpha: u8,
        bottom_alpha: u8,
    ) {
        let Some((x0, x1)) = clip_span(rect.x0, rect.x1, self.dims.width) else {
            return;
        };
        let Some((y0, y1)) = clip_span(rect.y0, rect.y1, self.dims.height) else {
            return;
        };
        let span = (rect.y1 - rect.y0).max(1.0);
        for y in y0..y1 {
            let t = ((f64::from(y) + 0.5 - rect.y0) / span).clamp(0.0, 1.0);
            let alpha = f64::from(top_alpha) + (f64::from(bottom_alpha) - f64::from(top_alpha)) * t;
            let src = [color[0], color[1], color[2], alpha.round() as u8];
            let row = (y * self.dims.width * 4) as usize;
            for x in x0..x1 {
                let idx = row + (x as usize) * 4;
                blend_px(&mut self.data[idx..idx + 4], src);
            }
        }
    }

    /// Blend an alpha-coverage tile (glyph bitmap, blurred shadow) in
    /// `color`, clipping against the surface bounds. `color[3]` scales the
    /// coverage.
    pub fn blend_coverage(
        &mut self,
        left: i64,
        top: i64,
        cov_width: usize,
        cov_height: usize,
        coverage: &[u8],
        color: [u8; 4],
    ) {
        if coverage.len() < cov_width * cov_height {
            return;
        }
        for cy in 0..cov_height {
            let y = top + cy as i64;
            if y < 0 || y >= i64::from(self.dims.height) {
                continue;
            }
            let row = (y as usize) * (self.dims.width as usize) * 4;
            for cx in 0..cov_width {
                let x = left + cx as i64;
                if x < 0 || x >= i64::from(self.dims.width) {
                    continue;
                }
                let cov = coverage[cy * cov_width + cx];
                if cov == 0 {
                    continue;
                }
                let a = mul_div255(cov, color[3]);
                let idx = row + (x as usize) * 4;
                blend_px(&mut self.data[idx..idx + 4], [color[0], color[1], color[2], a]);
            }
        }
    }
}

/// Straight-alpha OVER of `src` onto an opaque destination pixel.
fn blend_px(dst: &mut [u8], src: [u8; 4]) {
    let a = src[3];
    if a == 0 {
        return;
    }
    if a == 255 {
        dst[0] = src[0];
        dst[1] = src[1];
        dst[2] = src[2];
        return;
    }
    let inv = 255 - a;
    dst[0] = mul_div255(src[0], a).saturating_add(mul_div255(dst[0], inv));
    dst[1] = mul_div255(src[1], a).saturating_add(mul_div255(dst[1], inv));
    dst[2] = mul_div255(src[2], a).saturating_add(mul_div255(dst[2], inv));
}

fn mul_div255(c: u8, a: u8) -> u8 {
    ((u16::from(c) * u16::from(a) + 127) / 255) as u8
}

fn clip_span(v0: f64, v1: f64, max: u32) -> Option<(u32, u32)> {
    let a = v0.round().max(0.0) as u32;
    let b = (v1.round().min(f64::from(max))).max(0.0) as u32;
    if a >= b { None } else { Some((a, b)) }
}

/// Two-pass separable box blur of a single-channel coverage tile.
///
/// Zero-padded at the edges, so energy near the border fades out instead of
/// clamping. Radius 0 is the identity.
pub fn blur_coverage(src: &[u8], width: usize, height: usize, radius: usize) -> Vec<u8> {
    if radius == 0 || width == 0 || height == 0 || src.len() < width * height {
        return src.to_vec();
    }
    let window = (2 * radius + 1) as u32;
    let mut tmp = vec![0u8; width * height];
    let mut out = vec![0u8; width * height];

    let mut prefix = vec![0u32; width.max(height) + 1];

    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        prefix[0] = 0;
        for (x, &v) in row.iter().enumerate() {
            prefix[x + 1] = prefix[x] + u32::from(v);
        }
        for x in 0..width {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius + 1).min(width);
            tmp[y * width + x] = ((prefix[x1] - prefix[x0]) / window) as u8;
        }
    }

    for x in 0..width {
        prefix[0] = 0;
        for y in 0..height {
            prefix[y + 1] = prefix[y] + u32::from(tmp[y * width + x]);
        }
        for y in 0..height {
            let y0 = y.saturating_sub(radius);
            let y1 = (y + radius + 1).min(height);
            out[y * width + x] = ((prefix[y1] - prefix[y0]) / window) as u8;
        }
    }

    out
}
