//! CPU text rasterization for overlays and subtitle burn-in.
//!
//! Single-line layout with per-glyph metrics from `fontdue`. Legibility
//! decorations (drop shadow for overlays, outline for subtitles) are drawn
//! as extra passes of the same line.

use fontdue::Font;

use crate::compose::raster::{self, PremulRgba8};

#[derive(Clone, Copy, Debug, Default)]
pub struct LineMetrics {
    pub width: f64,
    pub ascent: f64,
    pub descent: f64,
}

impl LineMetrics {
    pub fn height(&self) -> f64 {
        self.ascent + self.descent
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextDecoration {
    None,
    /// Black drop shadow offset down-right by the given pixels.
    Shadow { offset_px: f64 },
    /// Black outline of the given thickness, then the fill on top.
    Outline { thickness_px: f64 },
}

pub fn measure_line(font: &Font, size: f32, text: &str) -> LineMetrics {
    let mut width = 0.0f64;
    let mut ascent = 0.0f64;
    let mut descent = 0.0f64;
    for ch in text.chars() {
        let metrics = font.metrics(ch, size);
        ascent = ascent.max(f64::from(metrics.height as i32 + metrics.ymin));
        descent = descent.max(f64::from(-metrics.ymin));
        width += f64::from(metrics.advance_width);
    }
    LineMetrics {
        width,
        ascent,
        descent,
    }
}

/// Draw one line with its horizontal center at `center_x` and its baseline
/// at `baseline_y`, in straight RGBA `color` scaled by `opacity`.
pub fn draw_line_centered(
    layer: &mut [u8],
    lw: u32,
    lh: u32,
    font: &Font,
    size: f32,
    text: &str,
    center_x: f64,
    baseline_y: f64,
    color: [u8; 4],
    opacity: f32,
    decoration: TextDecoration,
) {
    if text.is_empty() || opacity <= 0.0 || size <= 0.0 {
        return;
    }
    let metrics = measure_line(font, size, text);
    let left = center_x - metrics.width / 2.0;

    match decoration {
        TextDecoration::None => {}
        TextDecoration::Shadow { offset_px } => {
            draw_line(
                layer,
                lw,
                lh,
                font,
                size,
                text,
                left + offset_px,
                baseline_y + offset_px,
                [0, 0, 0, color[3]],
                opacity * 0.5,
            );
        }
        TextDecoration::Outline { thickness_px } => {
            let t = thickness_px.max(1.0);
            for (dx, dy) in [
                (-t, 0.0),
                (t, 0.0),
                (0.0, -t),
                (0.0, t),
                (-t, -t),
                (t, -t),
                (-t, t),
                (t, t),
            ] {
                draw_line(
                    layer,
                    lw,
                    lh,
                    font,
                    size,
                    text,
                    left + dx,
                    baseline_y + dy,
                    [0, 0, 0, color[3]],
                    opacity,
                );
            }
        }
    }

    draw_line(
        layer, lw, lh, font, size, text, left, baseline_y, color, opacity,
    );
}

/// Draw one line starting at `left_x` with baseline `baseline_y`.
pub fn draw_line(
    layer: &mut [u8],
    lw: u32,
    lh: u32,
    font: &Font,
    size: f32,
    text: &str,
    left_x: f64,
    baseline_y: f64,
    color: [u8; 4],
    opacity: f32,
) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }

    let mut cursor_x = left_x;
    for ch in text.chars() {
        let (metrics, bitmap) = font.rasterize(ch, size);
        let glyph_left = cursor_x + f64::from(metrics.xmin);
        let glyph_top = baseline_y - f64::from(metrics.height as i32 + metrics.ymin);

        for gy in 0..metrics.height {
            for gx in 0..metrics.width {
                let coverage = bitmap[gy * metrics.width + gx];
                if coverage == 0 {
                    continue;
                }
                let px = (glyph_left + gx as f64).round() as i64;
                let py = (glyph_top + gy as f64).round() as i64;
                if px < 0 || py < 0 || px >= i64::from(lw) || py >= i64::from(lh) {
                    continue;
                }

                let alpha =
                    (f32::from(coverage) / 255.0) * (f32::from(color[3]) / 255.0) * opacity;
                let a8 = (alpha * 255.0).round().clamp(0.0, 255.0) as u8;
                if a8 == 0 {
                    continue;
                }
                let src: PremulRgba8 = [
                    ((u16::from(color[0]) * u16::from(a8) + 127) / 255) as u8,
                    ((u16::from(color[1]) * u16::from(a8) + 127) / 255) as u8,
                    ((u16::from(color[2]) * u16::from(a8) + 127) / 255) as u8,
                    a8,
                ];

                let idx = ((py as u32 * lw + px as u32) * 4) as usize;
                let d = &mut layer[idx..idx + 4];
                let out = raster::over([d[0], d[1], d[2], d[3]], src, 1.0);
                d.copy_from_slice(&out);
            }
        }

        cursor_x += f64::from(metrics.advance_width);
    }
}
