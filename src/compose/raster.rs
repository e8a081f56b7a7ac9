//! Premultiplied RGBA8 pixel operations for the CPU compositor.

use crate::assets::PreparedImage;
use crate::compose::filters::ColorFilter;

pub type PremulRgba8 = [u8; 4];

/// Source-over blend of one premultiplied pixel with an extra opacity.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = mul_div255(u16::from(dst[3]), inv).saturating_add(sa);

    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Source-over an entire equal-sized layer onto `dst`.
pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) {
    debug_assert_eq!(dst.len(), src.len());
    if opacity <= 0.0 {
        return;
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
}

pub fn fill_solid(buf: &mut [u8], color: PremulRgba8) {
    for px in buf.chunks_exact_mut(4) {
        px.copy_from_slice(&color);
    }
}

/// Fill an axis-aligned rect (clipped to the buffer) with `color`.
pub fn fill_rect(
    buf: &mut [u8],
    width: u32,
    height: u32,
    x0: i32,
    y0: i32,
    w: u32,
    h: u32,
    color: PremulRgba8,
) {
    let xa = x0.max(0) as u32;
    let ya = y0.max(0) as u32;
    let xb = ((x0 + w as i32).max(0) as u32).min(width);
    let yb = ((y0 + h as i32).max(0) as u32).min(height);
    for y in ya..yb {
        for x in xa..xb {
            let idx = ((y * width + x) * 4) as usize;
            buf[idx..idx + 4].copy_from_slice(&color);
        }
    }
}

/// Multiply RGB (not alpha) by `factor`; valid on premultiplied pixels.
pub fn darken_in_place(buf: &mut [u8], factor: f32) {
    let f = ((factor.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16;
    for px in buf.chunks_exact_mut(4) {
        for c in px.iter_mut().take(3) {
            *c = mul_div255(u16::from(*c), f);
        }
    }
}

/// Draw `img` into the destination rectangle `dst`, running every sampled
/// texel through `filter`. Bilinear sampling in premultiplied space; the
/// filter operates on unpremultiplied color.
pub fn draw_image_rect(
    layer: &mut [u8],
    lw: u32,
    lh: u32,
    img: &PreparedImage,
    dst: kurbo::Rect,
    filter: &ColorFilter,
) {
    let (dst_w, dst_h) = (dst.width(), dst.height());
    if img.width == 0
        || img.height == 0
        || !(dst_w.is_finite() && dst_h.is_finite())
        || dst_w <= 0.0
        || dst_h <= 0.0
    {
        return;
    }

    let xa = dst.x0.floor().max(0.0) as u32;
    let ya = dst.y0.floor().max(0.0) as u32;
    let xb = (dst.x1.ceil().max(0.0) as u32).min(lw);
    let yb = (dst.y1.ceil().max(0.0) as u32).min(lh);

    let src = img.rgba8_premul.as_slice();
    let inv_x = f64::from(img.width) / dst_w;
    let inv_y = f64::from(img.height) / dst_h;

    for y in ya..yb {
        let sy = (y as f64 + 0.5 - dst.y0) * inv_y - 0.5;
        for x in xa..xb {
            let sx = (x as f64 + 0.5 - dst.x0) * inv_x - 0.5;
            let mut px = sample_bilinear(src, img.width, img.height, sx, sy);
            if px[3] == 0 {
                continue;
            }
            if !filter.is_identity() {
                px = filter.apply_premul(px);
            }
            let idx = ((y * lw + x) * 4) as usize;
            let d = &mut layer[idx..idx + 4];
            let out = over([d[0], d[1], d[2], d[3]], px, 1.0);
            d.copy_from_slice(&out);
        }
    }
}

fn sample_bilinear(src: &[u8], w: u32, h: u32, x: f64, y: f64) -> PremulRgba8 {
    let max_x = (w - 1) as f64;
    let max_y = (h - 1) as f64;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let px = |xx: u32, yy: u32| -> [f32; 4] {
        let idx = ((yy * w + xx) * 4) as usize;
        [
            src[idx] as f32,
            src[idx + 1] as f32,
            src[idx + 2] as f32,
            src[idx + 3] as f32,
        ]
    };

    let (p00, p10, p01, p11) = (px(x0, y0), px(x1, y0), px(x0, y1), px(x1, y1));
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] + (p10[c] - p00[c]) * fx;
        let bot = p01[c] + (p11[c] - p01[c]) * fx;
        out[c] = (top + (bot - top) * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn over_opacity_0_is_noop() {
        let dst = [1, 2, 3, 4];
        let src = [200, 200, 200, 200];
        assert_eq!(over(dst, src, 0.0), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let dst = [0, 0, 0, 255];
        let src = [255, 0, 0, 255];
        assert_eq!(over(dst, src, 1.0), src);
    }

    #[test]
    fn over_dst_transparent_returns_scaled_src() {
        let dst = [0, 0, 0, 0];
        let src = [100, 110, 120, 200];
        assert_eq!(over(dst, src, 1.0), src);
    }

    #[test]
    fn darken_scales_rgb_only() {
        let mut buf = vec![200u8, 100, 50, 255];
        darken_in_place(&mut buf, 0.5);
        assert_eq!(buf[3], 255);
        assert!(buf[0] < 110 && buf[0] > 90);
    }

    #[test]
    fn fill_rect_clips_to_bounds() {
        let mut buf = vec![0u8; 4 * 4 * 4];
        fill_rect(&mut buf, 4, 4, -2, -2, 3, 3, [255, 255, 255, 255]);
        // Only the 1x1 overlap at (0,0) is written.
        assert_eq!(&buf[0..4], &[255, 255, 255, 255]);
        assert_eq!(&buf[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn draw_image_rect_fills_exactly_its_rect() {
        let img = PreparedImage {
            width: 2,
            height: 2,
            rgba8_premul: Arc::new(vec![255u8; 16]),
        };
        let mut layer = vec![0u8; 4 * 4 * 4];
        draw_image_rect(
            &mut layer,
            4,
            4,
            &img,
            kurbo::Rect::new(1.0, 1.0, 3.0, 3.0),
            &ColorFilter::identity(),
        );
        // Center 2x2 is opaque white, corners untouched.
        let at = |x: u32, y: u32| &layer[((y * 4 + x) * 4) as usize..((y * 4 + x) * 4 + 4) as usize];
        assert_eq!(at(1, 1), &[255, 255, 255, 255]);
        assert_eq!(at(2, 2), &[255, 255, 255, 255]);
        assert_eq!(at(0, 0), &[0, 0, 0, 0]);
    }
}
