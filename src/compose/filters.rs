//! Per-clip color adjustments as a precomputed per-pixel filter.
//!
//! Applied in the same order the editing UI stacks them: brightness,
//! contrast, saturation, sepia, grayscale. Blur is a separate full-layer
//! pass (see [`crate::compose::blur`]).

use crate::compose::raster::PremulRgba8;
use crate::model::Adjustments;

#[derive(Clone, Copy, Debug)]
pub struct ColorFilter {
    brightness: f32,
    contrast: f32,
    saturation: f32,
    sepia: f32,
    grayscale: f32,
    identity: bool,
}

impl ColorFilter {
    pub fn identity() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            sepia: 0.0,
            grayscale: 0.0,
            identity: true,
        }
    }

    pub fn from_adjustments(adj: &Adjustments) -> Self {
        let f = Self {
            brightness: (adj.brightness / 100.0).clamp(0.0, 2.0) as f32,
            contrast: (adj.contrast / 100.0).clamp(0.0, 2.0) as f32,
            saturation: (adj.saturation / 100.0).clamp(0.0, 2.0) as f32,
            sepia: (adj.sepia / 100.0).clamp(0.0, 1.0) as f32,
            grayscale: (adj.grayscale / 100.0).clamp(0.0, 1.0) as f32,
            identity: false,
        };
        let neutral = f.brightness == 1.0
            && f.contrast == 1.0
            && f.saturation == 1.0
            && f.sepia == 0.0
            && f.grayscale == 0.0;
        Self {
            identity: neutral,
            ..f
        }
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Filter a premultiplied pixel: unpremultiply, adjust straight color,
    /// re-premultiply. Alpha is never changed.
    pub fn apply_premul(&self, px: PremulRgba8) -> PremulRgba8 {
        if self.identity || px[3] == 0 {
            return px;
        }
        let a = px[3] as f32 / 255.0;
        let mut rgb = [
            px[0] as f32 / 255.0 / a,
            px[1] as f32 / 255.0 / a,
            px[2] as f32 / 255.0 / a,
        ];
        rgb = self.apply_straight(rgb);
        [
            (rgb[0] * a * 255.0).round().clamp(0.0, 255.0) as u8,
            (rgb[1] * a * 255.0).round().clamp(0.0, 255.0) as u8,
            (rgb[2] * a * 255.0).round().clamp(0.0, 255.0) as u8,
            px[3],
        ]
    }

    /// Adjust straight (non-premultiplied) RGB in `[0, 1]`.
    pub fn apply_straight(&self, rgb: [f32; 3]) -> [f32; 3] {
        let [mut r, mut g, mut b] = rgb;

        r *= self.brightness;
        g *= self.brightness;
        b *= self.brightness;

        r = (r - 0.5) * self.contrast + 0.5;
        g = (g - 0.5) * self.contrast + 0.5;
        b = (b - 0.5) * self.contrast + 0.5;

        if self.saturation != 1.0 {
            let gray = luma(r, g, b);
            r = gray + (r - gray) * self.saturation;
            g = gray + (g - gray) * self.saturation;
            b = gray + (b - gray) * self.saturation;
        }

        if self.sepia > 0.0 {
            let sr = (0.393 * r + 0.769 * g + 0.189 * b).min(1.0);
            let sg = (0.349 * r + 0.686 * g + 0.168 * b).min(1.0);
            let sb = (0.272 * r + 0.534 * g + 0.131 * b).min(1.0);
            r += (sr - r) * self.sepia;
            g += (sg - g) * self.sepia;
            b += (sb - b) * self.sepia;
        }

        if self.grayscale > 0.0 {
            let gray = luma(r, g, b);
            r += (gray - r) * self.grayscale;
            g += (gray - g) * self.grayscale;
            b += (gray - b) * self.grayscale;
        }

        [r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0)]
    }
}

fn luma(r: f32, g: f32, b: f32) -> f32 {
    0.2126 * r + 0.7152 * g + 0.0722 * b
}
