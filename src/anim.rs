//! Animation curves for text overlays.

use crate::model::OverlayAnimation;

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub enum Ease {
    Linear,
    OutQuad,
    OutCubic,
    InOutQuad,
}

impl Ease {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
        }
    }
}

/// Slide-up overlays start this many base-canvas pixels below their target.
pub const SLIDE_UP_OFFSET_PX: f64 = 30.0;

/// Normalized animation progress for an overlay: local clip time against
/// the overlay's own animation duration. A zero or negative duration
/// completes instantly.
pub fn overlay_progress(local_time: f64, animation_duration_sec: f64) -> f64 {
    if animation_duration_sec <= 0.0 {
        return 1.0;
    }
    (local_time / animation_duration_sec).clamp(0.0, 1.0)
}

/// Resolved per-frame animation state for one overlay draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayPose {
    /// Multiplier applied to the overlay's own opacity.
    pub opacity_mul: f64,
    /// Additional y offset in base canvas pixels (positive = downward).
    pub y_offset_px: f64,
    /// Visible prefix length in characters, or `None` for the whole text.
    pub visible_chars: Option<usize>,
}

/// Evaluate an overlay animation at progress `p`.
pub fn overlay_pose(animation: OverlayAnimation, p: f64, text_chars: usize) -> OverlayPose {
    let p = p.clamp(0.0, 1.0);
    match animation {
        OverlayAnimation::None => OverlayPose {
            opacity_mul: 1.0,
            y_offset_px: 0.0,
            visible_chars: None,
        },
        OverlayAnimation::FadeIn => OverlayPose {
            opacity_mul: p,
            y_offset_px: 0.0,
            visible_chars: None,
        },
        OverlayAnimation::SlideUp => OverlayPose {
            opacity_mul: p,
            y_offset_px: SLIDE_UP_OFFSET_PX * (1.0 - Ease::OutCubic.apply(p)),
            visible_chars: None,
        },
        OverlayAnimation::Typewriter => OverlayPose {
            opacity_mul: 1.0,
            y_offset_px: 0.0,
            visible_chars: Some(((text_chars as f64) * p).floor() as usize),
        },
    }
}
