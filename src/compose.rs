//! Frame compositor: (project, assets, resolved clock state) -> pixels.
//!
//! A pure function of its inputs — no state survives between calls, so the
//! same instant always rasterizes to the same bytes. That property is what
//! lets the export pass re-run preview compositing frame for frame. Layer
//! failures (unprepared image, no usable font) skip the layer and keep the
//! frame; nothing in here returns an error to the tick loop.

pub mod blur;
pub mod filters;
pub mod raster;
pub mod text;

use std::borrow::Cow;

use crate::anim;
use crate::assets::AssetStore;
use crate::clock::{ActiveClip, ClockState, TimelineClock};
use crate::model::{BASE_WIDTH, Project};
use filters::ColorFilter;
use text::TextDecoration;

/// Opaque dark background behind every frame.
pub const BACKGROUND_RGBA: [u8; 4] = [16, 18, 24, 255];

const BACKDROP_OVERSCAN: f64 = 1.15;
const BACKDROP_BLUR_BASE_PX: f64 = 24.0;
const BACKDROP_DARKEN: f32 = 0.55;
/// Slow zoom reaches +5% over the life of a clip.
const KEN_BURNS_STRENGTH: f64 = 0.05;
const OVERLAY_SHADOW_BASE_PX: f64 = 2.0;
const SUBTITLE_FONT_BASE_PX: f64 = 40.0;
const SUBTITLE_BASELINE_MARGIN_BASE_PX: f64 = 56.0;
const SUBTITLE_OUTLINE_BASE_PX: f64 = 2.0;

/// One composited frame. Premultiplied RGBA8, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

/// Resolve the clock at `t` and composite the frame.
#[tracing::instrument(skip(project, assets))]
pub fn compose_frame(project: &Project, assets: &AssetStore, t: f64) -> FrameRGBA {
    let clock = TimelineClock::resolve(project, t);
    compose_resolved(project, assets, &clock)
}

/// Composite a frame for an already-resolved clock state.
pub fn compose_resolved(project: &Project, assets: &AssetStore, clock: &ClockState) -> FrameRGBA {
    let width = project.settings.resolution.width();
    let height = project.settings.resolution.height();
    let scale = f64::from(width) / f64::from(BASE_WIDTH);

    let mut data = vec![0u8; (width as usize) * (height as usize) * 4];
    raster::fill_solid(&mut data, BACKGROUND_RGBA);

    let Some(active) = clock.active else {
        if project.main_audio.is_none() && project.background_audio.is_none() {
            draw_placeholder(&mut data, width, height, scale);
        } else {
            // Audio-only project: nothing visual but lyrics still burn in.
            draw_subtitle(project, assets, clock.global_time, &mut data, width, height, scale);
        }
        return FrameRGBA {
            width,
            height,
            data,
            premultiplied: true,
        };
    };

    if let Some(layer) = render_clip_layer(project, assets, active.index, active.local_time, width, height, scale)
    {
        raster::over_in_place(&mut data, &layer, 1.0);
    }

    if let Some(tr) = active.transition
        && let Some(layer) = render_clip_layer(project, assets, tr.next_index, 0.0, width, height, scale)
    {
        // The incoming clip fades up as the window runs out.
        raster::over_in_place(&mut data, &layer, (1.0 - tr.progress) as f32);
    }

    draw_overlays(project, assets, &active, &mut data, width, height, scale);
    draw_subtitle(project, assets, clock.global_time, &mut data, width, height, scale);

    FrameRGBA {
        width,
        height,
        data,
        premultiplied: true,
    }
}

/// Rasterize one clip's visual layer (blurred backdrop + foreground) at the
/// given local time. `None` when the source image is not prepared.
fn render_clip_layer(
    project: &Project,
    assets: &AssetStore,
    index: usize,
    local_time: f64,
    width: u32,
    height: u32,
    scale: f64,
) -> Option<Vec<u8>> {
    let clip = project.clips.get(index)?;
    let Some(img) = assets.image(&clip.source) else {
        tracing::debug!(clip = %clip.id, source = %clip.source, "image not prepared; skipping layer");
        return None;
    };
    if img.width == 0 || img.height == 0 {
        return None;
    }

    let filter = ColorFilter::from_adjustments(&clip.adjustments);
    let mut layer = vec![0u8; (width as usize) * (height as usize) * 4];

    // Oversized blurred, darkened copy fills any letterboxing.
    raster::draw_image_rect(
        &mut layer,
        width,
        height,
        img,
        cover_rect(img, width, height, BACKDROP_OVERSCAN, kurbo::Vec2::ZERO),
        &filter,
    );
    blur::blur_layer(
        &mut layer,
        width,
        height,
        (BACKDROP_BLUR_BASE_PX * scale).round() as u32,
    );
    raster::darken_in_place(&mut layer, BACKDROP_DARKEN);

    let elapsed = if clip.duration_sec > 0.0 {
        (local_time / clip.duration_sec).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let ken_burns = 1.0 + KEN_BURNS_STRENGTH * elapsed;
    let pan = kurbo::Vec2::new(clip.crop.offset_x, clip.crop.offset_y) * scale;

    raster::draw_image_rect(
        &mut layer,
        width,
        height,
        img,
        cover_rect(img, width, height, ken_burns * clip.crop.zoom, pan),
        &filter,
    );

    if clip.adjustments.blur_px > 0.0 {
        blur::blur_layer(
            &mut layer,
            width,
            height,
            (clip.adjustments.blur_px * scale).round() as u32,
        );
    }

    Some(layer)
}

fn draw_overlays(
    project: &Project,
    assets: &AssetStore,
    active: &ActiveClip,
    buf: &mut [u8],
    width: u32,
    height: u32,
    scale: f64,
) {
    let Some(clip) = project.clips.get(active.index) else {
        return;
    };
    for overlay in &clip.overlays {
        let p = anim::overlay_progress(active.local_time, overlay.animation_duration_sec);
        let pose = anim::overlay_pose(overlay.animation, p, overlay.text.chars().count());

        let visible: Cow<'_, str> = match pose.visible_chars {
            Some(n) => overlay.text.chars().take(n).collect::<String>().into(),
            None => Cow::from(&overlay.text),
        };
        if visible.is_empty() {
            continue;
        }
        let opacity = (overlay.opacity * pose.opacity_mul) as f32;
        if opacity <= 0.0 {
            continue;
        }
        let Some(font) = assets.fonts().face(&overlay.font_family) else {
            tracing::debug!(overlay = %overlay.id, "no usable font; skipping overlay");
            continue;
        };

        text::draw_line_centered(
            buf,
            width,
            height,
            &font,
            (overlay.font_size_px * scale) as f32,
            &visible,
            overlay.x * f64::from(width),
            overlay.y * f64::from(height) + pose.y_offset_px * scale,
            overlay.color,
            opacity,
            TextDecoration::Shadow {
                offset_px: OVERLAY_SHADOW_BASE_PX * scale,
            },
        );
    }
}

fn draw_subtitle(
    project: &Project,
    assets: &AssetStore,
    t: f64,
    buf: &mut [u8],
    width: u32,
    height: u32,
    scale: f64,
) {
    let Some(seg) = project.active_subtitle(t) else {
        return;
    };
    let Some(font) = assets.fonts().face("") else {
        tracing::debug!(subtitle = %seg.id, "no usable font; skipping subtitle");
        return;
    };
    text::draw_line_centered(
        buf,
        width,
        height,
        &font,
        (SUBTITLE_FONT_BASE_PX * scale) as f32,
        &seg.text,
        f64::from(width) / 2.0,
        f64::from(height) - SUBTITLE_BASELINE_MARGIN_BASE_PX * scale,
        [255, 255, 255, 255],
        1.0,
        TextDecoration::Outline {
            thickness_px: SUBTITLE_OUTLINE_BASE_PX * scale,
        },
    );
}

/// Destination rectangle for an image covering the canvas: scaled to fill
/// while preserving aspect ratio (overflow crops), times `zoom`, centered
/// and shifted by `pan` destination pixels.
fn cover_rect(
    img: &crate::assets::PreparedImage,
    width: u32,
    height: u32,
    zoom: f64,
    pan: kurbo::Vec2,
) -> kurbo::Rect {
    let cover = (f64::from(width) / f64::from(img.width))
        .max(f64::from(height) / f64::from(img.height));
    let s = cover * zoom;
    let dw = f64::from(img.width) * s;
    let dh = f64::from(img.height) * s;
    let origin = kurbo::Point::new(
        (f64::from(width) - dw) / 2.0 + pan.x,
        (f64::from(height) - dh) / 2.0 + pan.y,
    );
    kurbo::Rect::from_origin_size(origin, (dw, dh))
}

/// Empty-project frame: a framed center region on the background. Drawn
/// without fonts so the placeholder is identical on any machine.
fn draw_placeholder(buf: &mut [u8], width: u32, height: u32, scale: f64) {
    let accent: raster::PremulRgba8 = [58, 64, 82, 255];
    let bar_w = (f64::from(width) * 0.28) as u32;
    let bar_h = (6.0 * scale).round().max(2.0) as u32;
    let x0 = (width - bar_w) as i32 / 2;
    let y0 = (height - bar_h) as i32 / 2;
    raster::fill_rect(buf, width, height, x0, y0, bar_w, bar_h, accent);
    raster::fill_rect(
        buf,
        width,
        height,
        x0,
        y0 + (bar_h as i32) * 3,
        bar_w / 2,
        bar_h / 2,
        accent,
    );
}
