//! Project model: clips, overlays, subtitles, audio tracks, settings.
//!
//! Pure data plus invariants. All edit helpers rebuild the affected
//! sequence and hand it back to the project wholesale, so a compositor
//! holding `&Project` for the duration of one frame never observes a
//! half-applied edit.

use crate::error::{LyrividError, LyrividResult};

/// Logical compositing space; output resolutions scale from this.
pub const BASE_WIDTH: u32 = 1280;
/// Logical compositing space; output resolutions scale from this.
pub const BASE_HEIGHT: u32 = 720;

/// Clip duration used when no main audio exists to divide.
pub const FALLBACK_CLIP_DURATION_SEC: f64 = 5.0;

/// An empty project still presents a seekable timeline of this length.
pub const MIN_TIMELINE_SEC: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Resolution {
    Hd720,
    Hd1080,
}

impl Resolution {
    pub fn width(self) -> u32 {
        match self {
            Self::Hd720 => 1280,
            Self::Hd1080 => 1920,
        }
    }

    pub fn height(self) -> u32 {
        match self {
            Self::Hd720 => 720,
            Self::Hd1080 => 1080,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FrameRate {
    Fps24,
    Fps30,
}

impl FrameRate {
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Fps24 => 24,
            Self::Fps30 => 30,
        }
    }

    pub fn frame_duration_secs(self) -> f64 {
        1.0 / f64::from(self.as_u32())
    }
}

/// Named transition styles. All three non-`None` kinds currently composite
/// as a cross-dissolve; the names are kept so distinct visuals stay an
/// additive change to the compositor only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TransitionKind {
    None,
    Fade,
    Slide,
    Zoom,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProjectSettings {
    pub resolution: Resolution,
    pub frame_rate: FrameRate,
    pub transition: TransitionKind,
    pub transition_duration_sec: f64,
    /// Main track gain in `[0, 1]`.
    pub main_volume: f64,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::Hd720,
            frame_rate: FrameRate::Fps30,
            transition: TransitionKind::Fade,
            transition_duration_sec: 1.0,
            main_volume: 1.0,
        }
    }
}

/// Pan/zoom in base canvas pixels. `zoom >= 1.0`; 1.0 is cover fit.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Crop {
    pub offset_x: f64,
    pub offset_y: f64,
    pub zoom: f64,
}

impl Default for Crop {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            zoom: 1.0,
        }
    }
}

/// Per-clip color filters. Percent magnitudes; 100/100/100/0/0/0 is neutral.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Adjustments {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub sepia: f64,
    pub grayscale: f64,
    pub blur_px: f64,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            sepia: 0.0,
            grayscale: 0.0,
            blur_px: 0.0,
        }
    }
}

impl Adjustments {
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OverlayAnimation {
    None,
    FadeIn,
    SlideUp,
    Typewriter,
}

/// Animated text owned by exactly one clip; timing is local to that clip.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextOverlay {
    pub id: String,
    pub text: String,
    /// Normalized position in `[0, 1]` relative to the canvas.
    pub x: f64,
    pub y: f64,
    /// Font size in base canvas pixels.
    pub font_size_px: f64,
    pub font_family: String,
    /// Straight RGBA.
    pub color: [u8; 4],
    pub opacity: f64,
    pub animation: OverlayAnimation,
    /// How fast the animation completes, independent of clip duration.
    pub animation_duration_sec: f64,
}

/// One still image placed on the timeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Clip {
    pub id: String,
    /// Key into the asset store's registered media.
    pub source: String,
    pub duration_sec: f64,
    pub crop: Crop,
    pub adjustments: Adjustments,
    pub overlays: Vec<TextOverlay>,
}

/// Global lyric line; `[start_sec, end_sec)` on the shared timeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubtitleSegment {
    pub id: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub text: String,
}

impl SubtitleSegment {
    pub fn contains(&self, t: f64) -> bool {
        self.start_sec <= t && t < self.end_sec
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioTrack {
    /// Key into the asset store's registered media.
    pub source: String,
    pub duration_sec: f64,
    /// Gain in `[0, 1]`, owned exclusively by this track's stage.
    pub volume: f64,
    pub fade_in_sec: f64,
    pub fade_out_sec: f64,
}

impl AudioTrack {
    pub fn new(source: impl Into<String>, duration_sec: f64) -> Self {
        Self {
            source: source.into(),
            duration_sec,
            volume: 1.0,
            fade_in_sec: 0.0,
            fade_out_sec: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Project {
    pub clips: Vec<Clip>,
    pub subtitles: Vec<SubtitleSegment>,
    pub main_audio: Option<AudioTrack>,
    pub background_audio: Option<AudioTrack>,
    pub settings: ProjectSettings,
}

impl Project {
    /// Sum of clip durations (the image-derived timeline length).
    pub fn visual_duration(&self) -> f64 {
        self.clips.iter().map(|c| c.duration_sec.max(0.0)).sum()
    }

    /// Authoritative timeline length: main audio wins over the image-derived
    /// duration whenever it is longer, and an empty project still spans
    /// [`MIN_TIMELINE_SEC`].
    pub fn total_duration(&self) -> f64 {
        let audio = self
            .main_audio
            .as_ref()
            .map(|a| a.duration_sec.max(0.0))
            .unwrap_or(0.0);
        let d = audio.max(self.visual_duration());
        if d <= 0.0 { MIN_TIMELINE_SEC } else { d }
    }

    /// Default duration for a clip inserted now: evenly divide the main
    /// audio across all clips including the new one, or fall back to
    /// [`FALLBACK_CLIP_DURATION_SEC`].
    pub fn default_clip_duration(&self) -> f64 {
        match &self.main_audio {
            Some(a) if a.duration_sec > 0.0 => a.duration_sec / (self.clips.len() + 1) as f64,
            _ => FALLBACK_CLIP_DURATION_SEC,
        }
    }

    /// Append a clip for `source` with the current default duration.
    pub fn insert_clip(&mut self, id: impl Into<String>, source: impl Into<String>) {
        let duration_sec = self.default_clip_duration();
        let mut clips = self.clips.clone();
        clips.push(Clip {
            id: id.into(),
            source: source.into(),
            duration_sec,
            crop: Crop::default(),
            adjustments: Adjustments::default(),
            overlays: Vec::new(),
        });
        self.clips = clips;
    }

    /// Move the clip at `from` so it ends up at index `to`.
    pub fn reorder_clip(&mut self, from: usize, to: usize) -> LyrividResult<()> {
        if from >= self.clips.len() || to >= self.clips.len() {
            return Err(LyrividError::validation("clip reorder index out of range"));
        }
        let mut clips = self.clips.clone();
        let moved = clips.remove(from);
        clips.insert(to, moved);
        self.clips = clips;
        Ok(())
    }

    pub fn remove_clip(&mut self, id: &str) {
        self.clips = self
            .clips
            .iter()
            .filter(|c| c.id != id)
            .cloned()
            .collect();
    }

    /// Rebuild one clip through `edit`; untouched clips are carried over.
    pub fn update_clip(&mut self, id: &str, edit: impl FnOnce(&mut Clip)) -> LyrividResult<()> {
        let mut clips = self.clips.clone();
        let clip = clips
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| LyrividError::validation(format!("unknown clip id '{id}'")))?;
        edit(clip);
        self.clips = clips;
        Ok(())
    }

    /// Replace a clip's overlay collection wholesale.
    pub fn replace_overlays(
        &mut self,
        clip_id: &str,
        overlays: Vec<TextOverlay>,
    ) -> LyrividResult<()> {
        self.update_clip(clip_id, |c| c.overlays = overlays)
    }

    /// Insert keeping the list sorted by start time.
    pub fn insert_subtitle(&mut self, seg: SubtitleSegment) {
        let mut subs = self.subtitles.clone();
        let at = subs
            .iter()
            .position(|s| s.start_sec > seg.start_sec)
            .unwrap_or(subs.len());
        subs.insert(at, seg);
        self.subtitles = subs;
    }

    /// The subtitle visible at global time `t`: first match in list order.
    /// Overlaps are legal in the data; with the sorted insert helper this
    /// equals earliest-start-wins.
    pub fn active_subtitle(&self, t: f64) -> Option<&SubtitleSegment> {
        self.subtitles.iter().find(|s| s.contains(t))
    }

    pub fn validate(&self) -> LyrividResult<()> {
        self.settings.validate()?;

        for clip in &self.clips {
            if clip.id.trim().is_empty() {
                return Err(LyrividError::validation("clip id must be non-empty"));
            }
            if !clip.duration_sec.is_finite() || clip.duration_sec <= 0.0 {
                return Err(LyrividError::validation(format!(
                    "clip '{}' duration must be finite and > 0",
                    clip.id
                )));
            }
            if !clip.crop.zoom.is_finite() || clip.crop.zoom < 1.0 {
                return Err(LyrividError::validation(format!(
                    "clip '{}' zoom must be >= 1",
                    clip.id
                )));
            }
            validate_adjustments(&clip.id, &clip.adjustments)?;
            for overlay in &clip.overlays {
                validate_overlay(&clip.id, overlay)?;
            }
        }

        for seg in &self.subtitles {
            if !(seg.start_sec.is_finite() && seg.end_sec.is_finite())
                || seg.start_sec < 0.0
                || seg.end_sec < seg.start_sec
            {
                return Err(LyrividError::validation(format!(
                    "subtitle '{}' has an invalid [start, end) interval",
                    seg.id
                )));
            }
        }

        for track in [&self.main_audio, &self.background_audio]
            .into_iter()
            .flatten()
        {
            if !(0.0..=1.0).contains(&track.volume) {
                return Err(LyrividError::validation(
                    "audio track volume must be within [0, 1]",
                ));
            }
            if track.duration_sec < 0.0 || !track.duration_sec.is_finite() {
                return Err(LyrividError::validation(
                    "audio track duration must be finite and >= 0",
                ));
            }
        }

        Ok(())
    }
}

impl ProjectSettings {
    pub fn validate(&self) -> LyrividResult<()> {
        if !self.transition_duration_sec.is_finite() || self.transition_duration_sec < 0.0 {
            return Err(LyrividError::validation(
                "transition duration must be finite and >= 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.main_volume) {
            return Err(LyrividError::validation("main volume must be within [0, 1]"));
        }
        Ok(())
    }
}

fn validate_adjustments(clip_id: &str, adj: &Adjustments) -> LyrividResult<()> {
    for (name, value, max) in [
        ("brightness", adj.brightness, 200.0),
        ("contrast", adj.contrast, 200.0),
        ("saturation", adj.saturation, 200.0),
        ("sepia", adj.sepia, 100.0),
        ("grayscale", adj.grayscale, 100.0),
        ("blur_px", adj.blur_px, 20.0),
    ] {
        if !value.is_finite() || value < 0.0 || value > max {
            return Err(LyrividError::validation(format!(
                "clip '{clip_id}' {name} must be within [0, {max}]"
            )));
        }
    }
    Ok(())
}

fn validate_overlay(clip_id: &str, overlay: &TextOverlay) -> LyrividResult<()> {
    if overlay.id.trim().is_empty() {
        return Err(LyrividError::validation(format!(
            "clip '{clip_id}' has an overlay with an empty id"
        )));
    }
    if !(0.0..=1.0).contains(&overlay.x) || !(0.0..=1.0).contains(&overlay.y) {
        return Err(LyrividError::validation(format!(
            "overlay '{}' position must be normalized to [0, 1]",
            overlay.id
        )));
    }
    if !(0.0..=1.0).contains(&overlay.opacity) {
        return Err(LyrividError::validation(format!(
            "overlay '{}' opacity must be within [0, 1]",
            overlay.id
        )));
    }
    if !overlay.font_size_px.is_finite() || overlay.font_size_px <= 0.0 {
        return Err(LyrividError::validation(format!(
            "overlay '{}' font size must be > 0",
            overlay.id
        )));
    }
    if !overlay.animation_duration_sec.is_finite() || overlay.animation_duration_sec < 0.0 {
        return Err(LyrividError::validation(format!(
            "overlay '{}' animation duration must be >= 0",
            overlay.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(id: &str, duration_sec: f64) -> Clip {
        Clip {
            id: id.to_string(),
            source: format!("img-{id}"),
            duration_sec,
            crop: Crop::default(),
            adjustments: Adjustments::default(),
            overlays: Vec::new(),
        }
    }

    #[test]
    fn total_duration_prefers_longer_audio() {
        let mut p = Project::default();
        p.clips = vec![clip("a", 4.0), clip("b", 6.0)];
        assert_eq!(p.total_duration(), 10.0);

        p.main_audio = Some(AudioTrack::new("song", 42.5));
        assert_eq!(p.total_duration(), 42.5);

        p.main_audio = Some(AudioTrack::new("short", 3.0));
        assert_eq!(p.total_duration(), 10.0);
    }

    #[test]
    fn empty_project_has_ten_second_floor() {
        let p = Project::default();
        assert_eq!(p.total_duration(), MIN_TIMELINE_SEC);
    }

    #[test]
    fn insert_clip_divides_audio_evenly() {
        let mut p = Project::default();
        p.main_audio = Some(AudioTrack::new("song", 30.0));
        p.insert_clip("c0", "img0");
        assert_eq!(p.clips[0].duration_sec, 30.0);
        p.insert_clip("c1", "img1");
        assert_eq!(p.clips[1].duration_sec, 15.0);

        let mut q = Project::default();
        q.insert_clip("c0", "img0");
        assert_eq!(q.clips[0].duration_sec, FALLBACK_CLIP_DURATION_SEC);
    }

    #[test]
    fn active_subtitle_interval_is_half_open() {
        let mut p = Project::default();
        p.insert_subtitle(SubtitleSegment {
            id: "s0".to_string(),
            start_sec: 2.0,
            end_sec: 4.0,
            text: "Hello".to_string(),
        });
        assert_eq!(
            p.active_subtitle(3.0).map(|s| s.text.as_str()),
            Some("Hello")
        );
        assert!(p.active_subtitle(4.0).is_none());
        assert!(p.active_subtitle(1.999).is_none());
    }

    #[test]
    fn overlapping_subtitles_pick_first_in_list_order() {
        let mut p = Project::default();
        p.insert_subtitle(SubtitleSegment {
            id: "late".to_string(),
            start_sec: 1.0,
            end_sec: 5.0,
            text: "late".to_string(),
        });
        p.insert_subtitle(SubtitleSegment {
            id: "early".to_string(),
            start_sec: 0.0,
            end_sec: 5.0,
            text: "early".to_string(),
        });
        // Sorted insert put "early" first, so it wins across the overlap.
        assert_eq!(p.active_subtitle(2.0).map(|s| s.id.as_str()), Some("early"));
    }

    #[test]
    fn reorder_rebuilds_sequence() {
        let mut p = Project::default();
        p.clips = vec![clip("a", 1.0), clip("b", 2.0), clip("c", 3.0)];
        p.reorder_clip(2, 0).unwrap();
        let order: Vec<_> = p.clips.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order, ["c", "a", "b"]);
        assert!(p.reorder_clip(0, 9).is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut p = Project::default();
        p.clips = vec![clip("a", 0.0)];
        assert!(p.validate().is_err());

        let mut p = Project::default();
        let mut c = clip("a", 1.0);
        c.crop.zoom = 0.5;
        p.clips = vec![c];
        assert!(p.validate().is_err());

        let mut p = Project::default();
        p.main_audio = Some(AudioTrack {
            volume: 1.5,
            ..AudioTrack::new("song", 10.0)
        });
        assert!(p.validate().is_err());
    }

    #[test]
    fn json_roundtrip() {
        let mut p = Project::default();
        p.clips = vec![clip("a", 4.0)];
        p.clips[0].overlays.push(TextOverlay {
            id: "t0".to_string(),
            text: "chorus".to_string(),
            x: 0.5,
            y: 0.8,
            font_size_px: 48.0,
            font_family: "sans".to_string(),
            color: [255, 255, 255, 255],
            opacity: 1.0,
            animation: OverlayAnimation::Typewriter,
            animation_duration_sec: 1.5,
        });
        let s = serde_json::to_string_pretty(&p).unwrap();
        let de: Project = serde_json::from_str(&s).unwrap();
        assert_eq!(de, p);
    }
}
