//! lyrivid is a music-video timeline compositing and export engine.
//!
//! A project is a sequence of still-image clips (each with its own
//! duration, pan/zoom/crop, color filters, and animated text overlays),
//! timed lyric subtitles, and up to two gain-staged audio tracks. The
//! engine turns that project into pixels deterministically and exports the
//! same pixels, frame for frame, to an MP4.
//!
//! # Pipeline overview
//!
//! 1. **Resolve**: `Project + global time -> ClockState` (which clip, how
//!    far in, transition phase)
//! 2. **Composite**: `ClockState -> FrameRGBA` (backdrop fill, foreground
//!    pan/zoom, overlays, subtitle burn-in, transition blend)
//! 3. **Drive**: the playback driver advances the clock in real time (or
//!    from the main audio element's position) and repaints every tick
//! 4. **Export**: the same compositor runs frame-indexed into the system
//!    `ffmpeg` binary alongside the mixed audio
//!
//! Key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic-by-default**: compositing is a pure function of
//!   (project, assets, time); preview and export can never disagree.
//! - **No IO in the compositor**: decoding is front-loaded in
//!   [`AssetStore`]; a missing layer degrades to a skip, never an error.
#![forbid(unsafe_code)]

mod anim;
mod assets;
mod assist;
mod audio;
mod clock;
mod compose;
mod driver;
mod encode_ffmpeg;
mod error;
mod export;
mod model;
mod persist;

pub use anim::{Ease, OverlayPose, overlay_pose, overlay_progress};
pub use assets::decode::{MIX_SAMPLE_RATE, decode_image};
pub use assets::fonts::FontLibrary;
pub use assets::{AssetStore, AudioPcm, PreparedImage};
pub use assist::{AssistClient, GENERIC_CAPTION, LyricSegment, caption_clip, transcribe_into_subtitles};
pub use audio::{AudioMix, AudioSession, MonitorMuteGuard, mix_export};
pub use clock::{ActiveClip, ClockState, TimelineClock, TransitionPhase};
pub use compose::{BACKGROUND_RGBA, FrameRGBA, compose_frame, compose_resolved};
pub use driver::{CancelToken, PlaybackDriver, PositionSource, Transport, run_preview_loop};
pub use encode_ffmpeg::{
    AudioInputConfig, EncodeConfig, FfmpegEncoder, VideoCodec, ensure_parent_dir,
    is_ffmpeg_on_path, negotiate_video_codec,
};
pub use error::{LyrividError, LyrividResult};
pub use export::{
    EXPORT_FILE_STEM, ExportOptions, ExportReport, bitrate_kbps, export_frame_count,
    export_project,
};
pub use model::{
    Adjustments, AudioTrack, BASE_HEIGHT, BASE_WIDTH, Clip, Crop, FALLBACK_CLIP_DURATION_SEC,
    FrameRate, MIN_TIMELINE_SEC, OverlayAnimation, Project, ProjectSettings, Resolution,
    SubtitleSegment, TextOverlay, TransitionKind,
};
pub use persist::{load_snapshot, save_snapshot};
