//! Capture/export sink: timeline -> encoded MP4.
//!
//! The export pass re-runs the exact preview compositor at the configured
//! frame rate for `ceil(total_duration * fps)` frames — the same count with
//! or without audio — so exported length and audio alignment match the
//! editor preview frame for frame. Settings are frozen on entry; the
//! monitor output is muted for the duration and restored on every exit
//! path.

use std::path::{Path, PathBuf};

use crate::assets::AssetStore;
use crate::audio::{self, AudioSession, MonitorMuteGuard};
use crate::compose;
use crate::driver::PlaybackDriver;
use crate::encode_ffmpeg::{
    AudioInputConfig, EncodeConfig, FfmpegEncoder, VideoCodec, negotiate_video_codec,
};
use crate::error::{LyrividError, LyrividResult};
use crate::model::{FrameRate, Project, ProjectSettings, Resolution};

/// Fixed stem of the downloadable file.
pub const EXPORT_FILE_STEM: &str = "lyrivid-export";

#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub out_path: PathBuf,
    pub overwrite: bool,
}

impl ExportOptions {
    /// Default output location: `lyrivid-export.mp4` in `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            out_path: dir.into().join(format!("{EXPORT_FILE_STEM}.mp4")),
            overwrite: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExportReport {
    pub out_path: PathBuf,
    pub frames_encoded: u64,
    pub duration_sec: f64,
    pub codec: VideoCodec,
    pub output_bytes: u64,
}

/// Bitrate tier table keyed by (resolution, frame rate).
pub fn bitrate_kbps(resolution: Resolution, frame_rate: FrameRate) -> u32 {
    match (resolution, frame_rate) {
        (Resolution::Hd720, FrameRate::Fps24) => 8_000,
        (Resolution::Hd720, FrameRate::Fps30) => 10_000,
        (Resolution::Hd1080, FrameRate::Fps24) => 16_000,
        (Resolution::Hd1080, FrameRate::Fps30) => 20_000,
    }
}

/// Frames encoded for a timeline of `total_sec` at `fps`.
pub fn export_frame_count(total_sec: f64, fps: u32) -> u64 {
    (total_sec * f64::from(fps)).ceil().max(0.0) as u64
}

/// Export the project to an MP4 file.
///
/// Drives the playback driver through its `Exporting` state, mutes the
/// monitor for the duration, and discards partial output on any failure —
/// the sink is never left half-started and audio is never left muted.
#[tracing::instrument(skip(project, assets, session, driver), fields(out = %opts.out_path.display()))]
pub fn export_project(
    project: &Project,
    assets: &AssetStore,
    session: &mut AudioSession,
    driver: &mut PlaybackDriver,
    opts: &ExportOptions,
) -> LyrividResult<ExportReport> {
    project.validate()?;
    driver.begin_export()?;
    let result = run_export(project, assets, session, opts);
    driver.finish_export();
    result
}

fn run_export(
    project: &Project,
    assets: &AssetStore,
    session: &mut AudioSession,
    opts: &ExportOptions,
) -> LyrividResult<ExportReport> {
    // Settings frozen for the whole run; later project edits are invisible.
    let settings: ProjectSettings = project.settings;
    let _monitor = MonitorMuteGuard::mute(session);

    let total_sec = project.total_duration();
    let fps = settings.frame_rate.as_u32();
    let frame_count = export_frame_count(total_sec, fps);

    let mut audio_tmp = TempFileGuard(None);
    let audio_cfg = if project.main_audio.is_some() || project.background_audio.is_some() {
        let mix = audio::mix_export(project, assets);
        let path = std::env::temp_dir().join(format!(
            "lyrivid_audio_mix_{}_{}.f32le",
            std::process::id(),
            frame_count
        ));
        write_f32le(&mix.interleaved_f32, &path)?;
        audio_tmp.0 = Some(path.clone());
        Some(AudioInputConfig {
            path,
            sample_rate: mix.sample_rate,
            channels: mix.channels,
        })
    } else {
        None
    };

    let codec = negotiate_video_codec();
    let cfg = EncodeConfig {
        width: settings.resolution.width(),
        height: settings.resolution.height(),
        fps,
        video_codec: codec,
        video_bitrate_kbps: bitrate_kbps(settings.resolution, settings.frame_rate),
        out_path: opts.out_path.clone(),
        overwrite: opts.overwrite,
        audio: audio_cfg,
    };

    let mut enc = FfmpegEncoder::new(cfg, compose::BACKGROUND_RGBA)?;

    for i in 0..frame_count {
        let t = i as f64 / f64::from(fps);
        let frame = compose::compose_frame(project, assets, t);
        if let Err(e) = enc.encode_frame(&frame) {
            enc.abandon();
            return Err(e);
        }
    }

    if let Err(e) = enc.finish() {
        let _ = std::fs::remove_file(&opts.out_path);
        return Err(e);
    }

    let output_bytes = std::fs::metadata(&opts.out_path)
        .map(|m| m.len())
        .unwrap_or(0);
    if output_bytes == 0 {
        let _ = std::fs::remove_file(&opts.out_path);
        return Err(LyrividError::export("encoder produced an empty file"));
    }

    tracing::info!(
        frames = frame_count,
        seconds = total_sec,
        bytes = output_bytes,
        "export complete"
    );

    Ok(ExportReport {
        out_path: opts.out_path.clone(),
        frames_encoded: frame_count,
        duration_sec: total_sec,
        codec,
        output_bytes,
    })
}

fn write_f32le(samples: &[f32], path: &Path) -> LyrividResult<()> {
    let mut bytes = Vec::<u8>::with_capacity(samples.len() * 4);
    for &s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    std::fs::write(path, bytes)
        .map_err(|e| LyrividError::export(format!("failed to stage mixed audio: {e}")))
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitrate_table_is_monotone_in_both_axes() {
        assert!(
            bitrate_kbps(Resolution::Hd720, FrameRate::Fps30)
                > bitrate_kbps(Resolution::Hd720, FrameRate::Fps24)
        );
        assert!(
            bitrate_kbps(Resolution::Hd1080, FrameRate::Fps24)
                > bitrate_kbps(Resolution::Hd720, FrameRate::Fps30)
        );
    }

    #[test]
    fn frame_count_matches_timer_fallback_semantics() {
        assert_eq!(export_frame_count(10.0, 30), 300);
        assert_eq!(export_frame_count(10.0, 24), 240);
        assert_eq!(export_frame_count(4.05, 30), 122, "partial frame rounds up");
        assert_eq!(export_frame_count(0.0, 30), 0);
    }

    #[test]
    fn invalid_project_aborts_before_touching_the_sink() {
        let mut project = Project::default();
        project.settings.main_volume = 9.0; // fails validation
        let assets = AssetStore::new();
        let mut session = AudioSession::new();
        let mut driver = PlaybackDriver::new();

        let opts = ExportOptions {
            out_path: std::env::temp_dir().join("lyrivid-test-never-written.mp4"),
            overwrite: true,
        };
        let err = export_project(&project, &assets, &mut session, &mut driver, &opts);
        assert!(err.is_err());
        assert!(!session.is_monitor_muted(), "monitor must stay unmuted");
        assert_eq!(
            driver.transport(),
            crate::driver::Transport::Stopped,
            "driver never left ready"
        );
        assert!(!opts.out_path.exists());
    }

    #[test]
    fn default_options_use_fixed_filename() {
        let opts = ExportOptions::in_dir("/tmp/renders");
        assert!(opts.out_path.ends_with("lyrivid-export.mp4"));
    }
}
