//! Audio routing session: the two gain stages, monitor mute, and the
//! export mixdown.
//!
//! The platform's output device is outside the crate; what playback and
//! export observe is modeled here — per-track gain (each stage owned by
//! exactly one track's volume control), a monitor mute used while a
//! recording pass runs, and a deterministic PCM mixdown of the two tracks.

use crate::assets::decode::MIX_SAMPLE_RATE;
use crate::assets::AssetStore;
use crate::model::Project;

/// Session-wide audio state, constructed lazily on first track attach and
/// reused until teardown.
#[derive(Clone, Debug)]
pub struct AudioSession {
    main_gain: f64,
    background_gain: f64,
    monitor_muted: bool,
}

impl Default for AudioSession {
    fn default() -> Self {
        Self {
            main_gain: 1.0,
            background_gain: 1.0,
            monitor_muted: false,
        }
    }
}

impl AudioSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_main_gain(&mut self, gain: f64) {
        self.main_gain = gain.clamp(0.0, 1.0);
    }

    pub fn set_background_gain(&mut self, gain: f64) {
        self.background_gain = gain.clamp(0.0, 1.0);
    }

    pub fn main_gain(&self) -> f64 {
        self.main_gain
    }

    pub fn background_gain(&self) -> f64 {
        self.background_gain
    }

    pub fn mute_monitor(&mut self) {
        self.monitor_muted = true;
    }

    pub fn unmute_monitor(&mut self) {
        self.monitor_muted = false;
    }

    pub fn is_monitor_muted(&self) -> bool {
        self.monitor_muted
    }
}

/// Mutes the monitor for the lifetime of the guard and restores it on drop,
/// including on early returns and panics inside an export pass.
pub struct MonitorMuteGuard<'a> {
    session: &'a mut AudioSession,
    was_muted: bool,
}

impl<'a> MonitorMuteGuard<'a> {
    pub fn mute(session: &'a mut AudioSession) -> Self {
        let was_muted = session.is_monitor_muted();
        session.mute_monitor();
        Self { session, was_muted }
    }
}

impl Drop for MonitorMuteGuard<'_> {
    fn drop(&mut self) {
        if !self.was_muted {
            self.session.unmute_monitor();
        }
    }
}

/// Stereo interleaved mixdown of a project's audio tracks.
#[derive(Clone, Debug)]
pub struct AudioMix {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Vec<f32>,
}

impl AudioMix {
    pub fn is_silent(&self) -> bool {
        self.interleaved_f32.iter().all(|&s| s == 0.0)
    }
}

/// Mix the main and background tracks over the full timeline.
///
/// The main stage applies the settings-level master volume on top of the
/// track's own gain; the background stage is the track gain alone. Tracks
/// whose PCM is not prepared contribute silence (the export still runs for
/// the full timeline, matching preview).
pub fn mix_export(project: &Project, assets: &AssetStore) -> AudioMix {
    let total_sec = project.total_duration();
    let total_frames = (total_sec * f64::from(MIX_SAMPLE_RATE)).round().max(0.0) as usize;
    let mut out = vec![0.0f32; total_frames * 2];

    let stages = [
        (
            project.main_audio.as_ref(),
            project.settings.main_volume,
        ),
        (project.background_audio.as_ref(), 1.0),
    ];

    for (track, master) in stages {
        let Some(track) = track else {
            continue;
        };
        let gain = (track.volume * master).clamp(0.0, 1.0) as f32;
        if gain <= 0.0 {
            continue;
        }
        let Some(pcm) = assets.audio_pcm(&track.source) else {
            tracing::debug!(source = %track.source, "audio PCM not prepared; contributing silence");
            continue;
        };
        let src = pcm.interleaved_f32.as_slice();
        let src_frames = src.len() / usize::from(pcm.channels.max(1));
        let frames = src_frames.min(total_frames);

        for frame in 0..frames {
            let rel_sec = frame as f64 / f64::from(MIX_SAMPLE_RATE);
            let fade = fade_gain(
                rel_sec,
                track.duration_sec.min(total_sec),
                track.fade_in_sec,
                track.fade_out_sec,
            );
            let g = gain * fade;

            let (l, r) = if pcm.channels == 1 {
                let v = src[frame];
                (v, v)
            } else {
                let i = frame * usize::from(pcm.channels);
                (src[i], src[i + 1])
            };
            out[frame * 2] += l * g;
            out[frame * 2 + 1] += r * g;
        }
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }

    AudioMix {
        sample_rate: MIX_SAMPLE_RATE,
        channels: 2,
        interleaved_f32: out,
    }
}

fn fade_gain(rel_sec: f64, track_len_sec: f64, fade_in_sec: f64, fade_out_sec: f64) -> f32 {
    let mut gain = 1.0f32;
    if fade_in_sec > 0.0 {
        gain *= (rel_sec / fade_in_sec).clamp(0.0, 1.0) as f32;
    }
    if fade_out_sec > 0.0 {
        let rem = (track_len_sec - rel_sec).max(0.0);
        gain *= (rem / fade_out_sec).clamp(0.0, 1.0) as f32;
    }
    gain
}
