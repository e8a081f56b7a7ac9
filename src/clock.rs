//! Timeline clock: global time to (active clip, local time, transition
//! phase).
//!
//! The single source of truth for "what time is it" — the compositor, the
//! subtitle lookup, and the export pass all resolve through here so preview
//! and export can never disagree about which clip a given instant belongs
//! to.

use crate::model::{Project, TransitionKind};

/// Resolved timeline position for one instant.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ClockState {
    /// Global time after clamping into `[0, total_duration]`.
    pub global_time: f64,
    /// Active clip, or `None` for an empty clip sequence.
    pub active: Option<ActiveClip>,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ActiveClip {
    pub index: usize,
    /// Elapsed seconds since this clip's own start. When the main audio
    /// outlasts the visual timeline this may exceed the clip duration; the
    /// compositor clamps derived fractions.
    pub local_time: f64,
    pub time_remaining: f64,
    pub transition: Option<TransitionPhase>,
}

/// Cross-clip transition state within the trailing window of a clip.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct TransitionPhase {
    pub next_index: usize,
    /// Ratio of the transition window still remaining: 1 when the window
    /// opens, 0 at the cut. The incoming clip is blended at `1 - progress`.
    pub progress: f64,
}

/// Stateless resolver from project timeline to clock state.
pub struct TimelineClock;

impl TimelineClock {
    /// Resolve global time `t` against the project's clip sequence.
    ///
    /// `t` is clamped into `[0, total_duration]`. Beyond the end of the
    /// visual timeline (main audio longer than the clips) the last clip
    /// stays active. Non-positive-duration clips are skipped rather than
    /// ever panicking; validation rejects them upstream.
    pub fn resolve(project: &Project, t: f64) -> ClockState {
        let total = project.total_duration();
        let t = if t.is_finite() { t.clamp(0.0, total) } else { 0.0 };

        let mut active: Option<(usize, f64)> = None; // (index, cumulative start)
        let mut cursor = 0.0f64;
        for (index, clip) in project.clips.iter().enumerate() {
            if clip.duration_sec <= 0.0 {
                continue;
            }
            if t < cursor + clip.duration_sec {
                active = Some((index, cursor));
                break;
            }
            cursor += clip.duration_sec;
        }
        // Past the visual end: clamp to the last usable clip.
        if active.is_none() {
            let mut cursor = 0.0f64;
            let mut last: Option<(usize, f64)> = None;
            for (index, clip) in project.clips.iter().enumerate() {
                if clip.duration_sec <= 0.0 {
                    continue;
                }
                last = Some((index, cursor));
                cursor += clip.duration_sec;
            }
            active = last;
        }

        let Some((index, start)) = active else {
            return ClockState {
                global_time: t,
                active: None,
            };
        };

        let duration = project.clips[index].duration_sec;
        let local_time = t - start;
        let time_remaining = duration - local_time;

        let transition = Self::resolve_transition(project, index, duration, time_remaining);

        ClockState {
            global_time: t,
            active: Some(ActiveClip {
                index,
                local_time,
                time_remaining,
                transition,
            }),
        }
    }

    /// Cumulative start time of the clip at `index` (skipped clips count
    /// zero width).
    pub fn cumulative_start(project: &Project, index: usize) -> f64 {
        project
            .clips
            .iter()
            .take(index)
            .map(|c| c.duration_sec.max(0.0))
            .sum()
    }

    fn resolve_transition(
        project: &Project,
        index: usize,
        duration: f64,
        time_remaining: f64,
    ) -> Option<TransitionPhase> {
        if project.settings.transition == TransitionKind::None {
            return None;
        }
        let next_index = project
            .clips
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, c)| c.duration_sec > 0.0)
            .map(|(i, _)| i)?;

        let window = project
            .settings
            .transition_duration_sec
            .min(duration / 2.0);
        if window <= 0.0 {
            return None;
        }
        // Active exactly on [duration - window, duration).
        if time_remaining > window || time_remaining <= 0.0 {
            return None;
        }
        Some(TransitionPhase {
            next_index,
            progress: (time_remaining / window).clamp(0.0, 1.0),
        })
    }
}
