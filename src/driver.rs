//! Playback driver: the continuous scheduling loop and its state machine.
//!
//! States are `Stopped`, `Playing`, `Exporting`. Each tick first advances
//! the play position (wall-clock elapsed, or the attached audio clock when
//! main audio is playing — audio is authoritative so visuals can never
//! drift from it), then unconditionally composites. A paused timeline
//! therefore still repaints the current scrub position immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::assets::AssetStore;
use crate::compose::{self, FrameRGBA};
use crate::error::{LyrividError, LyrividResult};
use crate::model::Project;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    Stopped,
    Playing,
    Exporting,
}

/// Observable position of a platform audio element. Only read from the
/// driver's thread; the element itself runs wherever the platform runs it.
pub trait PositionSource {
    fn position_sec(&self) -> f64;
    fn ended(&self) -> bool;
}

/// Shared cancellation flag for a scheduling loop, so tearing down the
/// owning view stops future ticks instead of leaking a perpetual timer.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct PlaybackDriver {
    transport: Transport,
    position_sec: f64,
    last_tick: Option<Instant>,
    audio_clock: Option<Box<dyn PositionSource>>,
}

impl Default for PlaybackDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackDriver {
    pub fn new() -> Self {
        Self {
            transport: Transport::Stopped,
            position_sec: 0.0,
            last_tick: None,
            audio_clock: None,
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn position_sec(&self) -> f64 {
        self.position_sec
    }

    /// Attach the authoritative clock for the main audio element. Replaces
    /// any previous source.
    pub fn attach_audio_clock(&mut self, clock: Box<dyn PositionSource>) {
        self.audio_clock = Some(clock);
    }

    pub fn detach_audio_clock(&mut self) {
        self.audio_clock = None;
    }

    pub fn play(&mut self) -> LyrividResult<()> {
        match self.transport {
            Transport::Exporting => Err(LyrividError::validation(
                "cannot start playback while exporting",
            )),
            _ => {
                self.transport = Transport::Playing;
                Ok(())
            }
        }
    }

    pub fn pause(&mut self) {
        if self.transport == Transport::Playing {
            self.transport = Transport::Stopped;
        }
    }

    /// Takes effect before the next tick's paint.
    pub fn seek(&mut self, t: f64) {
        self.position_sec = t.max(0.0);
    }

    /// Enter the exporting state: time rewinds to 0 and interactive
    /// playback is locked out until [`Self::finish_export`].
    pub fn begin_export(&mut self) -> LyrividResult<()> {
        if self.transport == Transport::Exporting {
            return Err(LyrividError::validation("an export is already running"));
        }
        self.transport = Transport::Exporting;
        self.position_sec = 0.0;
        Ok(())
    }

    /// Leave the exporting state and return to ready.
    pub fn finish_export(&mut self) {
        self.transport = Transport::Stopped;
        self.position_sec = 0.0;
        self.last_tick = None;
    }

    /// Advance the clock and composite the frame for the (possibly updated)
    /// position. Called once per display refresh by the owner.
    pub fn tick(&mut self, now: Instant, project: &Project, assets: &AssetStore) -> FrameRGBA {
        let elapsed = self
            .last_tick
            .map(|prev| now.saturating_duration_since(prev).as_secs_f64())
            .unwrap_or(0.0);
        self.last_tick = Some(now);

        if self.transport == Transport::Playing {
            self.advance(elapsed, project);
        }

        let total = project.total_duration();
        self.position_sec = self.position_sec.clamp(0.0, total);
        compose::compose_frame(project, assets, self.position_sec)
    }

    fn advance(&mut self, elapsed: f64, project: &Project) {
        if let Some(clock) = &self.audio_clock {
            // Audio element position is the authoritative clock.
            self.position_sec = clock.position_sec().max(0.0);
            if clock.ended() {
                self.transport = Transport::Stopped;
            }
            return;
        }

        let total = project.total_duration();
        self.position_sec += elapsed.max(0.0);
        if self.position_sec >= total {
            // No audio-defined end: auto-stop and rewind.
            self.transport = Transport::Stopped;
            self.position_sec = 0.0;
        }
    }
}

impl std::fmt::Debug for PlaybackDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackDriver")
            .field("transport", &self.transport)
            .field("position_sec", &self.position_sec)
            .field("has_audio_clock", &self.audio_clock.is_some())
            .finish()
    }
}

/// Run the preview scheduling loop at the project frame rate until the
/// token cancels. Each iteration ticks once and hands the frame to
/// `present`.
pub fn run_preview_loop(
    driver: &mut PlaybackDriver,
    project: &Project,
    assets: &AssetStore,
    cancel: &CancelToken,
    mut present: impl FnMut(&FrameRGBA),
) {
    let frame_interval =
        std::time::Duration::from_secs_f64(project.settings.frame_rate.frame_duration_secs());
    while !cancel.is_cancelled() {
        let frame = driver.tick(Instant::now(), project, assets);
        present(&frame);
        if cancel.is_cancelled() {
            break;
        }
        std::thread::sleep(frame_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    fn project_10s() -> Project {
        // Empty project: 10 s floor, placeholder frames.
        Project::default()
    }

    #[test]
    fn wall_clock_advances_only_while_playing() {
        let p = project_10s();
        let store = AssetStore::new();
        let mut d = PlaybackDriver::new();
        let t0 = Instant::now();

        d.tick(t0, &p, &store);
        d.tick(t0 + Duration::from_millis(500), &p, &store);
        assert_eq!(d.position_sec(), 0.0, "stopped transport holds position");

        d.play().unwrap();
        d.tick(t0 + Duration::from_millis(1000), &p, &store);
        assert!((d.position_sec() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn paused_tick_still_composites_current_position() {
        let p = project_10s();
        let store = AssetStore::new();
        let mut d = PlaybackDriver::new();
        d.seek(3.0);
        let f = d.tick(Instant::now(), &p, &store);
        assert_eq!(d.position_sec(), 3.0);
        assert_eq!(f.width, p.settings.resolution.width());
    }

    #[test]
    fn reaching_end_without_audio_stops_and_rewinds() {
        let p = project_10s();
        let store = AssetStore::new();
        let mut d = PlaybackDriver::new();
        let t0 = Instant::now();
        d.play().unwrap();
        d.tick(t0, &p, &store);
        d.tick(t0 + Duration::from_secs(11), &p, &store);
        assert_eq!(d.transport(), Transport::Stopped);
        assert_eq!(d.position_sec(), 0.0);
    }

    struct FakeAudioClock {
        pos: Rc<Cell<f64>>,
        ended: Rc<Cell<bool>>,
    }

    impl PositionSource for FakeAudioClock {
        fn position_sec(&self) -> f64 {
            self.pos.get()
        }
        fn ended(&self) -> bool {
            self.ended.get()
        }
    }

    #[test]
    fn audio_clock_is_authoritative_and_its_end_stops_playback() {
        let mut p = project_10s();
        p.main_audio = Some(crate::model::AudioTrack::new("song", 30.0));
        let store = AssetStore::new();

        let pos = Rc::new(Cell::new(0.0));
        let ended = Rc::new(Cell::new(false));
        let mut d = PlaybackDriver::new();
        d.attach_audio_clock(Box::new(FakeAudioClock {
            pos: pos.clone(),
            ended: ended.clone(),
        }));

        d.play().unwrap();
        let t0 = Instant::now();
        pos.set(12.34);
        d.tick(t0, &p, &store);
        assert!((d.position_sec() - 12.34).abs() < 1e-9, "audio wins over wall time");

        pos.set(30.0);
        ended.set(true);
        d.tick(t0 + Duration::from_millis(16), &p, &store);
        assert_eq!(d.transport(), Transport::Stopped);
        assert!(d.position_sec() > 0.0, "audio-defined end does not rewind");
    }

    #[test]
    fn export_state_locks_out_play_and_resets_time() {
        let mut d = PlaybackDriver::new();
        d.seek(5.0);
        d.begin_export().unwrap();
        assert_eq!(d.transport(), Transport::Exporting);
        assert_eq!(d.position_sec(), 0.0);
        assert!(d.play().is_err());
        assert!(d.begin_export().is_err());
        d.finish_export();
        assert_eq!(d.transport(), Transport::Stopped);
        d.play().unwrap();
    }

    #[test]
    fn preview_loop_is_cancelable_from_the_presenter() {
        let p = project_10s();
        let store = AssetStore::new();
        let mut d = PlaybackDriver::new();
        let cancel = CancelToken::new();

        let mut frames = 0u32;
        let c2 = cancel.clone();
        run_preview_loop(&mut d, &p, &store, &cancel, |_frame| {
            frames += 1;
            if frames >= 3 {
                c2.cancel();
            }
        });
        assert_eq!(frames, 3);
    }
}
