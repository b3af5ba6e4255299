//! Background music: one channel, driven as a small state machine.
//!
//! ```text
//!            play / play_random (any state, cancels a fade)
//!   Stopped ───────────────────────────────▶ Playing | Looping | RandomLooping
//!      ▲                                              │
//!      │ fade done / stop(false) / track ended        │ stop(true)
//!      └──────────────────── FadingOut ◀──────────────┘
//! ```
//!
//! Every started track gets a fresh [`MusicSessionId`]; completions reported by the backend
//! for any other session belong to a superseded track and are ignored.

use crate::backend::AudioBackend;
use crate::error::{PetalSfxError, Result};
use crate::events::PetalSfxEvent;
use crate::random::random_index;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Identifies one started music track.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MusicSessionId(pub(crate) u64);

impl std::fmt::Display for MusicSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MusicSession({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicState {
    Stopped,
    /// A single track, played once
    Playing,
    /// A single track, repeated by the backend
    Looping,
    /// A playlist; a new random track is drawn each time one ends
    RandomLooping,
    /// Ramping down to silence, then `Stopped`
    FadingOut,
}

impl MusicState {
    pub fn is_playing(&self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    start_volume: f32,
    elapsed: Duration,
}

#[derive(Debug)]
pub struct MusicController {
    state: MusicState,
    current_track: Option<PathBuf>,
    playlist: Vec<PathBuf>,
    master_volume: f32,
    volume: f32,
    fade: Option<Fade>,
    fade_duration: Duration,
    session: MusicSessionId,
    events: Vec<PetalSfxEvent>,
}

impl MusicController {
    pub fn new(master_volume: f32, fade_duration: Duration) -> Self {
        Self {
            state: MusicState::Stopped,
            current_track: None,
            playlist: Vec::new(),
            master_volume,
            volume: master_volume,
            fade: None,
            fade_duration,
            session: MusicSessionId(0),
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> MusicState {
        self.state
    }

    pub fn current_track(&self) -> Option<&Path> {
        self.current_track.as_deref()
    }

    pub fn playlist(&self) -> &[PathBuf] {
        &self.playlist
    }

    /// Volume currently applied to the music channel (lower than the master volume mid-fade).
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn session(&self) -> MusicSessionId {
        self.session
    }

    pub fn fade_duration(&self) -> Duration {
        self.fade_duration
    }

    /// Time spent in the current fade, if one is running.
    pub fn fade_elapsed(&self) -> Option<Duration> {
        self.fade.map(|f| f.elapsed)
    }

    /// Starts `track`, replacing anything playing or fading.
    pub fn play(&mut self, backend: &mut dyn AudioBackend, track: PathBuf, looping: bool) {
        self.reset(backend);
        self.playlist.clear();
        self.start_track(backend, track, looping);
        self.state = if looping {
            MusicState::Looping
        } else {
            MusicState::Playing
        };
        log::debug!("Music state -> {:?}", self.state);
    }

    /// Starts a random track from `tracks`. With `looping`, every time a track ends another
    /// random one (possibly the same) follows.
    pub fn play_random<R: Rng + ?Sized>(
        &mut self,
        backend: &mut dyn AudioBackend,
        rng: &mut R,
        tracks: Vec<PathBuf>,
        looping: bool,
    ) -> Result<()> {
        if tracks.is_empty() {
            return Err(PetalSfxError::Configuration(
                "Random music needs at least one track".to_string(),
            ));
        }

        self.reset(backend);
        let track = tracks[random_index(rng, tracks.len())].clone();
        self.playlist = if looping { tracks } else { Vec::new() };
        self.start_track(backend, track, false);
        self.state = if looping {
            MusicState::RandomLooping
        } else {
            MusicState::Playing
        };
        log::debug!(
            "Music state -> {:?} ({} tracks)",
            self.state,
            self.playlist.len()
        );
        Ok(())
    }

    /// Stops the music, immediately or by fading out over the configured fade duration.
    ///
    /// Does nothing when no music is playing. Asking for a fade while already fading keeps
    /// the running fade.
    pub fn stop(&mut self, backend: &mut dyn AudioBackend, fade_out: bool) {
        match self.state {
            MusicState::Stopped => return,
            MusicState::FadingOut if fade_out => return,
            _ => {}
        }

        if !fade_out || self.fade_duration.is_zero() {
            self.finish_stop(backend);
            return;
        }

        self.fade = Some(Fade {
            start_volume: self.volume,
            elapsed: Duration::ZERO,
        });
        self.state = MusicState::FadingOut;
        self.events.push(PetalSfxEvent::MusicFadeStarted);
        log::debug!(
            "Music fading out from {:.3} over {:?}",
            self.volume,
            self.fade_duration
        );
    }

    /// Changes the master music volume; applied right away unless fading or stopped.
    pub fn set_master_volume(&mut self, backend: &mut dyn AudioBackend, volume: f32) {
        self.master_volume = volume;
        let audible = matches!(
            self.state,
            MusicState::Playing | MusicState::Looping | MusicState::RandomLooping
        );
        if audible && !backend.is_secondary_audio_silenced() {
            self.volume = volume;
            backend.set_music_volume(volume);
        }
    }

    /// Advances the fade ramp by `dt`.
    pub fn tick(&mut self, backend: &mut dyn AudioBackend, dt: Duration) {
        let Some(fade) = self.fade.as_mut() else {
            return;
        };

        fade.elapsed += dt;
        if fade.elapsed >= self.fade_duration {
            self.finish_stop(backend);
            return;
        }

        let progress = fade.elapsed.as_secs_f32() / self.fade_duration.as_secs_f32();
        self.volume = fade.start_volume * (1.0 - progress);
        backend.set_music_volume(self.volume);
    }

    /// A track of `session` played to its end.
    pub fn handle_finished<R: Rng + ?Sized>(
        &mut self,
        backend: &mut dyn AudioBackend,
        rng: &mut R,
        session: MusicSessionId,
    ) {
        if session != self.session || !self.state.is_playing() {
            log::debug!("Ignoring completion of superseded {}", session);
            return;
        }

        match self.state {
            MusicState::RandomLooping => {
                let next = self.playlist[random_index(rng, self.playlist.len())].clone();
                log::debug!("Random music loop -> {}", next.display());
                self.events.push(PetalSfxEvent::MusicLooped {
                    next_track: next.clone(),
                });
                self.start_track(backend, next, false);
            }
            MusicState::Looping => {
                // Backends repeat looping tracks themselves; restart if one reports an end anyway.
                if let Some(track) = self.current_track.clone() {
                    self.events.push(PetalSfxEvent::MusicLooped {
                        next_track: track.clone(),
                    });
                    self.start_track(backend, track, true);
                }
            }
            _ => self.finish_stop(backend),
        }
    }

    /// The backend could not play the track of `session`.
    pub fn handle_failed(&mut self, backend: &mut dyn AudioBackend, session: MusicSessionId) {
        if session != self.session || !self.state.is_playing() {
            return;
        }
        let track = self.current_track.clone().unwrap_or_default();
        log::warn!("Music track {} could not be played", track.display());
        self.events.push(PetalSfxEvent::MusicFailed { track });
        self.finish_stop(backend);
    }

    pub(crate) fn drain_events(&mut self) -> std::vec::Drain<'_, PetalSfxEvent> {
        self.events.drain(..)
    }

    fn reset(&mut self, backend: &mut dyn AudioBackend) {
        if self.fade.take().is_some() {
            log::debug!("Music fade cancelled");
        }
        if self.state.is_playing() {
            backend.stop_music();
        }
        self.volume = if backend.is_secondary_audio_silenced() {
            0.0
        } else {
            self.master_volume
        };
    }

    fn start_track(&mut self, backend: &mut dyn AudioBackend, track: PathBuf, repeat: bool) {
        self.session = MusicSessionId(self.session.0 + 1);
        backend.play_music(self.session, &track, self.volume, repeat);
        log::info!(
            "Music {} started: {} (repeat: {})",
            self.session,
            track.display(),
            repeat
        );
        self.events.push(PetalSfxEvent::MusicStarted {
            track: track.clone(),
        });
        self.current_track = Some(track);
    }

    fn finish_stop(&mut self, backend: &mut dyn AudioBackend) {
        backend.stop_music();
        self.fade = None;
        self.state = MusicState::Stopped;
        self.current_track = None;
        self.playlist.clear();
        self.events.push(PetalSfxEvent::MusicStopped);
        log::debug!("Music state -> Stopped");
    }
}
