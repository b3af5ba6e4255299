//! The audio backend the engine renders through.
//!
//! The engine decides *what* plays (which voice, at what volume and pitch, which music track);
//! a backend turns those decisions into sound and reports back when buffers finish.
//! [`CpalBackend`] drives a real output device; tests and headless hosts can provide their own.

mod cpal_backend;

pub use cpal_backend::CpalBackend;

use crate::audio_data::PetalSfxAudioData;
use crate::error::Result;
use crate::music::MusicSessionId;
use crate::voice_pool::VoiceGrant;
use std::path::Path;

/// Volume and pitch for one granted voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    /// Linear gain before the SFX master volume
    pub volume: f32,
    /// Pitch shift in cents; 0 plays at the original pitch
    pub pitch_offset_cents: f32,
}

/// Notifications a backend hands back to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    /// The buffer started on this voice has played to the end
    VoiceFinished(VoiceGrant),
    /// A non-repeating music track reached its end
    MusicFinished(MusicSessionId),
    /// A music track could not be opened or decoded
    MusicFailed(MusicSessionId),
}

pub trait AudioBackend {
    /// Brings up the output. Called by `PetalSfxEngine::start`, possibly again after a failure.
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Starts `data` on the voice behind `grant`. The pool only grants idle voices, so the
    /// voice's output route is never reconfigured while it is rendering.
    fn render_voice(&mut self, grant: VoiceGrant, data: &PetalSfxAudioData, params: VoiceParams);

    /// Replaces whatever music is playing with `track`.
    ///
    /// With `repeat` the backend loops the track itself and never reports `MusicFinished`
    /// for this session.
    fn play_music(&mut self, session: MusicSessionId, track: &Path, volume: f32, repeat: bool);

    fn stop_music(&mut self);

    fn set_music_volume(&mut self, volume: f32);

    /// Master gain applied to the mixed sound-effect voices.
    fn set_mixer_output_volume(&mut self, volume: f32);

    /// Whether the platform asked secondary audio (background music) to stay silent.
    fn is_secondary_audio_silenced(&self) -> bool {
        false
    }

    /// Drains completion notifications produced since the last call.
    fn poll_events(&mut self) -> Vec<BackendEvent>;
}
