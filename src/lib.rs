//! PetalSfx: sound effects and background music for games.
//!
//! Sound effects play on a fixed pool of voices handed out round-robin; when every voice is
//! busy a new play is dropped with a warning instead of cutting off a running one. Each play
//! can vary its volume (in dB) and pitch (in cents) so repeated effects do not sound identical,
//! and interchangeable sounds can be grouped so one is picked at random per play. A single
//! music channel plays, loops, shuffles and fades out tracks.
//!
//! ```no_run
//! use petalsfx::{PetalSfxDesc, PetalSfxEngine, SoundConfig};
//! use std::time::Duration;
//!
//! # fn main() -> petalsfx::Result<()> {
//! let mut engine = PetalSfxEngine::with_default_output(PetalSfxDesc::default())?;
//! engine.start()?;
//!
//! let step = engine.load_sound("step.wav", SoundConfig::new().volume_vary_db(3.0))?;
//! engine.play(step);
//! engine.play_music("theme.ogg", true);
//!
//! loop {
//!     engine.tick(Duration::from_millis(16));
//!     for event in engine.poll_events() {
//!         log::info!("{:?}", event);
//!     }
//! #   break;
//! }
//! # Ok(())
//! # }
//! ```

pub mod audio_data;
pub mod backend;
pub mod config;
mod decode_worker;
pub mod engine;
pub mod error;
pub mod events;
pub mod math;
mod mixer;
pub mod music;
pub mod random;
pub mod sound;
pub mod variant_group;
pub mod variation;
pub mod voice_pool;

#[cfg(test)]
mod test_support;

pub use audio_data::{ConvertToMono, LoadOptions, PetalSfxAudioData};
pub use backend::{AudioBackend, BackendEvent, CpalBackend, VoiceParams};
pub use config::PetalSfxDesc;
pub use engine::{PetalSfxEngine, PlayOutcome};
pub use error::{PetalSfxError, Result};
pub use events::PetalSfxEvent;
pub use music::{MusicController, MusicSessionId, MusicState};
pub use sound::{PreloadedSound, SoundConfig, SoundId, SoundState};
pub use variant_group::{GroupId, VariantGroup};
pub use variation::Variation;
pub use voice_pool::{Voice, VoiceGrant, VoicePool};
