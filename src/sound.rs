//! Preloaded sound effects and their loading state machine.
//!
//! A sound starts out `Loading` while the decode thread works on it, then becomes `Ready` or
//! `Failed`. A play requested while loading is latched (once) and fires when the sound turns
//! ready; plays on a failed sound are dropped silently.

use crate::audio_data::PetalSfxAudioData;
use crate::backend::VoiceParams;
use crate::config::validate_volume;
use crate::error::Result;
use crate::variation::Variation;
use rand::Rng;

/// Lightweight handle to a sound effect registered with the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SoundId(pub(crate) usize);

impl std::fmt::Display for SoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SoundId({})", self.0)
    }
}

/// How a sound effect plays: its base volume and per-play variation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundConfig {
    /// Linear volume in `[0, 1]` before variation
    pub base_volume: f32,
    pub variation: Variation,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            base_volume: 1.0,
            variation: Variation::NONE,
        }
    }
}

impl SoundConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_volume(mut self, volume: f32) -> Self {
        self.base_volume = volume;
        self
    }

    pub fn volume_vary_db(mut self, db: f32) -> Self {
        self.variation = self.variation.volume_vary_db(db);
        self
    }

    pub fn pitch_vary_cents(mut self, cents: f32) -> Self {
        self.variation = self.variation.pitch_vary_cents(cents);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_volume("base_volume", self.base_volume)?;
        self.variation.validate()
    }
}

/// A decoded sound ready to be triggered.
#[derive(Debug, Clone)]
pub struct PreloadedSound {
    data: PetalSfxAudioData,
    config: SoundConfig,
}

impl PreloadedSound {
    pub fn new(data: PetalSfxAudioData, config: SoundConfig) -> Self {
        Self { data, config }
    }

    pub fn data(&self) -> &PetalSfxAudioData {
        &self.data
    }

    pub fn config(&self) -> &SoundConfig {
        &self.config
    }

    /// Randomized volume and pitch for one play.
    pub fn derive_params<R: Rng + ?Sized>(&self, rng: &mut R) -> VoiceParams {
        VoiceParams {
            volume: self
                .config
                .variation
                .derive_volume(rng, self.config.base_volume),
            pitch_offset_cents: self.config.variation.derive_pitch_offset(rng),
        }
    }
}

/// Public view of where a sound is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundState {
    Loading,
    Ready,
    Failed,
    Unloaded,
}

/// What a play request on a sound amounts to.
#[derive(Debug)]
pub(crate) enum PlayRequest<'a> {
    /// Ready: trigger it now
    Now(&'a PreloadedSound),
    /// Still loading: latched until ready
    Deferred,
    /// Failed or unloaded: nothing plays
    Ignored,
}

#[derive(Debug)]
pub(crate) enum SoundEffect {
    Loading {
        config: SoundConfig,
        play_pending: bool,
    },
    Ready(PreloadedSound),
    Failed(String),
    Unloaded,
}

impl SoundEffect {
    pub(crate) fn loading(config: SoundConfig) -> Self {
        Self::Loading {
            config,
            play_pending: false,
        }
    }

    pub(crate) fn state(&self) -> SoundState {
        match self {
            Self::Loading { .. } => SoundState::Loading,
            Self::Ready(_) => SoundState::Ready,
            Self::Failed(_) => SoundState::Failed,
            Self::Unloaded => SoundState::Unloaded,
        }
    }

    pub(crate) fn request_play(&mut self) -> PlayRequest<'_> {
        match self {
            Self::Loading { play_pending, .. } => {
                *play_pending = true;
                PlayRequest::Deferred
            }
            Self::Ready(sound) => PlayRequest::Now(sound),
            Self::Failed(_) | Self::Unloaded => PlayRequest::Ignored,
        }
    }

    /// Applies a decode result. Returns true when a latched play should fire now.
    ///
    /// Results for sounds that are no longer loading (e.g. unloaded meanwhile) are discarded.
    pub(crate) fn finish_loading(&mut self, result: Result<PetalSfxAudioData>) -> bool {
        let Self::Loading {
            config,
            play_pending,
        } = *self
        else {
            return false;
        };

        match result {
            Ok(data) => {
                *self = Self::Ready(PreloadedSound::new(data, config));
                play_pending
            }
            Err(e) => {
                *self = Self::Failed(e.to_string());
                false
            }
        }
    }

    pub(crate) fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PetalSfxError;
    use crate::random::make_rng;

    fn tone() -> PetalSfxAudioData {
        PetalSfxAudioData::from_samples(vec![0.5; 480], 48000, 1).unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(SoundConfig::default().validate().is_ok());
        assert!(SoundConfig::new().base_volume(1.2).validate().is_err());
        assert!(SoundConfig::new().volume_vary_db(-3.0).validate().is_err());
        assert!(
            SoundConfig::new()
                .base_volume(0.4)
                .volume_vary_db(3.0)
                .pitch_vary_cents(50.0)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_play_while_loading_is_latched_once() {
        let mut sound = SoundEffect::loading(SoundConfig::default());
        assert!(matches!(sound.request_play(), PlayRequest::Deferred));
        assert!(matches!(sound.request_play(), PlayRequest::Deferred));

        assert!(sound.finish_loading(Ok(tone())));
        assert_eq!(sound.state(), SoundState::Ready);
        assert!(matches!(sound.request_play(), PlayRequest::Now(_)));
    }

    #[test]
    fn test_ready_without_pending_play() {
        let mut sound = SoundEffect::loading(SoundConfig::default());
        assert!(!sound.finish_loading(Ok(tone())));
        assert_eq!(sound.state(), SoundState::Ready);
    }

    #[test]
    fn test_failed_drops_pending_play() {
        let mut sound = SoundEffect::loading(SoundConfig::default());
        let _ = sound.request_play();
        let fired = sound.finish_loading(Err(PetalSfxError::AudioLoading("corrupt".into())));
        assert!(!fired);
        assert_eq!(sound.state(), SoundState::Failed);
        assert!(sound.failure().unwrap().contains("corrupt"));
        assert!(matches!(sound.request_play(), PlayRequest::Ignored));
    }

    #[test]
    fn test_late_result_for_unloaded_sound_is_discarded() {
        let mut sound = SoundEffect::Unloaded;
        assert!(!sound.finish_loading(Ok(tone())));
        assert_eq!(sound.state(), SoundState::Unloaded);
    }

    #[test]
    fn test_no_variation_plays_exact_base() {
        let mut rng = make_rng(Some(5));
        let sound = PreloadedSound::new(tone(), SoundConfig::new().base_volume(0.35));
        let params = sound.derive_params(&mut rng);
        assert_eq!(params.volume, 0.35);
        assert_eq!(params.pitch_offset_cents, 0.0);
    }
}
