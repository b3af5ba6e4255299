//! Configuration for PetalSfx

use crate::error::{PetalSfxError, Result};
use std::time::Duration;

/// Default number of concurrent sound-effect voices.
pub const DEFAULT_VOICE_COUNT: usize = 20;

/// Default duration of a background-music fade-out.
pub const DEFAULT_FADE_DURATION: Duration = Duration::from_millis(1500);

/// Configuration descriptor for a PetalSfx engine
#[derive(Debug, Clone)]
pub struct PetalSfxDesc {
    /// Sample rate every loaded sound is resampled to, and the rate the backend renders at
    pub sample_rate: u32,
    /// Frames rendered per backend callback
    pub block_size: usize,
    /// Number of output channels (typically 2 for stereo)
    pub channels: u16,
    /// Size of the sound-effect voice pool
    pub voice_count: usize,
    /// How long `stop_music(true)` takes to ramp the music down to silence
    pub fade_duration: Duration,
    /// Master background-music volume (0.0 = silent, 1.0 = full volume)
    pub music_volume: f32,
    /// Master sound-effect volume applied at the mixer output
    pub sfx_master_volume: f32,
    /// Fixed seed for variation and selection randomness (None seeds from entropy)
    pub rng_seed: Option<u64>,
}

impl Default for PetalSfxDesc {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 512,
            channels: 2,
            voice_count: DEFAULT_VOICE_COUNT,
            fade_duration: DEFAULT_FADE_DURATION,
            music_volume: 1.0,
            sfx_master_volume: 1.0,
            rng_seed: None,
        }
    }
}

impl PetalSfxDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    pub fn channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn voice_count(mut self, count: usize) -> Self {
        self.voice_count = count;
        self
    }

    pub fn fade_duration(mut self, duration: Duration) -> Self {
        self.fade_duration = duration;
        self
    }

    pub fn music_volume(mut self, volume: f32) -> Self {
        self.music_volume = volume;
        self
    }

    pub fn sfx_master_volume(mut self, volume: f32) -> Self {
        self.sfx_master_volume = volume;
        self
    }

    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Checks the descriptor before an engine is built from it.
    pub fn validate(&self) -> Result<()> {
        if self.voice_count == 0 {
            return Err(PetalSfxError::Configuration(
                "voice_count must be greater than 0".to_string(),
            ));
        }
        if self.sample_rate == 0 || self.channels == 0 || self.block_size == 0 {
            return Err(PetalSfxError::Configuration(format!(
                "Invalid stream format: {} Hz, {} channels, {} frames per block",
                self.sample_rate, self.channels, self.block_size
            )));
        }
        validate_volume("music_volume", self.music_volume)?;
        validate_volume("sfx_master_volume", self.sfx_master_volume)?;
        Ok(())
    }
}

/// Rejects volumes outside `[0, 1]`, including NaN.
pub(crate) fn validate_volume(name: &str, volume: f32) -> Result<()> {
    if (0.0..=1.0).contains(&volume) {
        Ok(())
    } else {
        Err(PetalSfxError::Configuration(format!(
            "{} must be within [0, 1], got {}",
            name, volume
        )))
    }
}
