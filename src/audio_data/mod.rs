mod default_loader;
mod load_options;
mod loader;
mod resampler;

use crate::error::{PetalSfxError, Result};
pub use default_loader::DefaultAudioLoader;
pub use load_options::{ConvertToMono, LoadOptions};
pub use loader::AudioDataLoader;
pub use resampler::AudioResampler;
use std::sync::Arc;
use std::time::Duration;

/// Decoded PCM with reference-counted sharing.
///
/// Samples are stored **interleaved** (`[L0, R0, L1, R1, ...]` for stereo), the layout
/// decoders produce and the output stream consumes. Cloning is cheap; the sample buffer
/// is never mutated after construction.
#[derive(Debug, Clone)]
pub struct PetalSfxAudioData {
    inner: Arc<AudioDataInner>,
}

#[derive(Debug)]
pub(crate) struct AudioDataInner {
    /// Interleaved samples, `total_frames * channels` long
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration: Duration,
    pub total_frames: usize,
}

impl PetalSfxAudioData {
    pub(crate) fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let total_frames = samples.len() / channels as usize;
        let duration = Duration::from_secs_f64(total_frames as f64 / sample_rate as f64);
        Self {
            inner: Arc::new(AudioDataInner {
                samples,
                sample_rate,
                channels,
                duration,
                total_frames,
            }),
        }
    }

    /// Wraps already-decoded interleaved samples.
    ///
    /// # Errors
    ///
    /// Returns `AudioFormat` if the rate or channel count is zero, or if the sample count
    /// is not a whole number of frames.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(PetalSfxError::AudioFormat(format!(
                "Invalid format: {} Hz, {} channels",
                sample_rate, channels
            )));
        }
        if samples.len() % channels as usize != 0 {
            return Err(PetalSfxError::AudioFormat(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                channels
            )));
        }
        Ok(Self::new(samples, sample_rate, channels))
    }

    /// Load audio data from a file path using the default Symphonia loader.
    pub fn from_path(path: &str) -> Result<Arc<Self>> {
        DefaultAudioLoader.load(path, &LoadOptions::default())
    }

    /// Load audio data from a file path with custom loading options.
    pub fn from_path_with_options(path: &str, options: &LoadOptions) -> Result<Arc<Self>> {
        DefaultAudioLoader.load(path, options)
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.inner.channels
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration
    }

    pub fn samples(&self) -> &[f32] {
        &self.inner.samples
    }

    pub fn total_frames(&self) -> usize {
        self.inner.total_frames
    }

    pub fn is_empty(&self) -> bool {
        self.inner.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.samples.len()
    }

    /// Sample of `channel` at `frame`. Channels past the last one repeat the last channel,
    /// so mono data fills every output channel.
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.inner.channels as usize;
        let channel = channel.min(channels - 1);
        self.inner
            .samples
            .get(frame * channels + channel)
            .copied()
            .unwrap_or(0.0)
    }

    /// Convert to mono by averaging all channels
    pub fn to_mono(&self) -> Result<Self> {
        if self.inner.channels == 1 {
            return Ok(self.clone());
        }

        let channels = self.inner.channels as usize;
        let mono_samples: Vec<f32> = self
            .inner
            .samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        Ok(Self::new(mono_samples, self.inner.sample_rate, 1))
    }

    /// Folds the channels down to `channels` output channels.
    ///
    /// Mono targets average every channel. 5.1 to stereo uses the ITU-R BS.775 matrix
    /// (centre and surrounds at -3 dB, LFE dropped). Other layouts fold channel `c` onto
    /// output `c % channels` and average what lands on each output. Data that already has
    /// `channels` or fewer is returned unchanged.
    pub fn downmix(&self, channels: u16) -> Result<Self> {
        let source_channels = self.inner.channels as usize;
        let target = channels as usize;
        if target == 0 {
            return Err(PetalSfxError::AudioFormat(
                "Cannot downmix to zero channels".to_string(),
            ));
        }
        if source_channels <= target {
            return Ok(self.clone());
        }
        if target == 1 {
            return self.to_mono();
        }

        let mut samples = Vec::with_capacity(self.inner.total_frames * target);
        if source_channels == 6 && target == 2 {
            const MINUS_3DB: f32 = std::f32::consts::FRAC_1_SQRT_2;
            for frame in self.inner.samples.chunks_exact(6) {
                let centre = frame[2] * MINUS_3DB;
                samples.push(frame[0] + centre + frame[4] * MINUS_3DB);
                samples.push(frame[1] + centre + frame[5] * MINUS_3DB);
            }
        } else {
            let mut counts = vec![0.0f32; target];
            for c in 0..source_channels {
                counts[c % target] += 1.0;
            }
            for frame in self.inner.samples.chunks_exact(source_channels) {
                let start = samples.len();
                samples.resize(start + target, 0.0);
                for (c, value) in frame.iter().enumerate() {
                    samples[start + c % target] += value;
                }
                for (out, count) in samples[start..].iter_mut().zip(&counts) {
                    *out /= count;
                }
            }
        }

        Ok(Self::new(samples, self.inner.sample_rate, channels))
    }

    /// Resample to a different sample rate using rubato, returns a new instance
    pub fn resample(&self, target_sample_rate: u32) -> Result<Self> {
        if target_sample_rate == self.inner.sample_rate {
            return Ok(self.clone());
        }

        let resampler = AudioResampler::new(
            self.inner.sample_rate,
            target_sample_rate,
            self.inner.channels,
            Some(1024),
        )?;

        let resampled_samples = resampler.resample_interleaved(&self.inner.samples)?;

        Ok(Self::new(
            resampled_samples,
            target_sample_rate,
            self.inner.channels,
        ))
    }
}
