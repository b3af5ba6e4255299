use crate::error::{PetalSfxError, Result};
use rubato::{FftFixedIn, Resampler};

/// Offline resampler used on the decode thread to bring loaded audio to the engine sample rate.
///
/// All channels go through one rubato resampler. The resampler's output delay is trimmed and
/// the tail flushed, so `n` input frames become `round(n * ratio)` output frames.
pub struct AudioResampler {
    source_sample_rate: u32,
    target_sample_rate: u32,
    channels: u16,
    chunk_size: usize,
}

impl AudioResampler {
    pub fn new(
        source_sample_rate: u32,
        target_sample_rate: u32,
        channels: u16,
        chunk_size: Option<usize>,
    ) -> Result<Self> {
        if source_sample_rate == 0 || target_sample_rate == 0 {
            return Err(PetalSfxError::AudioFormat(
                "Sample rates must be greater than 0".to_string(),
            ));
        }

        if channels == 0 {
            return Err(PetalSfxError::AudioFormat(
                "Channel count must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            source_sample_rate,
            target_sample_rate,
            channels,
            chunk_size: chunk_size.unwrap_or(1024).max(1),
        })
    }

    pub fn resample_interleaved(&self, interleaved_samples: &[f32]) -> Result<Vec<f32>> {
        if self.source_sample_rate == self.target_sample_rate || interleaved_samples.is_empty() {
            return Ok(interleaved_samples.to_vec());
        }

        let channels = self.channels as usize;
        let planar = deinterleave(interleaved_samples, channels);
        let input_frames = planar[0].len();
        let expected_frames = (input_frames as f64 * self.resample_ratio()).round() as usize;

        let mut resampler = FftFixedIn::<f32>::new(
            self.source_sample_rate as usize,
            self.target_sample_rate as usize,
            self.chunk_size,
            2, // sub_chunks
            channels,
        )
        .map_err(|e| PetalSfxError::AudioLoading(format!("Failed to create resampler: {}", e)))?;

        let delay = resampler.output_delay();
        let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected_frames + delay); channels];
        let mut position = 0;

        // Feed zero-padded chunks until the delayed tail has come out as well.
        while output[0].len() < delay + expected_frames {
            let block_len = resampler.input_frames_next();
            let end = (position + block_len).min(input_frames);
            let chunk: Vec<Vec<f32>> = planar
                .iter()
                .map(|channel| {
                    let mut block = channel.get(position..end).unwrap_or_default().to_vec();
                    block.resize(block_len, 0.0);
                    block
                })
                .collect();
            position = end;

            let waves_out = resampler
                .process(&chunk, None)
                .map_err(|e| PetalSfxError::AudioLoading(format!("Resampling error: {}", e)))?;
            for (dst, src) in output.iter_mut().zip(waves_out) {
                dst.extend_from_slice(&src);
            }
        }

        let mut interleaved = Vec::with_capacity(expected_frames * channels);
        for frame in delay..delay + expected_frames {
            for channel in &output {
                interleaved.push(channel[frame]);
            }
        }
        Ok(interleaved)
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    pub fn source_sample_rate(&self) -> u32 {
        self.source_sample_rate
    }

    pub fn resample_ratio(&self) -> f64 {
        self.target_sample_rate as f64 / self.source_sample_rate as f64
    }
}

fn deinterleave(interleaved: &[f32], channels: usize) -> Vec<Vec<f32>> {
    (0..channels)
        .map(|ch| {
            interleaved
                .chunks(channels)
                .map(|frame| frame.get(ch).copied().unwrap_or(0.0))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resampler_creation() {
        let resampler = AudioResampler::new(44100, 48000, 2, None);
        assert!(resampler.is_ok());

        let resampler = resampler.unwrap();
        assert_eq!(resampler.source_sample_rate(), 44100);
        assert_eq!(resampler.target_sample_rate(), 48000);
    }

    #[test]
    fn test_resampler_no_resampling_needed() {
        let resampler = AudioResampler::new(44100, 44100, 1, None).unwrap();
        let samples = vec![0.1, 0.2, 0.3, 0.4];
        let result = resampler.resample_interleaved(&samples).unwrap();
        assert_eq!(result, samples);
    }

    #[test]
    fn test_invalid_sample_rates() {
        assert!(AudioResampler::new(0, 48000, 2, None).is_err());
        assert!(AudioResampler::new(44100, 0, 2, None).is_err());
        assert!(AudioResampler::new(44100, 48000, 0, None).is_err());
    }

    #[test]
    fn test_output_length_follows_ratio() {
        let resampler = AudioResampler::new(44100, 48000, 2, Some(512)).unwrap();
        let input = vec![0.25f32; 4410 * 2];
        let output = resampler.resample_interleaved(&input).unwrap();
        assert_eq!(output.len(), 4800 * 2);
    }
}
