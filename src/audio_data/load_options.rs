use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertToMono {
    /// Keep original channels: stereo if input is stereo, mono if input is mono
    Original,
    /// Force mono: if input is mono use it, otherwise average all channels into one
    ForceMono,
}

/// Options controlling how a file is decoded into [`PetalSfxAudioData`](super::PetalSfxAudioData).
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// How to handle mono conversion
    pub convert_to_mono: ConvertToMono,
    /// Maximum duration to decode (None = decode the entire file)
    pub max_duration: Option<Duration>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            convert_to_mono: ConvertToMono::Original,
            max_duration: None,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn convert_to_mono(mut self, convert: ConvertToMono) -> Self {
        self.convert_to_mono = convert;
        self
    }

    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }

    /// Number of frames to keep at `sample_rate`, if a limit is set.
    pub(crate) fn max_frames(&self, sample_rate: u32) -> Option<usize> {
        self.max_duration
            .map(|d| (d.as_secs_f64() * sample_rate as f64) as usize)
    }
}
