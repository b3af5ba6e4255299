use crate::{
    audio_data::{AudioDataLoader, ConvertToMono, LoadOptions, PetalSfxAudioData},
    error::{PetalSfxError, Result},
};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use symphonia::{
    core::{
        audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
        io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
    },
    default::{get_codecs, get_probe},
};

/// Default loader built on Symphonia (WAV, MP3, FLAC, OGG, ...), decoding to f32 PCM.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAudioLoader;

impl AudioDataLoader for DefaultAudioLoader {
    fn load(&self, path: &str, options: &LoadOptions) -> Result<Arc<PetalSfxAudioData>> {
        let file = File::open(path)?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                PetalSfxError::AudioLoading(format!("Unrecognized format in {}: {:?}", path, e))
            })?;

        let mut format = probed.format;

        let track = format.default_track().ok_or_else(|| {
            PetalSfxError::AudioLoading(format!("No default audio track in {}", path))
        })?;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| PetalSfxError::AudioLoading("Sample rate not found".to_string()))?;

        let channels = track
            .codec_params
            .channels
            .ok_or_else(|| PetalSfxError::AudioLoading("Channel count not found".to_string()))?
            .count() as u16;

        let mut decoder = get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| {
                PetalSfxError::AudioLoading(format!("Failed to create decoder: {:?}", e))
            })?;

        let max_samples = options
            .max_frames(sample_rate)
            .map(|frames| frames.saturating_mul(channels as usize))
            .unwrap_or(usize::MAX);
        let mut samples: Vec<f32> = Vec::new();

        while samples.len() < max_samples {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(_)) => break, // end-of-file
                Err(e) => {
                    return Err(PetalSfxError::AudioLoading(format!(
                        "Error reading packet: {:?}",
                        e
                    )));
                }
            };

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(Error::IoError(_)) => break, // also EOF in some formats
                Err(Error::DecodeError(_)) => continue, // recoverable corruption
                Err(e) => {
                    return Err(PetalSfxError::AudioLoading(format!(
                        "Error decoding packet: {:?}",
                        e
                    )));
                }
            };

            let spec = *decoded.spec();
            let mut tmp = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            tmp.copy_interleaved_ref(decoded);
            samples.extend_from_slice(tmp.samples());
        }
        samples.truncate(max_samples);

        if samples.is_empty() {
            return Err(PetalSfxError::AudioLoading(format!(
                "{} decoded to zero samples",
                path
            )));
        }

        let audio_data = PetalSfxAudioData::from_samples(samples, sample_rate, channels)?;
        let audio_data = match options.convert_to_mono {
            ConvertToMono::Original => audio_data,
            ConvertToMono::ForceMono => audio_data.to_mono()?,
        };

        log::debug!(
            "Decoded {}: {} frames, {} Hz, {} channels",
            path,
            audio_data.total_frames(),
            audio_data.sample_rate(),
            audio_data.channels()
        );

        Ok(Arc::new(audio_data))
    }
}
