//! Background decoding.
//!
//! Sound files are decoded (and resampled to the engine rate) on a dedicated thread. Results
//! travel back over a channel and are only applied when the engine drains them in `tick`, so
//! sound state is never touched from the decode thread.

use crate::audio_data::{AudioDataLoader, LoadOptions, PetalSfxAudioData};
use crate::error::{PetalSfxError, Result};
use crate::sound::SoundId;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread;

pub(crate) struct DecodeJob {
    pub sound_id: SoundId,
    pub path: String,
    pub options: LoadOptions,
}

pub(crate) struct DecodeResult {
    pub sound_id: SoundId,
    pub result: Result<PetalSfxAudioData>,
}

pub(crate) struct DecodeWorker {
    jobs: Sender<DecodeJob>,
    results: Receiver<DecodeResult>,
}

impl DecodeWorker {
    /// Spawns the decode thread. It exits on its own once the worker is dropped and the
    /// job queue drains.
    pub fn spawn(
        loader: Arc<dyn AudioDataLoader>,
        target_sample_rate: u32,
        target_channels: u16,
    ) -> Result<Self> {
        let (jobs, job_receiver) = crossbeam_channel::unbounded::<DecodeJob>();
        let (result_sender, results) = crossbeam_channel::unbounded();

        thread::Builder::new()
            .name("petalsfx-decode".to_string())
            .spawn(move || {
                for job in job_receiver {
                    log::debug!("Decoding {} for {}", job.path, job.sound_id);
                    let result = loader
                        .load(&job.path, &job.options)
                        .and_then(|data| conform(&data, target_sample_rate, target_channels));
                    if let Err(e) = &result {
                        log::warn!("Failed to load {}: {}", job.path, e);
                    }
                    let message = DecodeResult {
                        sound_id: job.sound_id,
                        result,
                    };
                    if result_sender.send(message).is_err() {
                        break;
                    }
                }
                log::debug!("Decode thread exiting");
            })
            .map_err(|e| PetalSfxError::Engine(format!("Failed to spawn decode thread: {}", e)))?;

        Ok(Self { jobs, results })
    }

    pub fn submit(&self, job: DecodeJob) -> Result<()> {
        self.jobs
            .send(job)
            .map_err(|e| PetalSfxError::Engine(format!("Decode thread is gone: {}", e)))
    }

    /// Results finished since the last call; never blocks.
    pub fn completed(&self) -> crossbeam_channel::TryIter<'_, DecodeResult> {
        self.results.try_iter()
    }
}

/// Brings decoded audio to the engine sample rate and folds it down to at most the output
/// channel count. Empty audio is rejected: a voice started on it would never finish playing.
pub(crate) fn conform(
    data: &PetalSfxAudioData,
    sample_rate: u32,
    channels: u16,
) -> Result<PetalSfxAudioData> {
    if data.is_empty() {
        return Err(PetalSfxError::Configuration(
            "Audio data contains no samples".to_string(),
        ));
    }

    let data = data.downmix(channels)?;
    if data.sample_rate() == sample_rate {
        Ok(data)
    } else {
        log::debug!(
            "Resampling {} Hz -> {} Hz",
            data.sample_rate(),
            sample_rate
        );
        data.resample(sample_rate)
    }
}
