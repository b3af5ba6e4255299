//! Test doubles: a backend that records what it was asked to do, and loaders whose
//! completion the test controls.

use crate::audio_data::{AudioDataLoader, LoadOptions, PetalSfxAudioData};
use crate::backend::{AudioBackend, BackendEvent, VoiceParams};
use crate::error::{PetalSfxError, Result};
use crate::music::MusicSessionId;
use crate::voice_pool::VoiceGrant;
use crossbeam_channel::{Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Start,
    Stop,
    RenderVoice {
        grant: VoiceGrant,
        params: VoiceParams,
    },
    PlayMusic {
        session: MusicSessionId,
        track: PathBuf,
        volume: f32,
        repeat: bool,
    },
    StopMusic,
    SetMusicVolume(f32),
    SetMixerOutputVolume(f32),
}

#[derive(Default)]
struct RecorderState {
    calls: Vec<BackendCall>,
    pending_events: Vec<BackendEvent>,
    secondary_audio_silenced: bool,
    fail_start: bool,
    fail_stop: bool,
}

/// Shared view of a [`RecordingBackend`] kept by the test after the backend moved into an engine.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<RecorderState>>);

impl Recorder {
    pub fn calls(&self) -> Vec<BackendCall> {
        self.0.lock().unwrap().calls.clone()
    }

    pub fn rendered_voices(&self) -> Vec<(VoiceGrant, VoiceParams)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::RenderVoice { grant, params } => Some((grant, params)),
                _ => None,
            })
            .collect()
    }

    pub fn last_music_volume(&self) -> Option<f32> {
        self.calls().into_iter().rev().find_map(|call| match call {
            BackendCall::SetMusicVolume(volume) => Some(volume),
            _ => None,
        })
    }

    pub fn push_event(&self, event: BackendEvent) {
        self.0.lock().unwrap().pending_events.push(event);
    }

    pub fn set_secondary_audio_silenced(&self, silenced: bool) {
        self.0.lock().unwrap().secondary_audio_silenced = silenced;
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.0.lock().unwrap().fail_start = fail;
    }

    pub fn set_fail_stop(&self, fail: bool) {
        self.0.lock().unwrap().fail_stop = fail;
    }
}

pub struct RecordingBackend {
    recorder: Recorder,
}

impl RecordingBackend {
    pub fn new() -> (Self, Recorder) {
        let recorder = Recorder::default();
        (
            Self {
                recorder: recorder.clone(),
            },
            recorder,
        )
    }

    fn record(&self, call: BackendCall) {
        self.recorder.0.lock().unwrap().calls.push(call);
    }
}

impl AudioBackend for RecordingBackend {
    fn start(&mut self) -> Result<()> {
        self.record(BackendCall::Start);
        if self.recorder.0.lock().unwrap().fail_start {
            return Err(PetalSfxError::BackendStart("no output device".to_string()));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.record(BackendCall::Stop);
        if self.recorder.0.lock().unwrap().fail_stop {
            return Err(PetalSfxError::AudioDevice("stream already gone".to_string()));
        }
        Ok(())
    }

    fn render_voice(&mut self, grant: VoiceGrant, _data: &PetalSfxAudioData, params: VoiceParams) {
        self.record(BackendCall::RenderVoice { grant, params });
    }

    fn play_music(&mut self, session: MusicSessionId, track: &Path, volume: f32, repeat: bool) {
        self.record(BackendCall::PlayMusic {
            session,
            track: track.to_path_buf(),
            volume,
            repeat,
        });
    }

    fn stop_music(&mut self) {
        self.record(BackendCall::StopMusic);
    }

    fn set_music_volume(&mut self, volume: f32) {
        self.record(BackendCall::SetMusicVolume(volume));
    }

    fn set_mixer_output_volume(&mut self, volume: f32) {
        self.record(BackendCall::SetMixerOutputVolume(volume));
    }

    fn is_secondary_audio_silenced(&self) -> bool {
        self.recorder.0.lock().unwrap().secondary_audio_silenced
    }

    fn poll_events(&mut self) -> Vec<BackendEvent> {
        std::mem::take(&mut self.recorder.0.lock().unwrap().pending_events)
    }
}

pub fn short_tone(sample_rate: u32) -> PetalSfxAudioData {
    PetalSfxAudioData::from_samples(vec![0.25; 480], sample_rate, 1).unwrap()
}

/// Loader that produces a short tone at a fixed rate. Paths containing "bad" fail and paths
/// containing "empty" decode to no samples.
pub struct ToneLoader {
    pub sample_rate: u32,
}

impl AudioDataLoader for ToneLoader {
    fn load(&self, path: &str, _options: &LoadOptions) -> Result<Arc<PetalSfxAudioData>> {
        if path.contains("bad") {
            return Err(PetalSfxError::AudioLoading(format!("{} is corrupt", path)));
        }
        if path.contains("empty") {
            return Ok(Arc::new(PetalSfxAudioData::from_samples(
                Vec::new(),
                self.sample_rate,
                1,
            )?));
        }
        Ok(Arc::new(short_tone(self.sample_rate)))
    }
}

/// Loader that blocks each load until the test releases it through the returned sender.
pub struct GatedLoader {
    gate: Receiver<()>,
    sample_rate: u32,
}

impl GatedLoader {
    pub fn new(sample_rate: u32) -> (Self, Sender<()>) {
        let (open, gate) = crossbeam_channel::unbounded();
        (Self { gate, sample_rate }, open)
    }
}

impl AudioDataLoader for GatedLoader {
    fn load(&self, path: &str, _options: &LoadOptions) -> Result<Arc<PetalSfxAudioData>> {
        self.gate
            .recv()
            .map_err(|_| PetalSfxError::Engine("gate closed".to_string()))?;
        if path.contains("bad") {
            return Err(PetalSfxError::AudioLoading(format!("{} is corrupt", path)));
        }
        Ok(Arc::new(short_tone(self.sample_rate)))
    }
}
