use super::{AudioBackend, BackendEvent, VoiceParams};
use crate::audio_data::{AudioDataLoader, DefaultAudioLoader, LoadOptions, PetalSfxAudioData};
use crate::config::PetalSfxDesc;
use crate::decode_worker::conform;
use crate::error::{PetalSfxError, Result};
use crate::mixer::{Mixer, MixerCommand};
use crate::music::MusicSessionId;
use crate::voice_pool::VoiceGrant;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use crossbeam_channel::{Receiver, Sender};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;

/// Completion events beyond one per voice that may be in flight (music finishing).
const EVENT_HEADROOM: usize = 8;

/// Backend that renders through the default cpal output device.
///
/// The output callback owns a [`Mixer`]. Commands reach it over a `crossbeam_channel`;
/// finished voices and tracks come back over a `ringbuf` SPSC ring that the engine drains in
/// `poll_events`. A voice can only finish once per grant and is not re-granted before its
/// completion is drained, so the ring never holds more than `voice_count` voice events.
pub struct CpalBackend {
    desc: PetalSfxDesc,
    stream: Option<cpal::Stream>,
    commands: Sender<MixerCommand>,
    command_receiver: Receiver<MixerCommand>,
    events: Option<HeapCons<BackendEvent>>,
    music_failures: Receiver<BackendEvent>,
    music_failure_sender: Sender<BackendEvent>,
    /// Session the engine currently wants audible; 0 when music is stopped
    wanted_music: Arc<AtomicU64>,
    /// Events the callback could not fit in the ring
    dropped_events: Arc<AtomicUsize>,
    loader: Arc<dyn AudioDataLoader>,
    master_volume: f32,
}

impl CpalBackend {
    pub fn new(desc: &PetalSfxDesc) -> Result<Self> {
        Self::with_loader(desc, DefaultAudioLoader)
    }

    /// Uses `loader` for music tracks.
    pub fn with_loader<L: AudioDataLoader + 'static>(desc: &PetalSfxDesc, loader: L) -> Result<Self> {
        desc.validate()?;
        let (commands, command_receiver) = crossbeam_channel::unbounded();
        let (music_failure_sender, music_failures) = crossbeam_channel::unbounded();

        Ok(Self {
            desc: desc.clone(),
            stream: None,
            commands,
            command_receiver,
            events: None,
            music_failures,
            music_failure_sender,
            wanted_music: Arc::new(AtomicU64::new(0)),
            dropped_events: Arc::new(AtomicUsize::new(0)),
            loader: Arc::new(loader),
            master_volume: desc.sfx_master_volume,
        })
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    fn send(&self, command: MixerCommand) {
        if self.commands.send(command).is_err() {
            log::error!("Mixer command queue disconnected");
        }
    }

    fn open_stream(&mut self) -> Result<(cpal::Stream, HeapCons<BackendEvent>)> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            PetalSfxError::AudioDevice("No default output device available".into())
        })?;

        let config = cpal::StreamConfig {
            channels: self.desc.channels,
            sample_rate: cpal::SampleRate(self.desc.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(self.desc.block_size as u32),
        };

        let default_config = device.default_output_config().map_err(|e| {
            PetalSfxError::AudioDevice(format!("Failed to get default config: {}", e))
        })?;

        let ring = HeapRb::<BackendEvent>::new(self.desc.voice_count + EVENT_HEADROOM);
        let (producer, consumer) = ring.split();
        let render = RenderState::new(
            Mixer::new(self.desc.voice_count, self.master_volume),
            self.command_receiver.clone(),
            producer,
            self.wanted_music.clone(),
            self.dropped_events.clone(),
            &self.desc,
        );

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => create_stream::<f32>(&device, &config, render)?,
            cpal::SampleFormat::I16 => create_stream::<i16>(&device, &config, render)?,
            cpal::SampleFormat::U16 => create_stream::<u16>(&device, &config, render)?,
            other => {
                return Err(PetalSfxError::AudioFormat(format!(
                    "Unsupported sample format {:?}",
                    other
                )));
            }
        };

        stream
            .play()
            .map_err(|e| PetalSfxError::AudioDevice(format!("Failed to start stream: {}", e)))?;

        Ok((stream, consumer))
    }
}

impl AudioBackend for CpalBackend {
    fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        // Commands queued while stopped target voices that no longer exist.
        self.command_receiver.try_iter().for_each(drop);

        let (stream, consumer) = self
            .open_stream()
            .map_err(|e| PetalSfxError::BackendStart(e.to_string()))?;
        self.stream = Some(stream);
        self.events = Some(consumer);

        log::info!(
            "Output stream running: {} Hz, {} channels, block {}",
            self.desc.sample_rate,
            self.desc.channels,
            self.desc.block_size
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.wanted_music.store(0, Ordering::Release);
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log::info!("Output stream stopped");
        }
        self.events = None;
        Ok(())
    }

    fn render_voice(&mut self, grant: VoiceGrant, data: &PetalSfxAudioData, params: VoiceParams) {
        self.send(MixerCommand::StartVoice {
            grant,
            data: data.clone(),
            params,
        });
    }

    fn play_music(&mut self, session: MusicSessionId, track: &Path, volume: f32, repeat: bool) {
        self.wanted_music.store(session.0, Ordering::Release);
        self.send(MixerCommand::StopMusic);
        self.send(MixerCommand::SetMusicVolume(volume));

        let loader = self.loader.clone();
        let commands = self.commands.clone();
        let failures = self.music_failure_sender.clone();
        let wanted_music = self.wanted_music.clone();
        let sample_rate = self.desc.sample_rate;
        let channels = self.desc.channels;
        let path = track.to_string_lossy().into_owned();

        let spawned = thread::Builder::new()
            .name("petalsfx-music".to_string())
            .spawn(move || {
                let loaded = loader
                    .load(&path, &LoadOptions::default())
                    .and_then(|data| conform(&data, sample_rate, channels));
                if wanted_music.load(Ordering::Acquire) != session.0 {
                    log::debug!("Dropping superseded music load {}", path);
                    return;
                }
                match loaded {
                    Ok(data) => {
                        let _ = commands.send(MixerCommand::StartMusic {
                            session,
                            data,
                            repeat,
                        });
                    }
                    Err(e) => {
                        log::warn!("Failed to load music {}: {}", path, e);
                        let _ = failures.send(BackendEvent::MusicFailed(session));
                    }
                }
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn music loader: {}", e);
            let _ = self
                .music_failure_sender
                .send(BackendEvent::MusicFailed(session));
        }
    }

    fn stop_music(&mut self) {
        self.wanted_music.store(0, Ordering::Release);
        self.send(MixerCommand::StopMusic);
    }

    fn set_music_volume(&mut self, volume: f32) {
        self.send(MixerCommand::SetMusicVolume(volume));
    }

    fn set_mixer_output_volume(&mut self, volume: f32) {
        self.master_volume = volume;
        self.send(MixerCommand::SetMasterVolume(volume));
    }

    fn poll_events(&mut self) -> Vec<BackendEvent> {
        let dropped = self.dropped_events.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            log::error!("Output callback dropped {} completion events", dropped);
        }

        let mut events: Vec<BackendEvent> = self.music_failures.try_iter().collect();
        if let Some(consumer) = self.events.as_mut() {
            events.extend(consumer.pop_iter());
        }
        events
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Everything the output callback owns.
struct RenderState {
    mixer: Mixer,
    commands: Receiver<MixerCommand>,
    events: HeapProd<BackendEvent>,
    wanted_music: Arc<AtomicU64>,
    dropped_events: Arc<AtomicUsize>,
    scratch: Vec<f32>,
    channels: u16,
}

impl RenderState {
    fn new(
        mixer: Mixer,
        commands: Receiver<MixerCommand>,
        events: HeapProd<BackendEvent>,
        wanted_music: Arc<AtomicU64>,
        dropped_events: Arc<AtomicUsize>,
        desc: &PetalSfxDesc,
    ) -> Self {
        Self {
            mixer,
            commands,
            events,
            wanted_music,
            dropped_events,
            scratch: vec![0.0; desc.block_size * desc.channels as usize],
            channels: desc.channels,
        }
    }

    fn render(&mut self, len: usize) -> &[f32] {
        for command in self.commands.try_iter() {
            if let MixerCommand::StartMusic { session, .. } = &command {
                // A stop or newer track may have arrived while this one was loading.
                if self.wanted_music.load(Ordering::Acquire) != session.0 {
                    continue;
                }
            }
            self.mixer.apply(command);
        }

        if self.scratch.len() < len {
            self.scratch.resize(len, 0.0);
        }
        let buffer = &mut self.scratch[..len];
        buffer.fill(0.0);

        let events = &mut self.events;
        let dropped_events = &self.dropped_events;
        self.mixer.mix(buffer, self.channels, |event| {
            if events.try_push(event).is_err() {
                dropped_events.fetch_add(1, Ordering::Relaxed);
            }
        });

        &self.scratch[..len]
    }
}

fn create_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut render: RenderState,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mixed = render.render(data.len());
                for (sample, value) in data.iter_mut().zip(mixed) {
                    *sample = T::from_sample(*value);
                }
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| PetalSfxError::AudioDevice(format!("Failed to build stream: {}", e)))
}
