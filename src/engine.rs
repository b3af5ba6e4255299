use crate::audio_data::{AudioDataLoader, DefaultAudioLoader, LoadOptions, PetalSfxAudioData};
use crate::backend::{AudioBackend, BackendEvent, CpalBackend};
use crate::config::{PetalSfxDesc, validate_volume};
use crate::decode_worker::{DecodeJob, DecodeWorker, conform};
use crate::error::{PetalSfxError, Result};
use crate::events::PetalSfxEvent;
use crate::music::{MusicController, MusicState};
use crate::random::make_rng;
use crate::sound::{PlayRequest, PreloadedSound, SoundConfig, SoundEffect, SoundId, SoundState};
use crate::variant_group::{GroupId, VariantGroup};
use crate::voice_pool::{VoiceGrant, VoicePool};
use rand::rngs::SmallRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What became of a play request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The sound is rendering on this voice
    Started(VoiceGrant),
    /// The sound is still loading; it plays once loading completes
    Deferred,
    /// Every voice was busy; the play was dropped
    Exhausted,
    /// Nothing plays: unknown or failed sound, or the engine is not running
    Ignored,
}

impl PlayOutcome {
    pub fn grant(&self) -> Option<VoiceGrant> {
        match self {
            Self::Started(grant) => Some(*grant),
            _ => None,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

/// The sound-effect and music engine.
///
/// `PetalSfxEngine` is the single owner of the voice pool, the loaded sounds, the variant
/// groups and the music channel. Everything is mutated through `&mut self` on the thread that
/// drives the engine; call [`tick`](Self::tick) (or [`update`](Self::update)) once per frame.
///
/// # Architecture
///
/// - **Caller thread**: owns the engine, triggers sounds, drives music and ticks
/// - **Decode thread**: decodes and resamples files, hands results back over a channel
/// - **Backend**: renders granted voices and music, reports completions back
pub struct PetalSfxEngine {
    desc: PetalSfxDesc,
    backend: Box<dyn AudioBackend>,
    pool: VoicePool,
    sounds: Vec<SoundEffect>,
    groups: Vec<VariantGroup>,
    music: MusicController,
    rng: SmallRng,
    decoder: DecodeWorker,
    load_options: LoadOptions,
    sfx_master_volume: f32,
    is_running: bool,
    last_update: Option<Instant>,
    events: Vec<PetalSfxEvent>,
}

impl PetalSfxEngine {
    /// Creates an engine rendering through `backend`, decoding files with Symphonia.
    pub fn new<B: AudioBackend + 'static>(desc: PetalSfxDesc, backend: B) -> Result<Self> {
        Self::with_loader(desc, backend, DefaultAudioLoader)
    }

    /// Creates an engine that plays on the default output device.
    pub fn with_default_output(desc: PetalSfxDesc) -> Result<Self> {
        let backend = CpalBackend::new(&desc)?;
        Self::new(desc, backend)
    }

    /// Creates an engine with a custom loader for sound files.
    pub fn with_loader<B, L>(desc: PetalSfxDesc, backend: B, loader: L) -> Result<Self>
    where
        B: AudioBackend + 'static,
        L: AudioDataLoader + 'static,
    {
        desc.validate()?;

        let decoder = DecodeWorker::spawn(Arc::new(loader), desc.sample_rate, desc.channels)?;
        let pool = VoicePool::new(desc.voice_count)?;
        let music = MusicController::new(desc.music_volume, desc.fade_duration);

        log::info!(
            "PetalSfx engine created: {} voices, {} Hz, {} channels",
            desc.voice_count,
            desc.sample_rate,
            desc.channels
        );

        Ok(Self {
            rng: make_rng(desc.rng_seed),
            sfx_master_volume: desc.sfx_master_volume,
            desc,
            backend: Box::new(backend),
            pool,
            sounds: Vec::new(),
            groups: Vec::new(),
            music,
            decoder,
            load_options: LoadOptions::default(),
            is_running: false,
            last_update: None,
            events: Vec::new(),
        })
    }

    /// Options used for files loaded after this call.
    pub fn set_load_options(&mut self, options: LoadOptions) {
        self.load_options = options;
    }

    /// Starts the backend. On failure the engine stays inert and `start` may be retried.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running {
            return Ok(());
        }

        if let Err(e) = self.backend.start() {
            log::error!("Audio backend failed to start: {}", e);
            self.events.push(PetalSfxEvent::EngineError {
                error: e.to_string(),
            });
            return Err(e);
        }

        self.backend.set_mixer_output_volume(self.sfx_master_volume);
        self.is_running = true;
        self.last_update = None;
        self.events.push(PetalSfxEvent::EngineStarted);
        log::info!("PetalSfx engine started");
        Ok(())
    }

    /// Stops all sound and the backend. Every voice is free afterwards, and the engine is
    /// stopped even when the backend reports an error.
    pub fn stop(&mut self) -> Result<()> {
        if !self.is_running {
            return Ok(());
        }

        self.music.stop(self.backend.as_mut(), false);
        let stopped = self.backend.stop();
        self.pool.release_all();
        self.is_running = false;
        self.events.push(PetalSfxEvent::EngineStopped);

        if let Err(e) = &stopped {
            log::error!("Audio backend failed to stop cleanly: {}", e);
            self.events.push(PetalSfxEvent::EngineError {
                error: e.to_string(),
            });
        } else {
            log::info!("PetalSfx engine stopped");
        }
        stopped
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn desc(&self) -> &PetalSfxDesc {
        &self.desc
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    pub fn music(&self) -> &MusicController {
        &self.music
    }

    /// Registers a sound effect and queues its file for decoding.
    ///
    /// The returned id is usable right away: plays requested before decoding finishes are
    /// latched and fire once the sound is ready.
    pub fn load_sound<P: AsRef<Path>>(&mut self, path: P, config: SoundConfig) -> Result<SoundId> {
        config.validate()?;

        let sound_id = SoundId(self.sounds.len());
        let path = path.as_ref().to_string_lossy().into_owned();
        self.sounds.push(SoundEffect::loading(config));

        let job = DecodeJob {
            sound_id,
            path,
            options: self.load_options.clone(),
        };
        if let Err(e) = self.decoder.submit(job) {
            self.sounds[sound_id.0] = SoundEffect::Failed(e.to_string());
            return Err(e);
        }

        log::debug!("Queued {} for decoding", sound_id);
        Ok(sound_id)
    }

    /// Registers already-decoded audio. The sound is ready immediately; audio at a different
    /// sample rate or with more channels than the output is converted on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for an invalid config or for audio without any samples.
    pub fn load_sound_from_data(
        &mut self,
        data: &PetalSfxAudioData,
        config: SoundConfig,
    ) -> Result<SoundId> {
        config.validate()?;
        let data = conform(data, self.desc.sample_rate, self.desc.channels)?;

        let sound_id = SoundId(self.sounds.len());
        self.sounds
            .push(SoundEffect::Ready(PreloadedSound::new(data, config)));
        Ok(sound_id)
    }

    /// Drops a sound's audio. Later plays of `sound_id` are ignored.
    pub fn unload_sound(&mut self, sound_id: SoundId) -> bool {
        match self.sounds.get_mut(sound_id.0) {
            Some(sound) if sound.state() != SoundState::Unloaded => {
                *sound = SoundEffect::Unloaded;
                true
            }
            _ => false,
        }
    }

    pub fn sound_state(&self, sound_id: SoundId) -> Option<SoundState> {
        self.sounds.get(sound_id.0).map(SoundEffect::state)
    }

    pub fn preloaded_sound(&self, sound_id: SoundId) -> Option<&PreloadedSound> {
        match self.sounds.get(sound_id.0) {
            Some(SoundEffect::Ready(sound)) => Some(sound),
            _ => None,
        }
    }

    /// Why a sound failed to load, if it did.
    pub fn load_error(&self, sound_id: SoundId) -> Option<&str> {
        self.sounds.get(sound_id.0).and_then(SoundEffect::failure)
    }

    /// Triggers a sound effect with freshly randomized volume and pitch.
    pub fn play(&mut self, sound_id: SoundId) -> PlayOutcome {
        if !self.is_running {
            log::debug!("Engine not running, ignoring play of {}", sound_id);
            return PlayOutcome::Ignored;
        }

        let Some(sound) = self.sounds.get_mut(sound_id.0) else {
            log::warn!("Play requested for unknown {}", sound_id);
            return PlayOutcome::Ignored;
        };

        let sound = match sound.request_play() {
            PlayRequest::Now(sound) => sound,
            PlayRequest::Deferred => {
                log::debug!("{} still loading, play latched", sound_id);
                return PlayOutcome::Deferred;
            }
            PlayRequest::Ignored => return PlayOutcome::Ignored,
        };

        let params = sound.derive_params(&mut self.rng);
        match self.pool.acquire(params.volume, params.pitch_offset_cents) {
            Ok(grant) => {
                self.backend.render_voice(grant, sound.data(), params);
                PlayOutcome::Started(grant)
            }
            Err(PetalSfxError::PoolExhausted { voice_count }) => {
                log::warn!(
                    "All {} voices busy, dropping play of {}",
                    voice_count,
                    sound_id
                );
                self.events.push(PetalSfxEvent::VoicePoolExhausted {
                    sound_id,
                    voice_count,
                });
                PlayOutcome::Exhausted
            }
            Err(e) => {
                log::error!("Voice acquisition failed for {}: {}", sound_id, e);
                PlayOutcome::Ignored
            }
        }
    }

    /// Groups interchangeable sounds; see [`play_group`](Self::play_group).
    pub fn create_group(&mut self, members: Vec<SoundId>) -> Result<GroupId> {
        if let Some(unknown) = members.iter().find(|id| id.0 >= self.sounds.len()) {
            return Err(PetalSfxError::Configuration(format!(
                "Group member {} is not a registered sound",
                unknown
            )));
        }

        let group_id = GroupId(self.groups.len());
        self.groups.push(VariantGroup::new(members)?);
        Ok(group_id)
    }

    pub fn group(&self, group_id: GroupId) -> Option<&VariantGroup> {
        self.groups.get(group_id.0)
    }

    /// Plays one member of the group, picked uniformly at random.
    pub fn play_group(&mut self, group_id: GroupId) -> PlayOutcome {
        let Some(group) = self.groups.get(group_id.0) else {
            log::warn!("Play requested for unknown {}", group_id);
            return PlayOutcome::Ignored;
        };
        let member = group.pick(&mut self.rng);
        self.play(member)
    }

    /// Plays `track` as background music, replacing (and un-fading) whatever is playing.
    pub fn play_music<P: Into<PathBuf>>(&mut self, track: P, looping: bool) {
        if !self.is_running {
            log::debug!("Engine not running, ignoring music request");
            return;
        }
        self.music.play(self.backend.as_mut(), track.into(), looping);
        self.collect_music_events();
    }

    /// Plays a random track from `tracks`; with `looping`, a new random track follows each one.
    pub fn play_random_music<P: Into<PathBuf>>(&mut self, tracks: Vec<P>, looping: bool) -> Result<()> {
        if !self.is_running {
            log::debug!("Engine not running, ignoring music request");
            return Ok(());
        }
        let tracks = tracks.into_iter().map(Into::into).collect();
        let result = self
            .music
            .play_random(self.backend.as_mut(), &mut self.rng, tracks, looping);
        self.collect_music_events();
        result
    }

    pub fn stop_music(&mut self, fade_out: bool) {
        self.music.stop(self.backend.as_mut(), fade_out);
        self.collect_music_events();
    }

    pub fn music_state(&self) -> MusicState {
        self.music.state()
    }

    pub fn music_volume(&self) -> f32 {
        self.music.master_volume()
    }

    pub fn set_music_volume(&mut self, volume: f32) -> Result<()> {
        validate_volume("music_volume", volume)?;
        self.music.set_master_volume(self.backend.as_mut(), volume);
        Ok(())
    }

    pub fn sfx_master_volume(&self) -> f32 {
        self.sfx_master_volume
    }

    pub fn set_sfx_master_volume(&mut self, volume: f32) -> Result<()> {
        validate_volume("sfx_master_volume", volume)?;
        self.sfx_master_volume = volume;
        self.backend.set_mixer_output_volume(volume);
        Ok(())
    }

    /// Services the engine: frees finished voices, applies finished decodes (firing latched
    /// plays), reacts to music completions and advances the music fade by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        for event in self.backend.poll_events() {
            match event {
                BackendEvent::VoiceFinished(grant) => self.pool.release(grant),
                BackendEvent::MusicFinished(session) => {
                    self.music
                        .handle_finished(self.backend.as_mut(), &mut self.rng, session)
                }
                BackendEvent::MusicFailed(session) => {
                    self.music.handle_failed(self.backend.as_mut(), session)
                }
            }
        }

        let completed: Vec<_> = self.decoder.completed().collect();
        for done in completed {
            self.apply_decode_result(done.sound_id, done.result);
        }

        self.music.tick(self.backend.as_mut(), dt);
        self.collect_music_events();
    }

    /// [`tick`](Self::tick) with `dt` measured from the previous update.
    pub fn update(&mut self) {
        let now = Instant::now();
        let dt = self
            .last_update
            .map(|last| now.duration_since(last))
            .unwrap_or_default();
        self.last_update = Some(now);
        self.tick(dt);
    }

    /// Drains the events collected since the last call.
    pub fn poll_events(&mut self) -> Vec<PetalSfxEvent> {
        self.collect_music_events();
        std::mem::take(&mut self.events)
    }

    fn apply_decode_result(&mut self, sound_id: SoundId, result: Result<PetalSfxAudioData>) {
        let Some(sound) = self.sounds.get_mut(sound_id.0) else {
            return;
        };
        if sound.state() != SoundState::Loading {
            log::debug!("Discarding decode result for {}", sound_id);
            return;
        }

        let error = result.as_ref().err().map(|e| e.to_string());
        let fire_pending = sound.finish_loading(result);

        match error {
            None => {
                log::info!("{} ready", sound_id);
                self.events.push(PetalSfxEvent::SoundLoaded { sound_id });
            }
            Some(error) => {
                self.events
                    .push(PetalSfxEvent::SoundLoadFailed { sound_id, error });
            }
        }

        if fire_pending {
            log::debug!("Firing latched play of {}", sound_id);
            self.play(sound_id);
        }
    }

    fn collect_music_events(&mut self) {
        self.events.extend(self.music.drain_events());
    }
}

impl Drop for PetalSfxEngine {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
