//! Real-time mixing for the cpal backend.
//!
//! The [`Mixer`] lives inside the output callback. It holds one slot per pool voice plus a
//! single music channel and sums them into the interleaved output block. It never allocates
//! while mixing; buffers arrive already decoded and resampled to the output rate.

use crate::audio_data::PetalSfxAudioData;
use crate::backend::{BackendEvent, VoiceParams};
use crate::math::cents_to_playback_rate;
use crate::music::MusicSessionId;
use crate::voice_pool::VoiceGrant;

/// Instructions sent from the engine thread to the output callback.
#[derive(Debug)]
pub(crate) enum MixerCommand {
    StartVoice {
        grant: VoiceGrant,
        data: PetalSfxAudioData,
        params: VoiceParams,
    },
    StartMusic {
        session: MusicSessionId,
        data: PetalSfxAudioData,
        repeat: bool,
    },
    StopMusic,
    SetMusicVolume(f32),
    SetMasterVolume(f32),
}

#[derive(Debug)]
struct ActiveVoice {
    grant: VoiceGrant,
    data: PetalSfxAudioData,
    gain: f32,
    /// Source frames advanced per output frame
    rate: f64,
    position: f64,
}

impl ActiveVoice {
    /// Mixes into `buffer`; returns true once the buffer has played to its end.
    fn render(&mut self, buffer: &mut [f32], channels: usize, master: f32) -> bool {
        let total_frames = self.data.total_frames();
        let gain = self.gain * master;

        for frame in buffer.chunks_exact_mut(channels) {
            let index = self.position as usize;
            if index >= total_frames {
                return true;
            }

            let frac = (self.position - index as f64) as f32;
            let next = (index + 1).min(total_frames - 1);
            for (channel, out) in frame.iter_mut().enumerate() {
                let a = self.data.sample(index, channel);
                let b = self.data.sample(next, channel);
                *out += (a + (b - a) * frac) * gain;
            }
            self.position += self.rate;
        }

        self.position as usize >= total_frames
    }
}

#[derive(Debug)]
struct ActiveMusic {
    session: MusicSessionId,
    data: PetalSfxAudioData,
    repeat: bool,
    position: usize,
}

#[derive(Debug)]
pub(crate) struct Mixer {
    voices: Vec<Option<ActiveVoice>>,
    /// Grants started with nothing to play; reported on the next `mix`
    finished_at_start: Vec<VoiceGrant>,
    music: Option<ActiveMusic>,
    music_volume: f32,
    master_volume: f32,
}

impl Mixer {
    pub fn new(voice_count: usize, master_volume: f32) -> Self {
        let mut voices = Vec::with_capacity(voice_count);
        voices.resize_with(voice_count, || None);
        Self {
            voices,
            finished_at_start: Vec::with_capacity(voice_count),
            music: None,
            music_volume: 0.0,
            master_volume,
        }
    }

    pub fn apply(&mut self, command: MixerCommand) {
        match command {
            MixerCommand::StartVoice {
                grant,
                data,
                params,
            } => {
                let Some(slot) = self.voices.get_mut(grant.index()) else {
                    return;
                };
                if data.is_empty() {
                    *slot = None;
                    self.finished_at_start.push(grant);
                    return;
                }
                *slot = Some(ActiveVoice {
                    grant,
                    data,
                    gain: params.volume,
                    rate: cents_to_playback_rate(params.pitch_offset_cents),
                    position: 0.0,
                });
            }
            MixerCommand::StartMusic {
                session,
                data,
                repeat,
            } => {
                self.music = Some(ActiveMusic {
                    session,
                    data,
                    repeat,
                    position: 0,
                });
            }
            MixerCommand::StopMusic => self.music = None,
            MixerCommand::SetMusicVolume(volume) => self.music_volume = volume,
            MixerCommand::SetMasterVolume(volume) => self.master_volume = volume,
        }
    }

    #[cfg(test)]
    fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_some()).count()
    }

    #[cfg(test)]
    fn music_session(&self) -> Option<MusicSessionId> {
        self.music.as_ref().map(|m| m.session)
    }

    /// Mixes one interleaved block into `buffer` (which the caller zeroes) and reports every
    /// voice or music track that finished during it.
    pub fn mix<F>(&mut self, buffer: &mut [f32], channels: u16, mut on_event: F)
    where
        F: FnMut(BackendEvent),
    {
        let channels = channels.max(1) as usize;

        for grant in self.finished_at_start.drain(..) {
            on_event(BackendEvent::VoiceFinished(grant));
        }

        for slot in self.voices.iter_mut() {
            let Some(voice) = slot else {
                continue;
            };
            if voice.render(buffer, channels, self.master_volume) {
                on_event(BackendEvent::VoiceFinished(voice.grant));
                *slot = None;
            }
        }

        if let Some(music) = self.music.as_mut() {
            if Self::render_music(music, buffer, channels, self.music_volume) {
                on_event(BackendEvent::MusicFinished(music.session));
                self.music = None;
            }
        }
    }

    fn render_music(
        music: &mut ActiveMusic,
        buffer: &mut [f32],
        channels: usize,
        volume: f32,
    ) -> bool {
        let total_frames = music.data.total_frames();
        if total_frames == 0 {
            return true;
        }

        for frame in buffer.chunks_exact_mut(channels) {
            if music.position >= total_frames {
                if !music.repeat {
                    return true;
                }
                music.position = 0;
            }
            for (channel, out) in frame.iter_mut().enumerate() {
                *out += music.data.sample(music.position, channel) * volume;
            }
            music.position += 1;
        }

        !music.repeat && music.position >= total_frames
    }
}
