//! Event types for PetalSfx

use crate::sound::SoundId;
use std::path::PathBuf;

/// Notifications collected by the engine and drained with
/// [`PetalSfxEngine::poll_events`](crate::PetalSfxEngine::poll_events).
#[derive(Debug, Clone, PartialEq)]
pub enum PetalSfxEvent {
    SoundLoaded {
        sound_id: SoundId,
    },
    SoundLoadFailed {
        sound_id: SoundId,
        error: String,
    },
    /// Every voice was busy; the play was dropped
    VoicePoolExhausted {
        sound_id: SoundId,
        voice_count: usize,
    },
    MusicStarted {
        track: PathBuf,
    },
    /// A random playlist finished a track and moved on to `next_track`
    MusicLooped {
        next_track: PathBuf,
    },
    MusicFadeStarted,
    MusicStopped,
    MusicFailed {
        track: PathBuf,
    },
    EngineStarted,
    EngineStopped,
    EngineError {
        error: String,
    },
}

impl PetalSfxEvent {
    pub fn sound_id(&self) -> Option<SoundId> {
        match self {
            Self::SoundLoaded { sound_id }
            | Self::SoundLoadFailed { sound_id, .. }
            | Self::VoicePoolExhausted { sound_id, .. } => Some(*sound_id),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::SoundLoadFailed { .. } | Self::MusicFailed { .. } | Self::EngineError { .. }
        )
    }

    pub fn is_music_event(&self) -> bool {
        matches!(
            self,
            Self::MusicStarted { .. }
                | Self::MusicLooped { .. }
                | Self::MusicFadeStarted
                | Self::MusicStopped
                | Self::MusicFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_classification() {
        let exhausted = PetalSfxEvent::VoicePoolExhausted {
            sound_id: SoundId(3),
            voice_count: 20,
        };
        assert_eq!(exhausted.sound_id(), Some(SoundId(3)));
        assert!(!exhausted.is_error());
        assert!(!exhausted.is_music_event());

        let failed = PetalSfxEvent::SoundLoadFailed {
            sound_id: SoundId(1),
            error: "corrupt".to_string(),
        };
        assert_eq!(failed.sound_id(), Some(SoundId(1)));
        assert!(failed.is_error());

        let music_failed = PetalSfxEvent::MusicFailed {
            track: "theme.ogg".into(),
        };
        assert!(music_failed.is_music_event());
        assert!(music_failed.is_error());
        assert_eq!(music_failed.sound_id(), None);

        assert!(PetalSfxEvent::MusicFadeStarted.is_music_event());
        assert!(!PetalSfxEvent::EngineStarted.is_music_event());
    }
}
