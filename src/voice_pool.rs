//! Fixed-size pool of sound-effect voices.
//!
//! Voices are handed out round-robin: the search for a free voice starts just after the
//! most recently granted one, so reuse is spread across the whole pool instead of
//! hammering the low indices.

use crate::error::{PetalSfxError, Result};

/// One playback channel.
#[derive(Debug, Clone, Default)]
pub struct Voice {
    busy: bool,
    current_volume: f32,
    current_pitch_offset_cents: f32,
    generation: u64,
}

impl Voice {
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn current_volume(&self) -> f32 {
        self.current_volume
    }

    pub fn current_pitch_offset_cents(&self) -> f32 {
        self.current_pitch_offset_cents
    }
}

/// Proof that a voice was granted to one play.
///
/// The generation ties the grant to that particular play, so releasing a grant after the
/// voice has already been re-granted does nothing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VoiceGrant {
    index: usize,
    generation: u64,
}

impl VoiceGrant {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Display for VoiceGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Voice({}#{})", self.index, self.generation)
    }
}

#[derive(Debug)]
pub struct VoicePool {
    voices: Vec<Voice>,
    next_search_index: usize,
}

impl VoicePool {
    pub fn new(voice_count: usize) -> Result<Self> {
        if voice_count == 0 {
            return Err(PetalSfxError::Configuration(
                "Voice pool needs at least one voice".to_string(),
            ));
        }
        Ok(Self {
            voices: vec![Voice::default(); voice_count],
            next_search_index: 0,
        })
    }

    /// Grants the next free voice in round-robin order.
    ///
    /// Inspects at most `voice_count` voices. When all of them are busy the play is dropped
    /// and [`PetalSfxError::PoolExhausted`] is returned; the search cursor stays put.
    pub fn acquire(&mut self, volume: f32, pitch_offset_cents: f32) -> Result<VoiceGrant> {
        let voice_count = self.voices.len();

        for offset in 0..voice_count {
            let index = (self.next_search_index + offset) % voice_count;
            let voice = &mut self.voices[index];
            if voice.busy {
                continue;
            }

            voice.busy = true;
            voice.current_volume = volume;
            voice.current_pitch_offset_cents = pitch_offset_cents;
            voice.generation = voice.generation.wrapping_add(1);
            self.next_search_index = (index + 1) % voice_count;

            log::debug!(
                "Granted voice {} (volume {:.3}, pitch {:+.1} cents)",
                index,
                volume,
                pitch_offset_cents
            );

            return Ok(VoiceGrant {
                index,
                generation: voice.generation,
            });
        }

        Err(PetalSfxError::PoolExhausted { voice_count })
    }

    /// Frees the voice behind `grant`. Releasing twice, or releasing a stale grant, is a no-op.
    pub fn release(&mut self, grant: VoiceGrant) {
        let Some(voice) = self.voices.get_mut(grant.index) else {
            return;
        };
        if voice.busy && voice.generation == grant.generation {
            voice.busy = false;
            log::debug!("Released voice {}", grant.index);
        }
    }

    /// Frees every voice, e.g. after the backend dropped all playing buffers.
    pub fn release_all(&mut self) {
        for voice in &mut self.voices {
            voice.busy = false;
        }
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn busy_count(&self) -> usize {
        self.voices.iter().filter(|v| v.busy).count()
    }

    pub fn free_count(&self) -> usize {
        self.voice_count() - self.busy_count()
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    pub fn is_busy(&self, index: usize) -> bool {
        self.voices.get(index).is_some_and(|v| v.busy)
    }

    /// Where the next search will start.
    pub fn next_search_index(&self) -> usize {
        self.next_search_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_n_acquires_then_exhausted() {
        for n in [1, 2, 5, 20] {
            let mut pool = VoicePool::new(n).unwrap();
            for _ in 0..n {
                assert!(pool.acquire(1.0, 0.0).is_ok());
            }
            assert_eq!(pool.busy_count(), n);
            match pool.acquire(1.0, 0.0) {
                Err(PetalSfxError::PoolExhausted { voice_count }) => assert_eq!(voice_count, n),
                other => panic!("expected exhaustion, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_zero_voices_rejected() {
        assert!(VoicePool::new(0).is_err());
    }

    #[test]
    fn test_round_robin_does_not_reuse_released_voice() {
        let mut pool = VoicePool::new(4).unwrap();
        let first = pool.acquire(1.0, 0.0).unwrap();
        assert_eq!(first.index(), 0);
        pool.release(first);

        // Voice 0 is free again, but the cursor has moved on.
        let order: Vec<usize> = (0..4)
            .map(|_| {
                let grant = pool.acquire(1.0, 0.0).unwrap();
                pool.release(grant);
                grant.index()
            })
            .collect();
        assert_eq!(order, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_search_skips_busy_voices_and_wraps() {
        let mut pool = VoicePool::new(3).unwrap();
        let a = pool.acquire(1.0, 0.0).unwrap();
        let b = pool.acquire(1.0, 0.0).unwrap();
        let c = pool.acquire(1.0, 0.0).unwrap();
        assert_eq!((a.index(), b.index(), c.index()), (0, 1, 2));

        pool.release(b);
        // Cursor is back at 0, which is busy; the scan wraps to find 1.
        let d = pool.acquire(0.5, 10.0).unwrap();
        assert_eq!(d.index(), 1);
        assert_eq!(pool.next_search_index(), 2);

        let voice = pool.voice(1).unwrap();
        assert_eq!(voice.current_volume(), 0.5);
        assert_eq!(voice.current_pitch_offset_cents(), 10.0);
    }

    #[test]
    fn test_exhaustion_leaves_cursor_untouched() {
        let mut pool = VoicePool::new(2).unwrap();
        pool.acquire(1.0, 0.0).unwrap();
        pool.acquire(1.0, 0.0).unwrap();
        let cursor = pool.next_search_index();
        assert!(pool.acquire(1.0, 0.0).is_err());
        assert_eq!(pool.next_search_index(), cursor);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut pool = VoicePool::new(2).unwrap();
        let grant = pool.acquire(1.0, 0.0).unwrap();
        pool.release(grant);
        pool.release(grant);
        assert_eq!(pool.busy_count(), 0);
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn test_stale_grant_does_not_free_regranted_voice() {
        let mut pool = VoicePool::new(1).unwrap();
        let old = pool.acquire(1.0, 0.0).unwrap();
        pool.release(old);
        let new = pool.acquire(1.0, 0.0).unwrap();
        assert_eq!(old.index(), new.index());
        assert_ne!(old.generation(), new.generation());

        pool.release(old);
        assert!(pool.is_busy(new.index()));
        pool.release(new);
        assert!(!pool.is_busy(new.index()));
    }

    #[test]
    fn test_release_all() {
        let mut pool = VoicePool::new(3).unwrap();
        for _ in 0..3 {
            pool.acquire(1.0, 0.0).unwrap();
        }
        pool.release_all();
        assert_eq!(pool.busy_count(), 0);
        assert!(pool.acquire(1.0, 0.0).is_ok());
    }
}
