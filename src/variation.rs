//! Per-play randomized volume and pitch variation.
//!
//! A sound carries a [`Variation`] describing how far each play may stray from its base
//! volume (in decibels) and from its original pitch (in cents). Derivation is done on every
//! trigger, so it never validates; [`Variation::validate`] runs once when the sound is
//! configured.

use crate::error::{PetalSfxError, Result};
use crate::math::{FACTOR_PRECISION_DIGITS, db_to_amplitude, round_to_digits};
use crate::random::random_range;
use rand::Rng;

/// Symmetric variation applied around a sound's base volume and pitch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Variation {
    /// Maximum gain deviation in decibels; `None` plays at exactly the base volume
    pub volume_vary_db: Option<f32>,
    /// Maximum pitch deviation in cents; `None` bypasses pitch shifting
    pub pitch_vary_cents: Option<f32>,
}

impl Variation {
    /// No variation: base volume, zero pitch offset.
    pub const NONE: Self = Self {
        volume_vary_db: None,
        pitch_vary_cents: None,
    };

    pub fn new() -> Self {
        Self::NONE
    }

    pub fn volume_vary_db(mut self, db: f32) -> Self {
        self.volume_vary_db = Some(db);
        self
    }

    pub fn pitch_vary_cents(mut self, cents: f32) -> Self {
        self.pitch_vary_cents = Some(cents);
        self
    }

    pub fn is_none(&self) -> bool {
        self.volume_vary_db.is_none() && self.pitch_vary_cents.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(db) = self.volume_vary_db {
            if !(db.is_finite() && db >= 0.0) {
                return Err(PetalSfxError::Configuration(format!(
                    "volume variation must be a non-negative number of decibels, got {}",
                    db
                )));
            }
        }
        if let Some(cents) = self.pitch_vary_cents {
            if !(cents.is_finite() && cents >= 0.0) {
                return Err(PetalSfxError::Configuration(format!(
                    "pitch variation must be a non-negative number of cents, got {}",
                    cents
                )));
            }
        }
        Ok(())
    }

    /// Randomized volume for one play of a sound with the given base volume.
    pub fn derive_volume<R: Rng + ?Sized>(&self, rng: &mut R, base: f32) -> f32 {
        derive_volume(rng, base, self.volume_vary_db)
    }

    /// Randomized pitch offset in cents for one play.
    pub fn derive_pitch_offset<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        derive_pitch_offset(rng, self.pitch_vary_cents)
    }
}

/// Linear amplitude factors `(min, max)` for a symmetric decibel variation,
/// rounded to [`FACTOR_PRECISION_DIGITS`].
pub fn volume_factor_bounds(vary_db: f32) -> (f64, f64) {
    let vary_db = vary_db as f64;
    let max_factor = round_to_digits(db_to_amplitude(vary_db), FACTOR_PRECISION_DIGITS);
    let min_factor = round_to_digits(db_to_amplitude(-vary_db), FACTOR_PRECISION_DIGITS);
    (min_factor, max_factor)
}

/// The inclusive range [`derive_volume`] draws from.
pub fn volume_bounds(base: f32, vary_db: Option<f32>) -> (f32, f32) {
    match vary_db {
        None => (base, base),
        Some(db) => {
            let (min_factor, max_factor) = volume_factor_bounds(db);
            (
                (base as f64 * min_factor) as f32,
                (base as f64 * max_factor) as f32,
            )
        }
    }
}

/// `base` scaled by a uniform factor in `[10^(-db/20), 10^(db/20)]`, or `base` itself
/// when no variation is given.
pub fn derive_volume<R: Rng + ?Sized>(rng: &mut R, base: f32, vary_db: Option<f32>) -> f32 {
    let Some(db) = vary_db else {
        return base;
    };
    let (min_factor, max_factor) = volume_factor_bounds(db);
    let factor = random_range(rng, min_factor, max_factor);
    (base as f64 * factor) as f32
}

/// Uniform pitch offset in `[-cents, +cents]`, or 0 when no variation is given.
pub fn derive_pitch_offset<R: Rng + ?Sized>(rng: &mut R, vary_cents: Option<f32>) -> f32 {
    match vary_cents {
        None => 0.0,
        Some(cents) => random_range(rng, -cents as f64, cents as f64) as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::make_rng;

    #[test]
    fn test_zero_db_is_exact() {
        let mut rng = make_rng(Some(1));
        for base in [0.0, 0.1, 0.5, 0.73, 1.0] {
            assert_eq!(derive_volume(&mut rng, base, Some(0.0)), base);
            assert_eq!(derive_volume(&mut rng, base, None), base);
        }
    }

    #[test]
    fn test_volume_within_bounds() {
        let mut rng = make_rng(Some(2));
        for db in [0.5, 1.0, 3.0, 6.0, 12.0] {
            for base in [0.2, 0.8, 1.0] {
                let (lo, hi) = volume_bounds(base, Some(db));
                assert!(lo < base && base < hi);
                for _ in 0..2_000 {
                    let v = derive_volume(&mut rng, base, Some(db));
                    assert!(lo <= v && v <= hi, "{} not in [{}, {}]", v, lo, hi);
                }
            }
        }
    }

    #[test]
    fn test_factor_bounds_are_stable() {
        let (min_a, max_a) = volume_factor_bounds(3.0);
        let (min_b, max_b) = volume_factor_bounds(3.0);
        assert_eq!(min_a, min_b);
        assert_eq!(max_a, max_b);
        assert_eq!(max_a, 1.412_537_545);
        assert_eq!(min_a, 0.707_945_784);
    }

    #[test]
    fn test_pitch_offset() {
        let mut rng = make_rng(Some(3));
        assert_eq!(derive_pitch_offset(&mut rng, None), 0.0);
        assert_eq!(derive_pitch_offset(&mut rng, Some(0.0)), 0.0);
        let mut saw_negative = false;
        let mut saw_positive = false;
        for _ in 0..5_000 {
            let cents = derive_pitch_offset(&mut rng, Some(100.0));
            assert!((-100.0..=100.0).contains(&cents));
            saw_negative |= cents < 0.0;
            saw_positive |= cents > 0.0;
        }
        assert!(saw_negative && saw_positive);
    }

    #[test]
    fn test_validate() {
        assert!(Variation::NONE.validate().is_ok());
        assert!(Variation::new().volume_vary_db(2.0).validate().is_ok());
        assert!(Variation::new().volume_vary_db(-1.0).validate().is_err());
        assert!(Variation::new().pitch_vary_cents(-5.0).validate().is_err());
        assert!(
            Variation::new()
                .pitch_vary_cents(f32::INFINITY)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_none_variation_plays_base() {
        let mut rng = make_rng(Some(4));
        let variation = Variation::NONE;
        assert!(variation.is_none());
        assert_eq!(variation.derive_volume(&mut rng, 0.6), 0.6);
        assert_eq!(variation.derive_pitch_offset(&mut rng), 0.0);
    }
}
