//! Unit conversions for PetalSfx

/// Decimal digits the decibel factors are rounded to, so repeated derivations
/// from the same variation always produce identical bounds.
pub const FACTOR_PRECISION_DIGITS: i32 = 9;

/// Converts a decibel gain to a linear amplitude factor.
pub fn db_to_amplitude(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Rounds `value` to `digits` decimal places.
pub fn round_to_digits(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

/// Playback-rate multiplier for a pitch offset in cents (1200 cents per octave).
pub fn cents_to_playback_rate(cents: f32) -> f64 {
    2f64.powf(cents as f64 / 1200.0)
}
