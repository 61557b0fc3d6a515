//! Signal level measurements

use crate::types::LEVEL_FLOOR;

/// Root mean square of a block (0.0 for an empty block)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// Largest absolute sample value of a block
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
}

/// Level in decibels, floored at [`LEVEL_FLOOR`] before the logarithm
#[inline]
pub fn to_db(level: f32) -> f32 {
    20.0 * level.max(LEVEL_FLOOR).log10()
}

/// Map a dB value onto `0..num_pixels`
///
/// `fraction = (db_range + db) / db_range`, `index = floor(fraction * n)`
/// clamped to `[0, n - 1]`. Returns 0 for an empty strip or a
/// non-positive range.
pub fn db_to_index(db: f32, db_range: f32, num_pixels: usize) -> usize {
    if num_pixels == 0 || db_range <= 0.0 || !db.is_finite() {
        return 0;
    }
    let fraction = (db_range + db) / db_range;
    let index = (fraction * num_pixels as f32).floor();
    if index <= 0.0 {
        0
    } else {
        (index as usize).min(num_pixels - 1)
    }
}
