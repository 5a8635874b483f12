// THEORY:
// Prediction quality is reported as combined mean absolute and mean squared
// error: the magnitudes of the three color lanes of each delta are added up and
// the total is divided by the number of pixels. Each lane of a packed delta is
// read as a signed byte, so an error of 255 counts as -1, not 255.
//
// The seed block is not predicted. Its delta slots hold raw pixels, so a summary
// over an error buffer from a traversal counts the seeds as zero error while
// still dividing by the full pixel count.

use crate::core_modules::pixel::pixel::component;
use crate::core_modules::pixel_delta::pixel_delta::{PackedDelta, RGB_COMPONENTS, unsigned_byte_to_signed};
use crate::core_modules::traversal::seed_offsets;
use std::fmt;

#[inline]
fn signed_lanes(delta: PackedDelta) -> impl Iterator<Item = i64> {
    (0..RGB_COMPONENTS).map(move |index| unsigned_byte_to_signed(component(delta, index)) as i64)
}

pub fn sum_abs_error(deltas: &[PackedDelta]) -> u64 {
    deltas
        .iter()
        .flat_map(|&d| signed_lanes(d))
        .map(|v| v.unsigned_abs())
        .sum()
}

pub fn sum_sqr_error(deltas: &[PackedDelta]) -> u64 {
    deltas
        .iter()
        .flat_map(|&d| signed_lanes(d))
        .map(|v| (v * v) as u64)
        .sum()
}

/// Combined mean absolute error: the lane magnitudes of every delta summed and
/// divided by the number of deltas. Zero for an empty buffer.
pub fn mean_abs_error(deltas: &[PackedDelta]) -> f64 {
    if deltas.is_empty() {
        return 0.0;
    }
    sum_abs_error(deltas) as f64 / deltas.len() as f64
}

/// Combined mean squared error, divided by the number of deltas like
/// `mean_abs_error`. Zero for an empty buffer.
pub fn mean_sqr_error(deltas: &[PackedDelta]) -> f64 {
    if deltas.is_empty() {
        return 0.0;
    }
    sum_sqr_error(deltas) as f64 / deltas.len() as f64
}

/// A copy of `deltas` with the seed block zeroed.
pub fn without_seeds(deltas: &[PackedDelta], width: usize) -> Vec<PackedDelta> {
    let mut masked = deltas.to_vec();
    for offset in seed_offsets(width) {
        if let Some(slot) = masked.get_mut(offset) {
            *slot = 0;
        }
    }
    masked
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorSummary {
    pub mean_abs: f64,
    pub mean_sqr: f64,
}

impl ErrorSummary {
    /// Summarizes every entry of `deltas`.
    pub fn from_deltas(deltas: &[PackedDelta]) -> Self {
        Self {
            mean_abs: mean_abs_error(deltas),
            mean_sqr: mean_sqr_error(deltas),
        }
    }

    /// Summarizes a prediction error image `width` pixels wide, counting the
    /// seed block as predicted exactly.
    pub fn from_prediction_errors(deltas: &[PackedDelta], width: usize) -> Self {
        Self::from_deltas(&without_seeds(deltas, width))
    }
}

impl fmt::Display for ErrorSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MAE {:.4}, MSE {:.4}", self.mean_abs, self.mean_sqr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::pack;

    #[test]
    fn lanes_are_signed_and_alpha_is_ignored() {
        // blue -1, green +2, red -3, alpha ignored
        let delta = pack(0xFF, 2, 0xFD, 0x80);
        assert_eq!(sum_abs_error(&[delta]), 6);
        assert_eq!(sum_sqr_error(&[delta]), 14);
    }

    #[test]
    fn means_divide_the_lane_total_by_the_pixel_count() {
        let delta = pack(0xFF, 2, 0xFD, 0x80);
        assert!((mean_abs_error(&[delta, 0]) - 3.0).abs() < 1e-12);
        assert!((mean_sqr_error(&[delta, 0]) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn seeds_count_as_exact_predictions() {
        // 3x2 buffer whose seed slots hold raw pixels.
        let raw = pack(200, 200, 200, 0xFF);
        let deltas = [raw, raw, pack(3, 0, 0, 0), raw, raw, pack(0, 0xFD, 0, 0)];
        assert_eq!(without_seeds(&deltas, 3), vec![0, 0, pack(3, 0, 0, 0), 0, 0, pack(0, 0xFD, 0, 0)]);

        let summary = ErrorSummary::from_prediction_errors(&deltas, 3);
        assert!((summary.mean_abs - 1.0).abs() < 1e-12);
        assert!((summary.mean_sqr - 3.0).abs() < 1e-12);
        assert!(ErrorSummary::from_deltas(&deltas).mean_abs > summary.mean_abs);
    }

    #[test]
    fn empty_buffers_report_zero() {
        let summary = ErrorSummary::from_deltas(&[]);
        assert_eq!(summary.mean_abs, 0.0);
        assert_eq!(summary.mean_sqr, 0.0);
        assert_eq!(summary.to_string(), "MAE 0.0000, MSE 0.0000");
        assert_eq!(ErrorSummary::from_prediction_errors(&[], 4), summary);
    }
}
