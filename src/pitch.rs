//! Open-loop pitch search (encoder side): find the adaptive-codebook lag
//! and gain that best predict a subframe's excitation from its own history.
//!
//! Grounded on `find_pitch` in the reference encoder.

use crate::types::{PITCH_LAG_MIN, PITCH_LOOKBACK_MAX, SUBFRAME_LEN};

/// Minimum backward history energy below which the pitch predictor is
/// considered unusable and gain is forced to zero.
const MIN_HISTORY_ENERGY: f32 = 1.0 / 32768.0;

/// Result of an open-loop pitch search for one subframe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    pub lag: i32,
    pub gain: f32,
}

/// Search `excitation[0..108]` against its own history for the lag in
/// `[108, 323]` maximizing normalized correlation, then derive the gain
/// that predicts the subframe from that lag.
///
/// The adaptive codebook only keeps 324 samples of lookback history, so the
/// search never reaches the full 363 the wire field could encode (§8: every
/// `adaptive_codebook` read uses `L <= 323`). `excitation` must provide at
/// least [`PITCH_LOOKBACK_MAX`] samples of history *before* index 0; this is
/// expressed here as a slice of length `PITCH_LOOKBACK_MAX as usize +
/// SUBFRAME_LEN` with the history first and the current subframe last.
pub fn find_pitch(history_and_subframe: &[f32]) -> PitchEstimate {
    let lookback = PITCH_LOOKBACK_MAX as usize;
    debug_assert_eq!(history_and_subframe.len(), lookback + SUBFRAME_LEN);

    let current = &history_and_subframe[lookback..];
    let sample_at = |offset_from_current: isize| -> f32 {
        let idx = lookback as isize + offset_from_current;
        history_and_subframe[idx as usize]
    };

    let mut best_lag = PITCH_LAG_MIN;
    let mut best_corr = 0.0f32;

    for lag in PITCH_LAG_MIN..=PITCH_LOOKBACK_MAX {
        let mut corr = 0.0f32;
        for j in 0..SUBFRAME_LEN {
            corr += current[j] * sample_at(j as isize - lag as isize);
        }
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    let mut history_energy = 0.0f32;
    for i in 0..SUBFRAME_LEN {
        let value = sample_at(i as isize - best_lag as isize);
        history_energy += value * value;
    }

    if history_energy >= MIN_HISTORY_ENERGY {
        let gain = (best_corr / history_energy).clamp(0.0, 1.0);
        PitchEstimate { lag: best_lag, gain }
    } else {
        PitchEstimate {
            lag: PITCH_LAG_MIN,
            gain: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PITCH_LOOKBACK_MAX;
    use proptest::prelude::*;

    fn window(history_and_subframe: &[f32]) -> Vec<f32> {
        let lookback = PITCH_LOOKBACK_MAX as usize;
        assert_eq!(history_and_subframe.len(), lookback + SUBFRAME_LEN);
        history_and_subframe.to_vec()
    }

    #[test]
    fn silence_yields_minimum_lag_and_zero_gain() {
        let buf = window(&vec![0.0f32; PITCH_LOOKBACK_MAX as usize + SUBFRAME_LEN]);
        let estimate = find_pitch(&buf);
        assert_eq!(estimate.lag, PITCH_LAG_MIN);
        assert_eq!(estimate.gain, 0.0);
    }

    #[test]
    fn periodic_signal_locks_onto_its_own_period() {
        let lookback = PITCH_LOOKBACK_MAX as usize;
        let period = 150i32;
        let mut buf = vec![0.0f32; lookback + SUBFRAME_LEN];
        for i in 0..buf.len() {
            let phase = (i as i32 % period) as f32 / period as f32;
            buf[i] = (phase * std::f32::consts::TAU).sin() * 1000.0;
        }
        let estimate = find_pitch(&window(&buf));
        assert_eq!(estimate.lag, period);
        assert!(estimate.gain > 0.9, "expected near-unity gain, got {}", estimate.gain);
    }

    proptest! {
        /// §8: "For every pitch lag used, ... 108 <= L <= 323 (lookup into
        /// history)", and gain must always land in [0, 1], for any input.
        #[test]
        fn lag_and_gain_stay_in_bounds_for_arbitrary_input(
            values in prop::collection::vec(-30000.0f32..30000.0, PITCH_LOOKBACK_MAX as usize + SUBFRAME_LEN)
        ) {
            let estimate = find_pitch(&values);
            prop_assert!(estimate.lag >= PITCH_LAG_MIN);
            prop_assert!(estimate.lag <= PITCH_LOOKBACK_MAX);
            prop_assert!((0.0..=1.0).contains(&estimate.gain));
        }
    }
}
