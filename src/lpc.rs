//! Linear-prediction transforms: autocorrelation, Levinson-Durbin, and the
//! reflection-coefficient / linear-prediction-coefficient conversions used
//! by both the encoder and the decoder.
//!
//! Grounded on `find_autocorrelations`, `levinson_durbin_symmetric`, and
//! `rc_to_lpc` in the reference encoder. Unlike `codec-core`'s G.729
//! Q-format fixed-point `LpcAnalyzer`, the UTK kernel does all of this work
//! in `f32` (§3), so there is no DPF/overflow bookkeeping to carry over —
//! only the recurrence itself.

use crate::types::LPC_ORDER;

/// Near-zero guard used both for `r[0]` and for the prediction error `e`
/// during Levinson-Durbin (§4.2).
const DEGENERATE_THRESHOLD: f32 = 1.0 / 32768.0;

/// Compute `r[0..=LPC_ORDER]` from a 432-sample frame, unwindowed.
///
/// `r[i] = sum_{j=0}^{431-i} samples[j] * samples[j+i]`.
pub fn autocorrelate(samples: &[f32; 432]) -> [f32; LPC_ORDER + 1] {
    let mut r = [0.0f32; LPC_ORDER + 1];
    for (i, r_i) in r.iter_mut().enumerate() {
        let mut sum = 0.0f32;
        for j in 0..432 - i {
            sum += samples[j] * samples[j + i];
        }
        *r_i = sum;
    }
    r
}

/// Solve the symmetric Toeplitz system for reflection coefficients via
/// Levinson-Durbin (§4.2).
///
/// `r` is `r[0..=12]` from [`autocorrelate`]. Returns all-zero reflection
/// coefficients if the recurrence degenerates (`|r[0]|` or `|e|` too small).
pub fn levinson_durbin(r: &[f32; LPC_ORDER + 1]) -> [f32; LPC_ORDER] {
    let mut k = [0.0f32; LPC_ORDER];
    let mut x = [0.0f32; LPC_ORDER];
    let mut a = [0.0f32; LPC_ORDER];

    if r[0].abs() <= DEGENERATE_THRESHOLD {
        return k;
    }

    a[0] = 1.0;
    let mut e = r[0];
    x[0] = r[1] / r[0];

    for i in 1..LPC_ORDER {
        let mut u = 0.0f32;
        for j in 0..i {
            u += a[j] * r[i - j];
        }

        k[i - 1] = -u / e;
        e += u * k[i - 1];

        if e.abs() <= DEGENERATE_THRESHOLD {
            return [0.0; LPC_ORDER];
        }

        let a_prev = a;
        a[i] = 0.0;
        for j in 1..=i {
            a[j] += k[i - 1] * a_prev[i - j];
        }

        let mut m = r[i + 1];
        for j in 0..i {
            m -= x[j] * r[i - j];
        }
        m /= e;

        x[i] = 0.0;
        for j in 0..=i {
            x[j] += m * a[i - j];
        }
    }

    k[LPC_ORDER - 1] = -x[LPC_ORDER - 1];
    k
}

/// Run autocorrelation followed by Levinson-Durbin in one step.
pub fn find_rc(samples: &[f32; 432]) -> [f32; LPC_ORDER] {
    let r = autocorrelate(samples);
    levinson_durbin(&r)
}

/// Convert reflection coefficients to linear-prediction coefficients.
///
/// Applies the same forward-vector recurrence Levinson-Durbin uses,
/// without the normal-equation solution side (§4.2 "RC -> LPC").
pub fn rc_to_lpc(rc: &[f32; LPC_ORDER]) -> [f32; LPC_ORDER] {
    let mut a = [0.0f32; LPC_ORDER + 1];
    a[0] = 1.0;

    for i in 1..=LPC_ORDER {
        let a_prev = a;
        a[i] = 0.0;
        for j in 1..=i {
            a[j] += rc[i - 1] * a_prev[i - j];
        }
    }

    let mut lpc = [0.0f32; LPC_ORDER];
    for i in 1..=LPC_ORDER {
        lpc[i - 1] = -a[i];
    }
    lpc
}
