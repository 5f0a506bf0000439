//! Innovation codec: encode/decode the 108-sample-per-subframe excitation
//! residual in the four modes of §4.4 (Huffman x {halved, full}, ternary x
//! {halved, full}).
//!
//! Grounded on `encode_huffman`, `encode_triangular`, `interpolate`,
//! `low_pass_innovation`, and `find_a_z_flags` in the reference encoder.
//! The decode side (symbol-by-symbol Huffman decode, ternary decode,
//! interpolation reconstruction) is this crate's own work, built to be the
//! exact inverse of that encoder.

use crate::bits::{BitReader, BitWriter};
use crate::error::{Result, UtkError};
use crate::tables::{
    HUFFMAN_MODELS, INTERP_TAP1, INTERP_TAP3, INTERP_TAP5, LOWPASS_TAP0, LOWPASS_TAP1,
    LOWPASS_TAP3, LOWPASS_TAP5, MODEL0_ESCAPE_BASE, MODEL0_ESCAPE_BITS, MODEL1_ESCAPE_BASE,
    MODEL1_ESCAPE_BITS, ZERO_RUN_MAX, ZERO_RUN_MIN,
};
use std::io::Read;

/// Number of samples in one subframe's innovation vector.
pub const INNOVATION_LEN: usize = 108;

/// Leading/trailing zero-guard width around an innovation vector, so the
/// interpolation step never reads out of bounds.
const GUARD: usize = 5;

const CTX_LEN: usize = GUARD + INNOVATION_LEN + GUARD;

/// An innovation vector plus its zero guard bands, addressed as `ctx[GUARD
/// + i]` for `i in -5..113`.
type InnovationCtx = [f32; CTX_LEN];

fn ctx_get(ctx: &InnovationCtx, i: isize) -> f32 {
    ctx[(GUARD as isize + i) as usize]
}

fn ctx_set(ctx: &mut InnovationCtx, i: isize, value: f32) {
    ctx[(GUARD as isize + i) as usize] = value;
}

enum HuffmanSymbol {
    Value(i32),
    ZeroRun(u32),
}

fn decode_huffman_symbol<R: Read>(reader: &mut BitReader<R>, model: usize) -> Result<HuffmanSymbol> {
    let mut accum = 0u32;
    for len in 1..=16u32 {
        let bit = reader.read(1)?;
        accum |= bit << (len - 1);

        for (sym_idx, code) in HUFFMAN_MODELS[model].iter().enumerate() {
            if code.len as u32 == len && code.bits as u32 == accum {
                return Ok(HuffmanSymbol::Value(sym_idx as i32 - 13));
            }
        }

        if model == 0 && len == MODEL0_ESCAPE_BITS && (accum & 0xFF) == MODEL0_ESCAPE_BASE {
            let length = ((accum >> 8) & 0x3F) + ZERO_RUN_MIN;
            return Ok(HuffmanSymbol::ZeroRun(length));
        }
        if model == 1 && len == MODEL1_ESCAPE_BITS && (accum & 0x7F) == MODEL1_ESCAPE_BASE {
            let length = ((accum >> 7) & 0x3F) + ZERO_RUN_MIN;
            return Ok(HuffmanSymbol::ZeroRun(length));
        }
    }
    Err(UtkError::format("invalid Huffman code in innovation block"))
}

fn decode_huffman_positions<R: Read>(
    reader: &mut BitReader<R>,
    ctx: &mut InnovationCtx,
    a: usize,
    interval: usize,
    gain: f32,
) -> Result<()> {
    let mut model = 0usize;
    let mut i = a as isize;
    while i < INNOVATION_LEN as isize {
        match decode_huffman_symbol(reader, model)? {
            HuffmanSymbol::Value(v) => {
                ctx_set(ctx, i, gain * v as f32);
                // Mirrors the reference encoder's `model = (value < -1 ||
                // value > 1)`, which is the opposite sense of a superficial
                // reading of "after abs <= 1, use model 1" — the encoder is
                // the tie-breaker here (see DESIGN.md).
                model = usize::from(v < -1 || v > 1);
                i += interval as isize;
            }
            HuffmanSymbol::ZeroRun(length) => {
                let length = length.min(ZERO_RUN_MAX) as isize;
                for _ in 0..length {
                    if i >= INNOVATION_LEN as isize {
                        break;
                    }
                    ctx_set(ctx, i, 0.0);
                    i += interval as isize;
                }
                model = 0;
            }
        }
    }
    Ok(())
}

fn decode_ternary_positions<R: Read>(
    reader: &mut BitReader<R>,
    ctx: &mut InnovationCtx,
    a: usize,
    interval: usize,
    gain: f32,
) -> Result<()> {
    let mut i = a as isize;
    while i < INNOVATION_LEN as isize {
        let value = if reader.read(1)? == 0 {
            0.0
        } else if reader.read(1)? != 0 {
            gain
        } else {
            -gain
        };
        ctx_set(ctx, i, value);
        i += interval as isize;
    }
    Ok(())
}

/// Reconstruct the off-parity samples of a halved-mode innovation vector by
/// 6-tap symmetric interpolation (§4.4). `a` selects which parity already
/// holds real values.
fn interpolate(ctx: &mut InnovationCtx, a: usize) {
    let start = (1 - a as isize).rem_euclid(2);
    let mut i = start;
    while i < INNOVATION_LEN as isize {
        let value = INTERP_TAP1 * (ctx_get(ctx, i - 1) + ctx_get(ctx, i + 1))
            + INTERP_TAP3 * (ctx_get(ctx, i - 3) + ctx_get(ctx, i + 3))
            + INTERP_TAP5 * (ctx_get(ctx, i - 5) + ctx_get(ctx, i + 5));
        ctx_set(ctx, i, value);
        i += 2;
    }
}

/// Decode one subframe's innovation vector.
///
/// `halved` and `use_huffman` select the mode per §4.4: `halved` is a
/// stream-wide setting (§6), `use_huffman` is recomputed per frame from the
/// decoded RC index against the stream's Huffman threshold.
pub fn decode_innovation<R: Read>(
    reader: &mut BitReader<R>,
    halved: bool,
    use_huffman: bool,
    gains: &[f32; 64],
) -> Result<[f32; INNOVATION_LEN]> {
    let (p, a, z) = if halved {
        let v = reader.read(8)? as usize;
        (v & 0x3F, (v >> 6) & 1, (v >> 7) & 1)
    } else {
        (reader.read(6)? as usize, 0usize, 1usize)
    };

    let interval = if halved { 2 } else { 1 };
    let mut gain = gains[p];
    if z == 0 {
        gain *= 0.5;
    }

    let mut ctx: InnovationCtx = [0.0; CTX_LEN];
    if use_huffman {
        decode_huffman_positions(reader, &mut ctx, a, interval, gain)?;
    } else {
        decode_ternary_positions(reader, &mut ctx, a, interval, gain)?;
    }

    if halved && z == 0 {
        interpolate(&mut ctx, a);
    }
    // z == 1 (or full-bandwidth mode): the inactive slots are already zero.

    let mut out = [0.0f32; INNOVATION_LEN];
    out.copy_from_slice(&ctx[GUARD..GUARD + INNOVATION_LEN]);
    Ok(out)
}

/// Encoder-side choice of `(a, z)` flags and the quantizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InnovationChoice {
    pub a: usize,
    pub z: usize,
}

fn interpolation_error(a: usize, z: usize, x: &[f32; INNOVATION_LEN]) -> f32 {
    let start = (1 - a as isize).rem_euclid(2);
    let mut error = 0.0f32;
    let mut i = start;
    while i < INNOVATION_LEN as isize {
        let xi = x[i as usize];
        if z == 1 {
            error += xi * xi;
        } else {
            let get = |k: isize| -> f32 {
                if k < 0 || k >= INNOVATION_LEN as isize {
                    0.0
                } else {
                    x[k as usize]
                }
            };
            let prediction = INTERP_TAP1 * (get(i - 1) + get(i + 1))
                + INTERP_TAP3 * (get(i - 3) + get(i + 3))
                + INTERP_TAP5 * (get(i - 5) + get(i + 5));
            error += (prediction - xi) * (prediction - xi);
        }
        i += 2;
    }
    error
}

/// Choose `(a, z)` minimizing the halved-mode reconstruction error.
/// Tie order (per the reference encoder, preserved intentionally):
/// `(0,1)`, `(1,1)`, `(0,0)`, `(1,0)`.
pub fn find_a_z_flags(innovation: &[f32; INNOVATION_LEN]) -> InnovationChoice {
    let candidates = [(0usize, 1usize), (1, 1), (0, 0), (1, 0)];
    let mut best = candidates[0];
    let mut best_error = interpolation_error(best.0, best.1, innovation);
    for &(a, z) in &candidates[1..] {
        let error = interpolation_error(a, z, innovation);
        if error < best_error {
            best_error = error;
            best = (a, z);
        }
    }
    InnovationChoice { a: best.0, z: best.1 }
}

/// Apply the encoder's weak low-pass filter to the active-parity samples
/// ahead of halved-mode quantization (§4.6).
pub fn low_pass_innovation(x: &mut [f32; INNOVATION_LEN], a: usize, z: usize) {
    let scale = if z == 1 { LOWPASS_TAP0 } else { 0.5 };
    let mut filtered = *x;
    let mut i = a as isize;
    while i < INNOVATION_LEN as isize {
        let get = |k: isize| -> f32 {
            if k < 0 || k >= INNOVATION_LEN as isize {
                0.0
            } else {
                x[k as usize]
            }
        };
        filtered[i as usize] = scale
            * (get(i)
                + LOWPASS_TAP1 * (get(i - 1) + get(i + 1))
                + LOWPASS_TAP3 * (get(i - 3) + get(i + 3))
                + LOWPASS_TAP5 * (get(i - 5) + get(i + 5)));
        i += 2;
    }
    *x = filtered;
}

/// Reconstruct the off-parity samples of a halved-mode vector in place
/// (used after quantization, on the encoder side, so that subsequent
/// subframes observe exactly what a decoder would).
pub fn interpolate_in_place(x: &mut [f32; INNOVATION_LEN], a: usize, z: usize) {
    let mut ctx: InnovationCtx = [0.0; CTX_LEN];
    ctx[GUARD..GUARD + INNOVATION_LEN].copy_from_slice(x);
    if z == 0 {
        interpolate(&mut ctx, a);
    } else {
        let start = (1 - a as isize).rem_euclid(2);
        let mut i = start;
        while i < INNOVATION_LEN as isize {
            ctx_set(&mut ctx, i, 0.0);
            i += 2;
        }
    }
    x.copy_from_slice(&ctx[GUARD..GUARD + INNOVATION_LEN]);
}

fn encode_huffman_symbol(writer: &mut BitWriter, model: usize, value: i32) {
    let code = HUFFMAN_MODELS[model][(value + 13) as usize];
    writer.write(code.bits as u32, code.len as u32);
}

/// Result of trial-encoding one candidate gain power for an innovation
/// block: the quantized samples, the bits consumed, and the L2 error.
struct TrialEncoding {
    bytes: Vec<u8>,
    trailing_bits: u32,
    innovation: [f32; INNOVATION_LEN],
    bits_used: usize,
    error: f32,
}

fn trial_encode_huffman(
    halved: bool,
    pow: usize,
    a: usize,
    z: usize,
    innovation_in: &[f32; INNOVATION_LEN],
    gains: &[f32; 64],
) -> TrialEncoding {
    let interval = if halved { 2 } else { 1 };
    let mut inn_gain = gains[pow];
    if z == 0 {
        inn_gain *= 0.5;
    }

    let mut writer = BitWriter::new();
    let mut innovation_out = [0.0f32; INNOVATION_LEN];
    let mut values = [0i32; INNOVATION_LEN];
    let mut error = 0.0f32;

    if halved {
        writer.write((pow | (a << 6) | (z << 7)) as u32, 8);
    } else {
        writer.write(pow as u32, 6);
    }

    let mut i = a;
    while i < INNOVATION_LEN {
        let v = (innovation_in[i] / inn_gain).round().clamp(-13.0, 13.0) as i32;
        values[i] = v;
        innovation_out[i] = inn_gain * v as f32;
        let e = innovation_out[i] - innovation_in[i];
        error += e * e;
        i += interval;
    }

    // Backward zero-run scan grounded on the reference encoder; see §9's
    // documented off-by-one when `halved && a == 1`.
    let mut zero_counts = [0u32; INNOVATION_LEN];
    let mut counter = 0u32;
    let mut i = 108i32 - interval as i32 - a as i32;
    while i >= 0 {
        if values[i as usize] == 0 {
            counter += 1;
        } else {
            counter = 0;
        }
        zero_counts[i as usize] = counter;
        i -= interval as i32;
    }

    let mut model = 0usize;
    let mut i = a;
    while i < INNOVATION_LEN {
        if zero_counts[i] >= ZERO_RUN_MIN {
            let length = zero_counts[i].min(ZERO_RUN_MAX);
            if model == 0 {
                writer.write(MODEL0_ESCAPE_BASE | ((length - ZERO_RUN_MIN) << 8), MODEL0_ESCAPE_BITS);
            } else {
                writer.write(MODEL1_ESCAPE_BASE | ((length - ZERO_RUN_MIN) << 7), MODEL1_ESCAPE_BITS);
            }
            model = 0;
            i += (length as usize) * interval;
        } else {
            let value = values[i];
            encode_huffman_symbol(&mut writer, model, value);
            model = usize::from(value < -1 || value > 1);
            i += interval;
        }
    }

    let bits_used = writer.bit_position();
    let trailing_bits = (bits_used % 8) as u32;
    writer.pad_to_byte();
    let mut bytes = Vec::new();
    writer.flush_full_bytes(&mut bytes).expect("writing to a Vec cannot fail");

    TrialEncoding {
        bytes,
        trailing_bits,
        innovation: innovation_out,
        bits_used,
        error,
    }
}

fn trial_encode_ternary(
    halved: bool,
    pow: usize,
    a: usize,
    z: usize,
    innovation_in: &[f32; INNOVATION_LEN],
    gains: &[f32; 64],
) -> TrialEncoding {
    let interval = if halved { 2 } else { 1 };
    let mut inn_gain = 2.0 * gains[pow];
    if z == 0 {
        inn_gain *= 0.5;
    }

    let mut writer = BitWriter::new();
    let mut innovation_out = [0.0f32; INNOVATION_LEN];
    let mut error = 0.0f32;

    if halved {
        writer.write((pow | (a << 6) | (z << 7)) as u32, 8);
    } else {
        writer.write(pow as u32, 6);
    }

    let mut i = a;
    while i < INNOVATION_LEN {
        let value = (innovation_in[i] / inn_gain).round().clamp(-1.0, 1.0) as i32;
        if value > 0 {
            writer.write(3, 2);
        } else if value < 0 {
            writer.write(1, 2);
        } else {
            writer.write(0, 1);
        }
        innovation_out[i] = inn_gain * value as f32;
        let e = innovation_out[i] - innovation_in[i];
        error += e * e;
        i += interval;
    }

    let bits_used = writer.bit_position();
    let trailing_bits = (bits_used % 8) as u32;
    writer.pad_to_byte();
    let mut bytes = Vec::new();
    writer.flush_full_bytes(&mut bytes).expect("writing to a Vec cannot fail");

    TrialEncoding {
        bytes,
        trailing_bits,
        innovation: innovation_out,
        bits_used,
        error,
    }
}

fn write_trial(writer: &mut BitWriter, trial: &TrialEncoding) {
    for (idx, &byte) in trial.bytes.iter().enumerate() {
        let bits = if idx + 1 == trial.bytes.len() && trial.trailing_bits != 0 {
            trial.trailing_bits
        } else {
            8
        };
        writer.write(byte as u32, bits);
    }
}

/// Encode one subframe's innovation residual, choosing the gain power that
/// best serves the mode's objective (closest-to-target bits for Huffman,
/// minimum L2 error for ternary). Returns the bits actually written and
/// replaces `innovation` in place with the quantized (and, in halved mode,
/// interpolated) reconstruction the decoder will see.
pub fn encode_innovation(
    writer: &mut BitWriter,
    innovation: &mut [f32; INNOVATION_LEN],
    halved: bool,
    use_huffman: bool,
    gains: &[f32; 64],
    target_bit_count: i32,
) -> usize {
    let (a, z) = if halved {
        let choice = find_a_z_flags(innovation);
        low_pass_innovation(innovation, choice.a, choice.z);
        (choice.a, choice.z)
    } else {
        (0, 1)
    };

    let best = if use_huffman {
        let interval = if halved { 2 } else { 1 };
        let mut max_value = 0.0f32;
        let mut i = a;
        while i < INNOVATION_LEN {
            max_value = max_value.max(innovation[i].abs());
            i += interval;
        }

        let scale = if z == 1 { 1.0 } else { 0.5 };
        let mut min_pow = 0usize;
        for p in (0..=62).rev() {
            if gains[p] * scale * 13.5 < max_value {
                min_pow = p + 1;
                break;
            }
        }

        // Strict `<` so ties favor the smaller `pow` (the earlier trial):
        // the reference encoder's alternating-buffer swap only triggers on a
        // strict improvement, so an exact tie leaves the earlier candidate
        // in place.
        let mut best: Option<TrialEncoding> = None;
        let mut best_distance = 0i64;
        for pow in min_pow..=63 {
            let trial = trial_encode_huffman(halved, pow, a, z, innovation, gains);
            let distance = (trial.bits_used as i64 - target_bit_count as i64).abs();
            if best.is_none() || distance < best_distance {
                best_distance = distance;
                best = Some(trial);
            }
        }
        best.expect("pow range 0..=63 is non-empty")
    } else {
        let mut best: Option<TrialEncoding> = None;
        let mut best_error = f32::INFINITY;
        for pow in 0..=63 {
            let trial = trial_encode_ternary(halved, pow, a, z, innovation, gains);
            if trial.error < best_error {
                best_error = trial.error;
                best = Some(trial);
            }
        }
        best.expect("pow range 0..=63 is non-empty")
    };

    write_trial(writer, &best);
    *innovation = best.innovation;
    if halved {
        interpolate_in_place(innovation, a, z);
    }
    best.bits_used
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StreamParams;
    use std::io::Cursor;

    #[test]
    fn huffman_round_trip_all_symbols_both_models() {
        for model in 0..2 {
            for symbol in -13i32..=13 {
                let code = HUFFMAN_MODELS[model][(symbol + 13) as usize];
                let mut w = BitWriter::new();
                w.write(code.bits as u32, code.len as u32);
                w.pad_to_byte();
                let mut bytes = Vec::new();
                w.flush_full_bytes(&mut bytes).unwrap();

                let mut r = BitReader::new(Cursor::new(bytes));
                match decode_huffman_symbol(&mut r, model).unwrap() {
                    HuffmanSymbol::Value(v) => assert_eq!(v, symbol),
                    HuffmanSymbol::ZeroRun(_) => panic!("expected a value symbol"),
                }
            }
        }
    }

    #[test]
    fn model1_zero_run_escape_round_trips() {
        // §8 scenario 6: seven zeros in model 1 emits the 13-bit escape.
        let mut w = BitWriter::new();
        w.write(MODEL1_ESCAPE_BASE | ((7 - ZERO_RUN_MIN) << 7), MODEL1_ESCAPE_BITS);
        w.pad_to_byte();
        let mut bytes = Vec::new();
        w.flush_full_bytes(&mut bytes).unwrap();
        assert_eq!(bytes, vec![0b0000000_1111111u16 as u8, 0b0000000]);

        let mut r = BitReader::new(Cursor::new(bytes));
        match decode_huffman_symbol(&mut r, 1).unwrap() {
            HuffmanSymbol::ZeroRun(length) => assert_eq!(length, 7),
            HuffmanSymbol::Value(_) => panic!("expected a zero run"),
        }
    }

    #[test]
    fn silence_innovation_encodes_and_decodes_to_zero() {
        let params = StreamParams::defaults();
        let gains = params.innovation_gains();
        let mut innovation = [0.0f32; INNOVATION_LEN];

        let mut writer = BitWriter::new();
        encode_innovation(&mut writer, &mut innovation, true, true, &gains, 40);
        writer.pad_to_byte();
        let mut bytes = Vec::new();
        writer.flush_full_bytes(&mut bytes).unwrap();

        let mut reader = BitReader::new(Cursor::new(bytes));
        let decoded = decode_innovation(&mut reader, true, true, &gains).unwrap();
        assert_eq!(decoded, [0.0; INNOVATION_LEN]);
    }

    #[test]
    fn full_bandwidth_ternary_round_trip_is_bounded() {
        let params = StreamParams::defaults();
        let gains = params.innovation_gains();
        let mut innovation = [0.0f32; INNOVATION_LEN];
        for (i, v) in innovation.iter_mut().enumerate() {
            *v = if i % 3 == 0 { 40.0 } else { -20.0 };
        }
        let original = innovation;

        let mut writer = BitWriter::new();
        encode_innovation(&mut writer, &mut innovation, false, false, &gains, 108);
        writer.pad_to_byte();
        let mut bytes = Vec::new();
        writer.flush_full_bytes(&mut bytes).unwrap();

        let mut reader = BitReader::new(Cursor::new(bytes));
        let decoded = decode_innovation(&mut reader, false, false, &gains).unwrap();
        assert_eq!(decoded, innovation);

        for (d, o) in decoded.iter().zip(original.iter()) {
            assert!((d - o).abs() < 100.0);
        }
    }
}
