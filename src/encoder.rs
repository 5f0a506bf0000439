//! Encoder core: produce one 432-sample frame of compressed bitstream from
//! 16-bit PCM (§4.5/§4.6).
//!
//! Grounded directly on `main()`'s per-frame loop in the reference encoder,
//! with the excitation-analysis step normalized to use each subframe's own
//! interpolated LPC across its full 108 samples (the source's literal
//! 12/12/12/396-sample split is a buffer-priming artifact of its single
//! shared `input_samples` array, not a requirement of the algorithm).

use crate::bits::BitWriter;
use crate::innovation::{encode_innovation, INNOVATION_LEN};
use crate::lpc::{find_rc, rc_to_lpc};
use crate::pitch::find_pitch;
use crate::tables::nearest_rc_index;
use crate::types::{StreamParams, FRAME_LEN, LPC_ORDER, PITCH_LAG_MIN, PITCH_LOOKBACK_MAX, SUBFRAMES_PER_FRAME, SUBFRAME_LEN};

const CODEBOOK_HISTORY: usize = PITCH_LOOKBACK_MAX as usize + 1;

/// Parameters an encoder needs beyond what's carried in [`StreamParams`]:
/// the target bitrate and the stream's sample rate, both used only to
/// compute each subframe's innovation bit budget (§4.5 step 7).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtkEncoderConfig {
    pub params: StreamParams,
    /// Target bitrate in bits/second.
    pub bitrate: u32,
    pub sample_rate: u32,
}

/// Encodes 16-bit PCM into a UTK-family bitstream, one 432-sample frame at
/// a time. Mirrors [`crate::decoder::UtkDecoder`]'s carry state exactly so
/// the two stay in lock-step (§8: "the encoder must mirror the decoder's
/// exact quantized reconstruction").
pub struct UtkEncoder {
    config: UtkEncoderConfig,
    gains: [f32; 64],
    /// Last 12 samples of the previous frame's raw PCM, prepended to the
    /// next frame so LP analysis and excitation history have context.
    input_overlap: [f32; LPC_ORDER],
    prev_rc: [f32; LPC_ORDER],
    /// `[0..CODEBOOK_HISTORY)` is lookback history; `[CODEBOOK_HISTORY..)`
    /// holds the frame currently being built.
    adaptive_codebook: Vec<f32>,
}

impl UtkEncoder {
    /// Create an encoder for a fresh stream. All carry state starts at zero
    /// (§3). Validates `config` against the documented CLI ranges (§6/§9).
    pub fn new(config: UtkEncoderConfig) -> crate::error::Result<Self> {
        let threshold = config.params.huffman_threshold;
        if !(16..=32).contains(&threshold) {
            return Err(crate::error::UtkError::invalid_argument(format!(
                "huffman threshold {threshold} out of range [16, 32]"
            )));
        }
        let sig = config.params.inngain_sig;
        if sig < 8 || sig > 128 || sig % 8 != 0 {
            return Err(crate::error::UtkError::invalid_argument(format!(
                "innovation gain significand {sig} out of range [8, 128] step 8"
            )));
        }
        let base = config.params.inngain_base;
        if !(1.040..=1.103).contains(&base) {
            return Err(crate::error::UtkError::invalid_argument(format!(
                "innovation gain base {base} out of range [1.040, 1.103]"
            )));
        }
        if config.bitrate == 0 {
            return Err(crate::error::UtkError::invalid_argument("bitrate must be nonzero"));
        }
        if config.sample_rate == 0 {
            return Err(crate::error::UtkError::invalid_argument("sample rate must be nonzero"));
        }

        Ok(Self {
            gains: config.params.innovation_gains(),
            config,
            input_overlap: [0.0; LPC_ORDER],
            prev_rc: [0.0; LPC_ORDER],
            adaptive_codebook: vec![0.0; CODEBOOK_HISTORY + FRAME_LEN],
        })
    }

    /// Write the 15-bit stream parameter word (§6). Call once, before the
    /// first [`UtkEncoder::encode_frame`].
    pub fn write_stream_header(&self, writer: &mut BitWriter) {
        self.config.params.write_header(writer);
    }

    /// Encode one frame from up to 432 PCM samples. Shorter input (the
    /// stream's final frame) is zero-padded; this is not an error (§7).
    pub fn encode_frame(&mut self, writer: &mut BitWriter, samples: &[i16]) {
        debug_assert!(samples.len() <= FRAME_LEN);

        let mut input = [0.0f32; LPC_ORDER + FRAME_LEN];
        input[..LPC_ORDER].copy_from_slice(&self.input_overlap);
        for (i, dst) in input[LPC_ORDER..].iter_mut().enumerate() {
            *dst = samples.get(i).copied().unwrap_or(0) as f32;
        }

        let mut rc = find_rc(input[LPC_ORDER..].try_into().expect("exactly FRAME_LEN samples"));

        let mut use_huffman = false;
        for (i, coeff) in rc.iter_mut().take(4).enumerate() {
            let idx = nearest_rc_index(*coeff, 1, 63);
            writer.write(idx as u32, 6);
            *coeff = crate::tables::RC_TABLE[idx];
            if i == 0 && idx < self.config.params.huffman_threshold as usize {
                use_huffman = true;
            }
        }
        for coeff in rc.iter_mut().skip(4) {
            let idx = nearest_rc_index(*coeff, 16, 32);
            writer.write((idx - 16) as u32, 5);
            *coeff = crate::tables::RC_TABLE[idx];
        }

        let mut rc_delta = [0.0f32; LPC_ORDER];
        for i in 0..LPC_ORDER {
            rc_delta[i] = (rc[i] - self.prev_rc[i]) / 4.0;
        }
        let mut rc_local = self.prev_rc;

        // Run the LPC analysis filter over the whole frame, each subframe
        // using its own interpolated coefficients, writing raw excitation
        // straight into the adaptive codebook.
        for sub in 0..SUBFRAMES_PER_FRAME {
            for i in 0..LPC_ORDER {
                rc_local[i] += rc_delta[i];
            }
            let lpc = rc_to_lpc(&rc_local);

            let base = CODEBOOK_HISTORY + sub * SUBFRAME_LEN;
            for n in 0..SUBFRAME_LEN {
                let source_idx = LPC_ORDER + sub * SUBFRAME_LEN + n;
                let mut prediction = 0.0f32;
                for k in 0..LPC_ORDER {
                    prediction += lpc[k] * input[source_idx - 1 - k];
                }
                self.adaptive_codebook[base + n] = input[source_idx] - prediction;
            }
        }

        self.input_overlap.copy_from_slice(&input[FRAME_LEN..]);
        self.prev_rc = rc;

        let target_bits = (self.config.bitrate as i64 * FRAME_LEN as i64
            / self.config.sample_rate as i64
            / SUBFRAMES_PER_FRAME as i64) as i32
            - 18;

        for sub in 0..SUBFRAMES_PER_FRAME {
            let base = CODEBOOK_HISTORY + sub * SUBFRAME_LEN;

            let mut window = vec![0.0f32; PITCH_LOOKBACK_MAX as usize + SUBFRAME_LEN];
            let lookback = PITCH_LOOKBACK_MAX as usize;
            window.copy_from_slice(&self.adaptive_codebook[base - lookback..base + SUBFRAME_LEN]);
            let estimate = find_pitch(&window);

            writer.write((estimate.lag - PITCH_LAG_MIN) as u32, 8);
            let gain_idx = (estimate.gain * 15.0).round() as u32;
            writer.write(gain_idx, 4);
            let pitch_gain = gain_idx as f32 / 15.0;

            let lag = estimate.lag as usize;
            let mut innovation = [0.0f32; INNOVATION_LEN];
            for n in 0..SUBFRAME_LEN {
                innovation[n] = self.adaptive_codebook[base + n]
                    - pitch_gain * self.adaptive_codebook[base + n - lag];
            }

            encode_innovation(
                writer,
                &mut innovation,
                self.config.params.halved_innovation,
                use_huffman,
                &self.gains,
                target_bits,
            );

            for n in 0..SUBFRAME_LEN {
                self.adaptive_codebook[base + n] =
                    innovation[n] + pitch_gain * self.adaptive_codebook[base + n - lag];
            }
        }

        self.adaptive_codebook.copy_within(SUBFRAME_LEN * SUBFRAMES_PER_FRAME.., 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::UtkDecoder;
    use std::io::Cursor;

    #[test]
    fn silence_in_produces_silence_out_via_full_round_trip() {
        let params = StreamParams::defaults();
        let config = UtkEncoderConfig {
            params,
            bitrate: 32_000,
            sample_rate: 22_050,
        };
        let mut encoder = UtkEncoder::new(config).unwrap();
        let mut writer = BitWriter::new();
        encoder.encode_frame(&mut writer, &[0i16; FRAME_LEN]);
        writer.pad_to_byte();
        let mut bytes = Vec::new();
        writer.flush_full_bytes(&mut bytes).unwrap();

        let mut decoder = UtkDecoder::new(params);
        let mut reader = crate::bits::BitReader::new(Cursor::new(bytes));
        let frame = decoder.decode_frame(&mut reader).unwrap();
        for &s in frame.iter() {
            assert!(s.abs() < 1.0, "expected near-silence, got {s}");
        }
    }

    #[test]
    fn short_final_frame_is_zero_padded_not_an_error() {
        let params = StreamParams::defaults();
        let config = UtkEncoderConfig {
            params,
            bitrate: 32_000,
            sample_rate: 22_050,
        };
        let mut encoder = UtkEncoder::new(config).unwrap();
        let mut writer = BitWriter::new();
        encoder.encode_frame(&mut writer, &[100i16; 50]);
        writer.pad_to_byte();
        let mut bytes = Vec::new();
        writer.flush_full_bytes(&mut bytes).unwrap();
        assert!(!bytes.is_empty());
    }
}
