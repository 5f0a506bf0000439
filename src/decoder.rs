//! Decoder core: unpack one 432-sample frame from the bitstream and run
//! adaptive-codebook + LPC synthesis to reconstruct audio (§4.3).
//!
//! The container-level `utk.c` this mirrors wasn't available for direct
//! grounding; the synthesis algorithm here is cross-checked against the
//! encoder's own local reconstruction in `utkencode.c` (which must compute
//! exactly what a decoder would, so its adaptive-codebook update is the
//! decoder's synthesis run backwards).

use crate::bits::BitReader;
use crate::error::Result;
use crate::innovation::decode_innovation;
use crate::lpc::rc_to_lpc;
use crate::tables::RC_TABLE;
use crate::types::{StreamParams, FRAME_LEN, LPC_ORDER, PITCH_LAG_MIN, PITCH_LOOKBACK_MAX, SUBFRAMES_PER_FRAME, SUBFRAME_LEN};
use std::io::Read;

/// History depth of the adaptive codebook: the longest lookback a pitch lag
/// can reach, per [`PITCH_LOOKBACK_MAX`].
const CODEBOOK_HISTORY: usize = PITCH_LOOKBACK_MAX as usize + 1;

/// Decodes a UTK-family bitstream, one 432-sample frame at a time.
///
/// One `UtkDecoder` is created per stream; its state (reflection-coefficient
/// history, adaptive codebook, synthesis-filter history) advances strictly
/// forward one frame at a time and must not be reused across streams.
pub struct UtkDecoder {
    params: StreamParams,
    gains: [f32; 64],
    rc_prev: [f32; LPC_ORDER],
    /// `[0..CODEBOOK_HISTORY)` is lookback history; `[CODEBOOK_HISTORY..)`
    /// holds the frame currently being reconstructed.
    adaptive_codebook: Vec<f32>,
    /// The last 12 synthesized output samples, oldest first.
    lpc_history: [f32; LPC_ORDER],
}

impl UtkDecoder {
    /// Create a decoder for a stream with the given header-derived
    /// parameters. All carry state starts at zero (§3).
    pub fn new(params: StreamParams) -> Self {
        Self {
            gains: params.innovation_gains(),
            params,
            rc_prev: [0.0; LPC_ORDER],
            adaptive_codebook: vec![0.0; CODEBOOK_HISTORY + FRAME_LEN],
            lpc_history: [0.0; LPC_ORDER],
        }
    }

    /// Decode the next 432-sample frame.
    pub fn decode_frame<R: Read>(&mut self, reader: &mut BitReader<R>) -> Result<[f32; FRAME_LEN]> {
        let mut rc_index0 = 0usize;
        let mut rc_new = [0.0f32; LPC_ORDER];
        for (i, rc) in rc_new.iter_mut().take(4).enumerate() {
            let idx = reader.read(6)? as usize;
            if i == 0 {
                rc_index0 = idx;
            }
            *rc = RC_TABLE[idx];
        }
        for rc in rc_new.iter_mut().skip(4) {
            let idx = reader.read(5)? as usize;
            *rc = RC_TABLE[16 + idx];
        }

        let use_huffman = rc_index0 < self.params.huffman_threshold as usize;

        let mut rc_delta = [0.0f32; LPC_ORDER];
        for i in 0..LPC_ORDER {
            rc_delta[i] = (rc_new[i] - self.rc_prev[i]) / 4.0;
        }
        let mut rc_local = self.rc_prev;

        let mut output = [0.0f32; FRAME_LEN];

        for sub in 0..SUBFRAMES_PER_FRAME {
            for i in 0..LPC_ORDER {
                rc_local[i] += rc_delta[i];
            }
            let lpc = rc_to_lpc(&rc_local);

            let lag_code = reader.read(8)? as i32;
            let lag_wire = lag_code + PITCH_LAG_MIN;
            let lag = lag_wire.min(PITCH_LOOKBACK_MAX) as usize;

            let gain_code = reader.read(4)? as i32;
            let pitch_gain = gain_code as f32 / 15.0;

            let innovation = decode_innovation(reader, self.params.halved_innovation, use_huffman, &self.gains)?;

            let base = CODEBOOK_HISTORY + sub * SUBFRAME_LEN;
            let mut excitation = [0.0f32; SUBFRAME_LEN];
            for n in 0..SUBFRAME_LEN {
                let history_value = self.adaptive_codebook[base + n - lag];
                excitation[n] = innovation[n] + pitch_gain * history_value;
            }
            self.adaptive_codebook[base..base + SUBFRAME_LEN].copy_from_slice(&excitation);

            self.synthesize_subframe(&excitation, &lpc, &mut output[sub * SUBFRAME_LEN..(sub + 1) * SUBFRAME_LEN]);
        }

        self.rc_prev = rc_new;
        self.adaptive_codebook.copy_within(SUBFRAME_LEN * SUBFRAMES_PER_FRAME.., 0);

        Ok(output)
    }

    /// Run the order-12 all-pole synthesis filter over one subframe's
    /// excitation, carrying `lpc_history` across the call.
    fn synthesize_subframe(&mut self, excitation: &[f32; SUBFRAME_LEN], lpc: &[f32; LPC_ORDER], out: &mut [f32]) {
        let mut window = [0.0f32; LPC_ORDER + SUBFRAME_LEN];
        window[..LPC_ORDER].copy_from_slice(&self.lpc_history);

        for n in 0..SUBFRAME_LEN {
            let mut prediction = 0.0f32;
            for k in 0..LPC_ORDER {
                prediction += lpc[k] * window[LPC_ORDER + n - 1 - k];
            }
            window[LPC_ORDER + n] = excitation[n] + prediction;
        }

        out.copy_from_slice(&window[LPC_ORDER..]);
        self.lpc_history.copy_from_slice(&window[SUBFRAME_LEN..]);
    }
}

/// Round half-away-from-zero and clamp to `i16` range, matching the
/// reference decoders' output conversion.
pub fn to_pcm_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&x| {
            let rounded = if x >= 0.0 { x + 0.5 } else { x - 0.5 };
            rounded.clamp(-32768.0, 32767.0) as i16
        })
        .collect()
}
