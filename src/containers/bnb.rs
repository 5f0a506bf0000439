//! Beasts & Bumpkins `PT` chunk wrapper around raw MicroTalk 10:1 frames
//! (§6).
//!
//! Grounded on `pt_read_header`/`pt_decode` in `utkdecode-bnb.c`. Unlike the
//! EA container, the `PT` chunk's declared size bounds only its metadata;
//! the encoded frames follow directly in the file past the chunk, read as
//! a continuation of the same stream (`utk_set_fp`, not `utk_set_ptr`).

use std::io::{Read, Write};

use crate::bits::BitReader;
use crate::containers::chunk::EaChunk;
use crate::containers::wave::{write_wave_header, WaveFormat};
use crate::decoder::{to_pcm_i16, UtkDecoder};
use crate::error::{Result, UtkError};
use crate::types::{StreamParams, FRAME_LEN};

const BNB_SAMPLE_RATE: u32 = 22_050;

/// Decode a Beasts & Bumpkins `PT` file from `reader` into a WAVE file
/// written to `writer`.
pub fn decode(reader: &mut impl Read, writer: &mut impl Write) -> Result<()> {
    let mut chunk = EaChunk::read(reader)?;
    chunk.expect_type_prefix(b"PT")?;

    let mut num_samples = 0u32;
    let mut compression_type = 0u32;
    loop {
        let cmd = chunk.read_u8()?;
        if cmd == 0xFD {
            loop {
                let key = chunk.read_u8()?;
                let value = chunk.read_var_int()?;
                match key {
                    0xFF => break,
                    0x83 => compression_type = value,
                    0x85 => num_samples = value,
                    _ => {}
                }
            }
            break;
        } else {
            chunk.read_var_int()?;
        }
    }

    if compression_type != 9 {
        return Err(UtkError::format(format!(
            "invalid compression type {compression_type} (expected 9 for MicroTalk 10:1)"
        )));
    }
    if num_samples >= 0x0100_0000 {
        return Err(UtkError::format(format!("invalid num_samples {num_samples}")));
    }

    write_wave_header(
        writer,
        WaveFormat {
            sample_rate: BNB_SAMPLE_RATE,
        },
        num_samples,
    )?;

    let mut decoder = UtkDecoder::new(StreamParams::defaults());
    let mut bit_reader = BitReader::new(reader);
    let mut remaining = num_samples;
    while remaining > 0 {
        let count = remaining.min(FRAME_LEN as u32) as usize;
        let frame = decoder.decode_frame(&mut bit_reader)?;
        let pcm = to_pcm_i16(&frame[..count]);
        for sample in pcm {
            writer.write_all(&sample.to_le_bytes())?;
        }
        remaining -= count as u32;
    }

    Ok(())
}
