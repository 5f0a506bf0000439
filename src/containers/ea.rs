//! EA `SCHl`/`SCCl`/`SCDl`×N/`SCEl` chunked wrapper around raw MicroTalk
//! frames, as used by FIFA 2001/2002 (§6).
//!
//! Grounded on `ea_read_schl`/`ea_read_sccl`/`ea_read_scdl`/`ea_read_scel`
//! in `utkdecode-fifa.c`.

use std::io::{Read, Write};

use crate::bits::BitReader;
use crate::containers::chunk::EaChunk;
use crate::containers::wave::{write_wave_header, WaveFormat};
use crate::decoder::{to_pcm_i16, UtkDecoder};
use crate::error::{Result, UtkError};
use crate::types::{StreamParams, FRAME_LEN};

const EA_SAMPLE_RATE: u32 = 22_050;

struct SchlHeader {
    num_samples: u32,
}

fn read_schl(reader: &mut impl Read) -> Result<SchlHeader> {
    let mut chunk = EaChunk::read(reader)?;
    chunk.expect_type(b"SCHl")?;

    let id = chunk.read_u32()?;
    if id & 0xFFFF != u32::from_le_bytes(*b"PT\0\0") {
        return Err(UtkError::format("expected PT chunk in SCHl header"));
    }

    let mut codec_revision = 0u32;
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
                    0x80 => codec_revision = value,
                    0x85 => num_samples = value,
                    0xA0 => compression_type = value,
                    _ => {}
                }
            }
            break;
        } else {
            chunk.read_var_int()?;
        }
    }

    if compression_type != 4 && compression_type != 22 {
        return Err(UtkError::format(format!(
            "invalid compression type {compression_type} (expected 4 for MicroTalk 10:1 or 22 for MicroTalk 5:1)"
        )));
    }
    if num_samples >= 0x0100_0000 {
        return Err(UtkError::format(format!("invalid num_samples {num_samples}")));
    }
    if codec_revision >= 3 {
        // utk_rev3_decode_frame's extra per-subframe flag word isn't
        // recoverable from the available reference source (see DESIGN.md).
        return Err(UtkError::format(format!(
            "unsupported codec revision {codec_revision} (revision >= 3 innovation variant is not implemented)"
        )));
    }

    Ok(SchlHeader { num_samples })
}

fn read_sccl(reader: &mut impl Read) -> Result<u32> {
    let mut chunk = EaChunk::read(reader)?;
    chunk.expect_type(b"SCCl")?;
    let num_data_chunks = chunk.read_u32()?;
    if num_data_chunks >= 0x0100_0000 {
        return Err(UtkError::format(format!("invalid num_data_chunks {num_data_chunks}")));
    }
    Ok(num_data_chunks)
}

fn read_scdl(reader: &mut impl Read, decoder: &mut UtkDecoder, audio_pos: &mut u32, num_samples: u32, out: &mut impl Write) -> Result<()> {
    let mut chunk = EaChunk::read(reader)?;
    chunk.expect_type(b"SCDl")?;

    let mut chunk_samples = chunk.read_u32()?;
    let _unknown = chunk.read_u32()?;
    let _unknown = chunk.read_u8()?;

    if chunk_samples > num_samples - *audio_pos {
        chunk_samples = num_samples - *audio_pos;
    }

    let mut bit_reader = BitReader::new(chunk.remaining());
    let mut remaining = chunk_samples;
    while remaining > 0 {
        let count = remaining.min(FRAME_LEN as u32) as usize;
        let frame = decoder.decode_frame(&mut bit_reader)?;
        let pcm = to_pcm_i16(&frame[..count]);
        for sample in pcm {
            out.write_all(&sample.to_le_bytes())?;
        }
        *audio_pos += count as u32;
        remaining -= count as u32;
    }

    Ok(())
}

fn read_scel(reader: &mut impl Read, audio_pos: u32, num_samples: u32) -> Result<()> {
    let chunk = EaChunk::read(reader)?;
    chunk.expect_type(b"SCEl")?;
    if audio_pos != num_samples {
        return Err(UtkError::format("failed to decode the correct number of samples"));
    }
    Ok(())
}

/// Decode an EA `SCHl/SCCl/SCDl×N/SCEl` stream from `reader` into a WAVE
/// file written to `writer`.
pub fn decode(reader: &mut impl Read, writer: &mut impl Write) -> Result<()> {
    let header = read_schl(reader)?;
    let num_data_chunks = read_sccl(reader)?;

    write_wave_header(
        writer,
        WaveFormat {
            sample_rate: EA_SAMPLE_RATE,
        },
        header.num_samples,
    )?;

    let mut decoder = UtkDecoder::new(StreamParams::defaults());
    let mut audio_pos = 0u32;
    for _ in 0..num_data_chunks {
        read_scdl(reader, &mut decoder, &mut audio_pos, header.num_samples, writer)?;
    }

    read_scel(reader, audio_pos, header.num_samples)
}
