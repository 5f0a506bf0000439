//! Maxis `UTM0` container: decode to WAVE, or wrap an encoded bitstream with
//! a `UTM0` header so legacy tools can decode it back (§6).
//!
//! Grounded on the header parse/validation in `utkdecode.c` and the header
//! emission in `utkencode.c`'s `main()`.

use std::io::{Read, Write};

use crate::bits::BitReader;
use crate::containers::wave::{write_wave_header, WaveFormat};
use crate::encoder::UtkEncoderConfig;
use crate::error::{Result, UtkError};
use crate::stream::{DecodeStream, EncodeStream};
use crate::types::{StreamParams, DECODE_SAMPLE_RATE_RANGE, ENCODE_SAMPLE_RATE_RANGE};

const SIGNATURE: [u8; 4] = *b"UTM0";

struct Utm0Header {
    out_size: u32,
    sample_rate: u32,
}

fn read_header(reader: &mut impl Read) -> Result<Utm0Header> {
    let mut sig = [0u8; 4];
    reader.read_exact(&mut sig).map_err(|_| UtkError::truncated("UTM0 header"))?;
    if sig != SIGNATURE {
        return Err(UtkError::format("not a valid UTK file (expected UTM0 signature)"));
    }

    fn read_u32(reader: &mut impl Read) -> Result<u32> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).map_err(|_| UtkError::truncated("UTM0 header"))?;
        Ok(u32::from_le_bytes(buf))
    }
    fn read_u16(reader: &mut impl Read) -> Result<u16> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).map_err(|_| UtkError::truncated("UTM0 header"))?;
        Ok(u16::from_le_bytes(buf))
    }

    let out_size = read_u32(reader)?;
    let wfx_size = read_u32(reader)?;
    let format_tag = read_u16(reader)?;
    let channels = read_u16(reader)?;
    let sample_rate = read_u32(reader)?;
    let avg_bytes_per_sec = read_u32(reader)?;
    let block_align = read_u16(reader)?;
    let bits_per_sample = read_u16(reader)?;
    let cb_size = read_u16(reader)?;
    let _padding = read_u16(reader)?;

    if out_size % 2 != 0 || out_size >= 0x0100_0000 {
        return Err(UtkError::format(format!("invalid dwOutSize {out_size}")));
    }
    if wfx_size != 20 {
        return Err(UtkError::format(format!("invalid dwWfxSize {wfx_size} (expected 20)")));
    }
    if format_tag != 1 {
        return Err(UtkError::format(format!("invalid wFormatTag {format_tag} (expected 1)")));
    }
    if channels != 1 {
        return Err(UtkError::format(format!(
            "invalid nChannels {channels} (only mono is supported)"
        )));
    }
    if !DECODE_SAMPLE_RATE_RANGE.contains(&sample_rate) {
        return Err(UtkError::format(format!("invalid nSamplesPerSec {sample_rate}")));
    }
    if avg_bytes_per_sec != sample_rate * block_align as u32 {
        return Err(UtkError::format(
            "invalid nAvgBytesPerSec (expected nSamplesPerSec * nBlockAlign)",
        ));
    }
    if block_align != 2 {
        return Err(UtkError::format(format!("invalid nBlockAlign {block_align} (expected 2)")));
    }
    if bits_per_sample != 16 {
        return Err(UtkError::format(format!(
            "invalid wBitsPerSample {bits_per_sample} (expected 16)"
        )));
    }
    if cb_size != 0 {
        return Err(UtkError::format(format!("invalid cbSize {cb_size} (expected 0)")));
    }

    Ok(Utm0Header { out_size, sample_rate })
}

/// Decode a `UTM0` file from `reader` into a WAVE file written to `writer`.
pub fn decode(reader: &mut impl Read, writer: &mut impl Write) -> Result<()> {
    let header = read_header(reader)?;
    let num_samples = (header.out_size / 2) as usize;

    write_wave_header(
        writer,
        WaveFormat {
            sample_rate: header.sample_rate,
        },
        num_samples as u32,
    )?;

    let mut bit_reader = BitReader::new(reader);
    let params = StreamParams::read_header(&mut bit_reader)?;
    let decode_stream = DecodeStream::new(bit_reader, params, num_samples);
    decode_stream.decode_all(writer)
}

/// Encode `samples` at `sample_rate` into a `UTM0` file written to `writer`.
pub fn encode(writer: &mut impl Write, samples: &[i16], sample_rate: u32, config: UtkEncoderConfig) -> Result<()> {
    if !ENCODE_SAMPLE_RATE_RANGE.contains(&sample_rate) {
        return Err(UtkError::invalid_argument(format!(
            "sample rate {sample_rate} out of range {ENCODE_SAMPLE_RATE_RANGE:?}"
        )));
    }

    let out_size = samples.len() as u32 * 2;
    writer.write_all(&SIGNATURE)?;
    writer.write_all(&out_size.to_le_bytes())?;
    writer.write_all(&20u32.to_le_bytes())?; // dwWfxSize
    writer.write_all(&1u16.to_le_bytes())?; // wFormatTag
    writer.write_all(&1u16.to_le_bytes())?; // nChannels
    writer.write_all(&sample_rate.to_le_bytes())?;
    writer.write_all(&(sample_rate * 2).to_le_bytes())?; // nAvgBytesPerSec
    writer.write_all(&2u16.to_le_bytes())?; // nBlockAlign
    writer.write_all(&16u16.to_le_bytes())?; // wBitsPerSample
    writer.write_all(&0u16.to_le_bytes())?; // cbSize
    writer.write_all(&0u16.to_le_bytes())?; // padding

    let mut encode_stream = EncodeStream::new(Vec::new(), config)?;
    encode_stream.encode_samples(samples)?;
    let body = encode_stream.finish()?;
    writer.write_all(&body)?;
    Ok(())
}
