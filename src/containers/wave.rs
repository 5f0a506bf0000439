//! Standard 44-byte `RIFF/WAVE/fmt /data` I/O for mono 16-bit PCM (§6).
//!
//! Grounded on the `write_u32`/`write_u16` header emission in `utkdecode.c`
//! and friends; the reader side is this crate's own work, since every
//! original decoder only ever writes WAVE, never reads it (`utkencode.c`
//! reads raw PCM via its own `-S`/`-B` sample-rate/bit-depth flags instead).

use std::io::{Read, Write};

use crate::error::{Result, UtkError};

const RIFF: [u8; 4] = *b"RIFF";
const WAVE: [u8; 4] = *b"WAVE";
const FMT: [u8; 4] = *b"fmt ";
const DATA: [u8; 4] = *b"data";

/// The `fmt ` fields of a mono 16-bit PCM WAVE file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveFormat {
    pub sample_rate: u32,
}

/// Write a 44-byte header followed by `samples` as little-endian `i16`s.
pub fn write_wave(writer: &mut impl Write, format: WaveFormat, samples: &[i16]) -> Result<()> {
    let data_len = samples.len() as u32 * 2;
    writer.write_all(&RIFF)?;
    writer.write_all(&(36 + data_len).to_le_bytes())?;
    writer.write_all(&WAVE)?;
    writer.write_all(&FMT)?;
    writer.write_all(&16u32.to_le_bytes())?;
    writer.write_all(&1u16.to_le_bytes())?; // wFormatTag = PCM
    writer.write_all(&1u16.to_le_bytes())?; // nChannels = mono
    writer.write_all(&format.sample_rate.to_le_bytes())?;
    writer.write_all(&(format.sample_rate * 2).to_le_bytes())?; // nAvgBytesPerSec
    writer.write_all(&2u16.to_le_bytes())?; // nBlockAlign
    writer.write_all(&16u16.to_le_bytes())?; // wBitsPerSample
    writer.write_all(&DATA)?;
    writer.write_all(&data_len.to_le_bytes())?;
    for &sample in samples {
        writer.write_all(&sample.to_le_bytes())?;
    }
    Ok(())
}

/// Write only the 44-byte header, for streaming callers that append PCM as
/// it's produced rather than buffering the whole file.
pub fn write_wave_header(writer: &mut impl Write, format: WaveFormat, num_samples: u32) -> Result<()> {
    let data_len = num_samples * 2;
    writer.write_all(&RIFF)?;
    writer.write_all(&(36 + data_len).to_le_bytes())?;
    writer.write_all(&WAVE)?;
    writer.write_all(&FMT)?;
    writer.write_all(&16u32.to_le_bytes())?;
    writer.write_all(&1u16.to_le_bytes())?;
    writer.write_all(&1u16.to_le_bytes())?;
    writer.write_all(&format.sample_rate.to_le_bytes())?;
    writer.write_all(&(format.sample_rate * 2).to_le_bytes())?;
    writer.write_all(&2u16.to_le_bytes())?;
    writer.write_all(&16u16.to_le_bytes())?;
    writer.write_all(&DATA)?;
    writer.write_all(&data_len.to_le_bytes())?;
    Ok(())
}

/// A parsed WAVE file: mono 16-bit PCM only (§1 non-goal: no other layouts).
/// An odd trailing byte in `data` is silently dropped, matching the
/// boundary behavior required of the encoder's WAVE reader (§8).
pub struct WaveFile {
    pub format: WaveFormat,
    pub samples: Vec<i16>,
}

/// Read a WAVE file, validating the fields the codec actually depends on
/// and skipping any chunk that isn't `fmt `/`data` (e.g. `LIST`, `fact`).
pub fn read_wave(reader: &mut impl Read) -> Result<WaveFile> {
    let mut tag = [0u8; 4];
    reader.read_exact(&mut tag).map_err(|_| UtkError::truncated("WAVE RIFF tag"))?;
    if tag != RIFF {
        return Err(UtkError::format("not a RIFF file (expected 'RIFF')"));
    }
    let mut size_buf = [0u8; 4];
    reader.read_exact(&mut size_buf).map_err(|_| UtkError::truncated("WAVE RIFF size"))?;

    reader.read_exact(&mut tag).map_err(|_| UtkError::truncated("WAVE form type"))?;
    if tag != WAVE {
        return Err(UtkError::format("not a WAVE file (expected 'WAVE' form type)"));
    }

    let mut sample_rate = None;
    let mut channels = None;
    let mut bits_per_sample = None;
    let mut samples = None;

    loop {
        let mut chunk_id = [0u8; 4];
        match reader.read_exact(&mut chunk_id) {
            Ok(()) => {}
            Err(_) => break, // EOF: no more chunks
        }
        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf).map_err(|_| UtkError::truncated("WAVE chunk size"))?;
        let len = u32::from_le_bytes(len_buf) as usize;

        if chunk_id == FMT {
            let mut fmt_body = vec![0u8; len];
            reader.read_exact(&mut fmt_body).map_err(|_| UtkError::truncated("WAVE fmt chunk"))?;
            if fmt_body.len() < 16 {
                return Err(UtkError::format("WAVE fmt chunk too short"));
            }
            let format_tag = u16::from_le_bytes([fmt_body[0], fmt_body[1]]);
            if format_tag != 1 {
                return Err(UtkError::format(format!(
                    "unsupported WAVE format tag {format_tag} (only PCM is supported)"
                )));
            }
            channels = Some(u16::from_le_bytes([fmt_body[2], fmt_body[3]]));
            sample_rate = Some(u32::from_le_bytes([fmt_body[4], fmt_body[5], fmt_body[6], fmt_body[7]]));
            bits_per_sample = Some(u16::from_le_bytes([fmt_body[14], fmt_body[15]]));
        } else if chunk_id == DATA {
            let mut data = vec![0u8; len];
            reader.read_exact(&mut data).map_err(|_| UtkError::truncated("WAVE data chunk"))?;
            let usable = data.len() - (data.len() % 2);
            let pcm = data[..usable]
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]))
                .collect();
            samples = Some(pcm);
            if len % 2 != 0 {
                let mut pad = [0u8; 1];
                let _ = reader.read(&mut pad); // RIFF chunks are word-aligned
            }
        } else {
            let mut skip = vec![0u8; len + (len % 2)];
            reader.read_exact(&mut skip).map_err(|_| UtkError::truncated("WAVE chunk body"))?;
        }
    }

    let channels = channels.ok_or_else(|| UtkError::format("WAVE file has no 'fmt ' chunk"))?;
    if channels != 1 {
        return Err(UtkError::format(format!(
            "unsupported channel count {channels} (only mono is supported)"
        )));
    }
    let bits_per_sample = bits_per_sample.unwrap_or(0);
    if bits_per_sample != 16 {
        return Err(UtkError::format(format!(
            "unsupported bit depth {bits_per_sample} (only 16-bit PCM is supported)"
        )));
    }
    let sample_rate = sample_rate.ok_or_else(|| UtkError::format("WAVE file has no 'fmt ' chunk"))?;
    let samples = samples.ok_or_else(|| UtkError::format("WAVE file has no 'data' chunk"))?;

    Ok(WaveFile {
        format: WaveFormat { sample_rate },
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_header_and_samples() {
        let samples = vec![0i16, 1000, -1000, 32767, -32768];
        let format = WaveFormat { sample_rate: 22050 };

        let mut bytes = Vec::new();
        write_wave(&mut bytes, format, &samples).unwrap();

        let parsed = read_wave(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(parsed.format, format);
        assert_eq!(parsed.samples, samples);
    }

    #[test]
    fn rejects_stereo() {
        let mut bytes = Vec::new();
        write_wave(&mut bytes, WaveFormat { sample_rate: 8000 }, &[0i16; 4]).unwrap();
        bytes[22] = 2; // nChannels, little-endian low byte
        assert!(matches!(read_wave(&mut Cursor::new(bytes)), Err(UtkError::Format { .. })));
    }
}
