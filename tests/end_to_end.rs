//! Cross-module scenarios from spec.md §8 that exercise more than one
//! container or more than one frame, and so don't fit naturally as a
//! `#[cfg(test)]` unit test next to a single module.

use std::io::Cursor;

use utk::bits::BitWriter;
use utk::containers::{ea, utm0, wave};
use utk::encoder::{UtkEncoder, UtkEncoderConfig};
use utk::types::{StreamParams, FRAME_LEN};

fn default_config(sample_rate: u32) -> UtkEncoderConfig {
    UtkEncoderConfig {
        params: StreamParams::defaults(),
        bitrate: 32_000,
        sample_rate,
    }
}

/// §8 scenario 1: null stream. 432 zero samples at 22050 Hz round-trip to
/// 432 zero samples, and the UTM0 header records `dwOutSize = 864`.
#[test]
fn null_stream_round_trips_and_reports_exact_byte_count() {
    let samples = vec![0i16; FRAME_LEN];

    let mut utk_bytes = Vec::new();
    utm0::encode(&mut utk_bytes, &samples, 22_050, default_config(22_050)).unwrap();

    // dwOutSize lives at header offset 4, little-endian u32.
    let out_size = u32::from_le_bytes(utk_bytes[4..8].try_into().unwrap());
    assert_eq!(out_size, 864);

    let mut wav_bytes = Vec::new();
    utm0::decode(&mut Cursor::new(utk_bytes), &mut wav_bytes).unwrap();
    let wav = wave::read_wave(&mut Cursor::new(wav_bytes)).unwrap();
    assert_eq!(wav.samples, vec![0i16; FRAME_LEN]);
}

/// §8 scenario 2: impulse. A single large sample at the very start of a
/// frame stays localized: the first subframe recovers most of the impulse's
/// energy, and nothing downstream blows up or wraps.
#[test]
fn impulse_reconstructs_with_bounded_localized_error() {
    let mut samples = vec![0i16; FRAME_LEN];
    samples[0] = 16_384;

    let mut utk_bytes = Vec::new();
    utm0::encode(&mut utk_bytes, &samples, 22_050, default_config(22_050)).unwrap();

    let mut wav_bytes = Vec::new();
    utm0::decode(&mut Cursor::new(utk_bytes), &mut wav_bytes).unwrap();
    let wav = wave::read_wave(&mut Cursor::new(wav_bytes)).unwrap();

    assert_eq!(wav.samples.len(), FRAME_LEN);
    // The impulse must show up somewhere in the first subframe (samples
    // 0..108): a codec that dropped it entirely would leave this subframe
    // silent.
    let peak = wav.samples[..108].iter().map(|&s| s.unsigned_abs()).max().unwrap();
    assert!(peak > 2048, "impulse was lost: peak={peak}");

    // Lossy but localized: later subframes should have decayed back toward
    // silence rather than carrying the impulse's full energy forward.
    let tail_peak = wav.samples[324..].iter().map(|&s| s.unsigned_abs()).max().unwrap();
    assert!(tail_peak < 16_384, "impulse energy leaked into the final subframe: {tail_peak}");
}

fn pt_metadata_ea(num_samples: u32, compression_type: u32) -> Vec<u8> {
    let mut body = vec![b'P', b'T', 0, 0];
    body.push(0xFD);
    body.push(0x85);
    body.push(4);
    body.extend_from_slice(&num_samples.to_be_bytes());
    body.push(0xA0);
    body.push(4);
    body.extend_from_slice(&compression_type.to_be_bytes());
    body.push(0xFF);
    body
}

fn write_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], body: &[u8]) {
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(&((body.len() + 8) as u32).to_le_bytes());
    out.extend_from_slice(body);
}

/// One frame's worth of bitstream decoding to all-zero PCM under the fixed
/// default stream parameters every legacy container assumes.
fn silent_frame_bytes(params: &StreamParams) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.write(20, 6);
    for _ in 0..3 {
        w.write(32, 6);
    }
    for _ in 0..8 {
        w.write(0, 5);
    }
    for _ in 0..4 {
        w.write(0, 8);
        w.write(0, 4);
        if params.halved_innovation {
            w.write(32 | (0 << 6) | (1 << 7), 8);
        } else {
            w.write(32, 6);
        }
        w.write(255 | ((54u32 - 7) << 8), 14);
    }
    w.pad_to_byte();
    let mut bytes = Vec::new();
    w.flush_full_bytes(&mut bytes).unwrap();
    bytes
}

/// §8 scenario 4: an EA file with two `SCDl` chunks and `num_samples = 540`
/// (one full 432-sample frame plus a 108-sample partial second frame) must
/// produce exactly 540 samples, split arbitrarily across the two chunks,
/// then expect `SCEl`.
#[test]
fn ea_stream_spanning_two_data_chunks_decodes_exact_sample_count() {
    let params = StreamParams::defaults();
    let frame_a = silent_frame_bytes(&params);
    let frame_b = silent_frame_bytes(&params);

    let mut file = Vec::new();
    write_chunk(&mut file, b"SCHl", &pt_metadata_ea(540, 4));
    write_chunk(&mut file, b"SCCl", &2u32.to_le_bytes());

    // First SCDl advertises the full first frame (432 samples).
    let mut scdl_a = Vec::new();
    scdl_a.extend_from_slice(&432u32.to_le_bytes());
    scdl_a.extend_from_slice(&0u32.to_le_bytes());
    scdl_a.push(0);
    scdl_a.extend_from_slice(&frame_a);
    write_chunk(&mut file, b"SCDl", &scdl_a);

    // Second SCDl advertises a second frame but the container only needs
    // 540 - 432 = 108 samples out of it; the reader must truncate, not
    // error, on the remaining 324.
    let mut scdl_b = Vec::new();
    scdl_b.extend_from_slice(&432u32.to_le_bytes());
    scdl_b.extend_from_slice(&0u32.to_le_bytes());
    scdl_b.push(0);
    scdl_b.extend_from_slice(&frame_b);
    write_chunk(&mut file, b"SCDl", &scdl_b);

    write_chunk(&mut file, b"SCEl", &[]);

    let mut wav_bytes = Vec::new();
    ea::decode(&mut Cursor::new(file), &mut wav_bytes).unwrap();

    let wav = wave::read_wave(&mut Cursor::new(wav_bytes)).unwrap();
    assert_eq!(wav.samples.len(), 540);
    assert_eq!(wav.samples, vec![0i16; 540]);
}

/// A multi-frame round trip through the full encoder -> bitstream -> decoder
/// path stays in lock-step: the encoder's own adaptive-codebook state must
/// mirror what a fresh decoder computes from its bitstream (§8's bit-exact
/// reconstruction invariant), so this doesn't diverge or panic across frame
/// boundaries.
#[test]
fn multi_frame_stream_with_nonzero_signal_round_trips_without_diverging() {
    let sample_rate = 22_050;
    let mut samples = Vec::with_capacity(FRAME_LEN * 3 + 50);
    for i in 0..samples.capacity() {
        let t = i as f32 / sample_rate as f32;
        samples.push((2000.0 * (2.0 * std::f32::consts::PI * 200.0 * t).sin()) as i16);
    }

    let mut encoder = UtkEncoder::new(default_config(sample_rate)).unwrap();
    let mut writer = BitWriter::new();
    for chunk in samples.chunks(FRAME_LEN) {
        encoder.encode_frame(&mut writer, chunk);
    }
    writer.pad_to_byte();
    let mut bytes = Vec::new();
    writer.flush_full_bytes(&mut bytes).unwrap();

    let mut decoder = utk::decoder::UtkDecoder::new(StreamParams::defaults());
    let mut reader = utk::bits::BitReader::new(Cursor::new(bytes));
    let num_frames = samples.len().div_ceil(FRAME_LEN);
    for _ in 0..num_frames {
        let frame = decoder.decode_frame(&mut reader).unwrap();
        for &s in &frame {
            assert!(s.is_finite() && s.abs() < 40_000.0, "decoder diverged: {s}");
        }
    }
}

/// Randomized multi-second stress test: arbitrary full-scale noise, run
/// through several frames of the real encoder/decoder pair via the UTM0
/// container, must decode without panicking or diverging, and must report
/// the exact sample count the header promises. Uses a fixed seed so CI runs
/// are deterministic.
#[test]
fn random_pcm_survives_many_frames_through_utm0_round_trip() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let sample_rate = 22_050;
    let num_frames = 10;
    let samples: Vec<i16> = (0..FRAME_LEN * num_frames + 37)
        .map(|_| rng.gen_range(i16::MIN..=i16::MAX))
        .collect();

    let mut utk_bytes = Vec::new();
    utm0::encode(&mut utk_bytes, &samples, sample_rate, default_config(sample_rate)).unwrap();

    let mut wav_bytes = Vec::new();
    utm0::decode(&mut Cursor::new(utk_bytes), &mut wav_bytes).unwrap();

    let wav = wave::read_wave(&mut Cursor::new(wav_bytes)).unwrap();
    assert_eq!(wav.samples.len(), samples.len());

    // Full-scale noise is the codec's worst case for stability: nothing
    // about it should make the synthesis filter diverge away from the
    // input's own amplitude range.
    let max_in = samples.iter().map(|&s| s.unsigned_abs()).max().unwrap();
    let max_out = wav.samples.iter().map(|&s| s.unsigned_abs()).max().unwrap();
    assert!(
        max_out <= max_in.saturating_mul(2),
        "decoder diverged on random input: max_in={max_in} max_out={max_out}"
    );
}
