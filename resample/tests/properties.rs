//! Property-based tests for the resampling engine.
//!
//! Uses proptest to verify the engine's quantified guarantees: identity at
//! equal rates, the output length formula, memoization and worker-count
//! equivalence, and robustness on arbitrary input.

use byteorder::{ByteOrder, LittleEndian};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use resample::{Quality, Resampler, ResamplerConfig, SampleFormat};

fn run(
    format: SampleFormat,
    in_rate: u32,
    out_rate: u32,
    channels: usize,
    config: ResamplerConfig,
    input: &[u8],
) -> Vec<u8> {
    let mut r =
        Resampler::with_config(Vec::new(), format, in_rate, out_rate, channels, config).unwrap();
    r.write(input).unwrap();
    r.into_inner()
}

fn linear() -> ResamplerConfig {
    ResamplerConfig::new().with_quality(Quality::Linear)
}

fn i16_bytes(values: &[i16]) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len() * 2];
    LittleEndian::write_i16_into(values, &mut bytes);
    bytes
}

// =============================================================================
// Identity: equal rates reproduce the input bytes exactly
// =============================================================================

proptest! {
    #[test]
    fn identity_i16(
        values in prop::collection::vec(any::<i16>(), 0..200),
        channels in 1usize..4,
        rate in 1u32..100_000,
    ) {
        let frames = values.len() / channels * channels;
        let input = i16_bytes(&values[..frames]);
        let output = run(SampleFormat::Int16, rate, rate, channels, linear(), &input);
        prop_assert_eq!(output, input);
    }

    #[test]
    fn identity_i32(
        values in prop::collection::vec(any::<i32>(), 0..100),
        channels in 1usize..4,
    ) {
        let frames = values.len() / channels * channels;
        let mut input = vec![0u8; frames * 4];
        LittleEndian::write_i32_into(&values[..frames], &mut input);
        let output = run(SampleFormat::Int32, 48_000, 48_000, channels, linear(), &input);
        prop_assert_eq!(output, input);
    }

    #[test]
    fn identity_i64(
        // Values inside f64's exact integer range; the accumulator is f64.
        values in prop::collection::vec(-(1i64 << 52)..(1i64 << 52), 0..100),
        channels in 1usize..4,
    ) {
        let frames = values.len() / channels * channels;
        let mut input = vec![0u8; frames * 8];
        LittleEndian::write_i64_into(&values[..frames], &mut input);
        let output = run(SampleFormat::Int64, 44_100, 44_100, channels, linear(), &input);
        prop_assert_eq!(output, input);
    }

    #[test]
    fn identity_f32(
        grid in prop::collection::vec(any::<i32>(), 0..100),
        channels in 1usize..4,
    ) {
        let values: Vec<f32> = grid.iter().map(|&v| v as f32).collect();
        let frames = values.len() / channels * channels;
        let mut input = vec![0u8; frames * 4];
        LittleEndian::write_f32_into(&values[..frames], &mut input);
        let output = run(SampleFormat::Float32, 96_000, 96_000, channels, linear(), &input);
        prop_assert_eq!(output, input);
    }

    #[test]
    fn identity_f64(
        grid in prop::collection::vec(any::<i32>(), 0..100),
        channels in 1usize..4,
    ) {
        let values: Vec<f64> = grid.iter().map(|&v| v as f64 / 65536.0).collect();
        let frames = values.len() / channels * channels;
        let mut input = vec![0u8; frames * 8];
        LittleEndian::write_f64_into(&values[..frames], &mut input);
        let output = run(SampleFormat::Float64, 8_000, 8_000, channels, linear(), &input);
        prop_assert_eq!(output, input);
    }
}

// =============================================================================
// Length formula: floor(frames * out_rate / in_rate)
// =============================================================================

proptest! {
    #[test]
    fn output_length_formula(
        frames in 0usize..400,
        in_rate in 1u32..500,
        out_rate in 1u32..500,
        channels in 1usize..4,
    ) {
        let values = vec![100i16; frames * channels];
        let input = i16_bytes(&values);
        let output = run(SampleFormat::Int16, in_rate, out_rate, channels, linear(), &input);

        let expected = frames as u64 * out_rate as u64 / in_rate as u64;
        prop_assert_eq!(output.len() as u64, expected * channels as u64 * 2);
    }
}

// =============================================================================
// Memoization equivalence
// =============================================================================

proptest! {
    #[test]
    fn memoization_equivalence_i16(
        values in prop::collection::vec(any::<i16>(), 1..300),
        in_rate in 1u32..50,
        out_rate in 1u32..50,
    ) {
        let input = i16_bytes(&values);
        let base = ResamplerConfig::new().with_quality(Quality::KaiserFastest);

        let memoized = run(
            SampleFormat::Int16, in_rate, out_rate, 1,
            base.clone().with_memoization(true), &input,
        );
        let direct = run(
            SampleFormat::Int16, in_rate, out_rate, 1,
            base.with_memoization(false), &input,
        );

        prop_assert_eq!(memoized.len(), direct.len());
        for (m, d) in memoized.chunks_exact(2).zip(direct.chunks_exact(2)) {
            let m = LittleEndian::read_i16(m);
            let d = LittleEndian::read_i16(d);
            prop_assert!((m as i32 - d as i32).abs() <= 1, "{} vs {}", m, d);
        }
    }
}

// =============================================================================
// Parallel determinism: output bytes are independent of the worker count
// =============================================================================

proptest! {
    #[test]
    fn worker_count_determinism(
        values in prop::collection::vec(any::<i16>(), 1..400),
        in_rate in 1u32..200,
        out_rate in 1u32..200,
    ) {
        let input = i16_bytes(&values);
        let reference = run(
            SampleFormat::Int16, in_rate, out_rate, 1,
            ResamplerConfig::new().sequential(), &input,
        );
        for workers in [2usize, 5, 16] {
            let out = run(
                SampleFormat::Int16, in_rate, out_rate, 1,
                ResamplerConfig::new().with_workers(workers), &input,
            );
            prop_assert_eq!(&reference, &out, "workers = {}", workers);
        }
    }
}

// =============================================================================
// Robustness: arbitrary bytes, rates and channel counts never panic
// =============================================================================

proptest! {
    #[test]
    fn arbitrary_input_never_panics(
        bytes in prop::collection::vec(any::<u8>(), 0..256),
        in_rate in 1u32..500,
        out_rate in 1u32..500,
        channels in 1usize..6,
        memoization in any::<bool>(),
    ) {
        let config = ResamplerConfig::new()
            .with_quality(Quality::KaiserFastest)
            .with_memoization(memoization);
        let mut r = Resampler::with_config(
            Vec::new(), SampleFormat::Int16, in_rate, out_rate, channels, config,
        ).unwrap();
        prop_assert!(r.write(&bytes).is_ok());
    }
}

// =============================================================================
// Multi-channel separability
// =============================================================================

#[test]
fn test_interleaved_copies_resample_independently() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mono: Vec<i16> = (0..2000).map(|_| rng.gen_range(-20_000..20_000)).collect();

    let mono_out = run(
        SampleFormat::Int16,
        44_100,
        48_000,
        1,
        ResamplerConfig::new(),
        &i16_bytes(&mono),
    );

    let channels = 3;
    let interleaved: Vec<i16> = mono
        .iter()
        .flat_map(|&s| std::iter::repeat(s).take(channels))
        .collect();
    let multi_out = run(
        SampleFormat::Int16,
        44_100,
        48_000,
        channels,
        ResamplerConfig::new(),
        &i16_bytes(&interleaved),
    );

    assert_eq!(multi_out.len(), mono_out.len() * channels);
    for (frame, mono_sample) in multi_out
        .chunks_exact(2 * channels)
        .zip(mono_out.chunks_exact(2))
    {
        for channel_sample in frame.chunks_exact(2) {
            assert_eq!(channel_sample, mono_sample);
        }
    }
}
