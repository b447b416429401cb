//! Signal-quality checks for the Kaiser-class presets.

use byteorder::{ByteOrder, LittleEndian};
use resample::{Quality, Resampler, ResamplerConfig, SampleFormat};
use std::f64::consts::PI;

/// Generate a sine at `frequency` Hz sampled at `sample_rate` for
/// `seconds` seconds.
fn sine(sample_rate: u32, frequency: f64, seconds: u32) -> Vec<f64> {
    let frames = (sample_rate * seconds) as usize;
    (0..frames)
        .map(|i| (2.0 * PI * frequency * i as f64 / sample_rate as f64).sin())
        .collect()
}

fn f64_bytes(values: &[f64]) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len() * 8];
    LittleEndian::write_f64_into(values, &mut bytes);
    bytes
}

fn f64_values(bytes: &[u8]) -> Vec<f64> {
    let mut values = vec![0.0f64; bytes.len() / 8];
    LittleEndian::read_f64_into(bytes, &mut values);
    values
}

fn convert(input: &[f64], in_rate: u32, out_rate: u32, quality: Quality) -> Vec<f64> {
    let mut r = Resampler::with_config(
        Vec::new(),
        SampleFormat::Float64,
        in_rate,
        out_rate,
        1,
        ResamplerConfig::new().with_quality(quality),
    )
    .unwrap();
    r.write(&f64_bytes(input)).unwrap();
    f64_values(&r.into_inner())
}

/// Mean absolute error between two signals over a common interior region.
fn interior_mae(a: &[f64], b: &[f64], skip: usize) -> f64 {
    let len = a.len().min(b.len());
    assert!(len > 2 * skip, "signals too short for the interior window");
    let region = skip..len - skip;
    let sum: f64 = region
        .clone()
        .map(|i| (a[i] - b[i]).abs())
        .sum();
    sum / region.len() as f64
}

#[test]
fn test_kaiser_best_round_trip() {
    // 3-second 20 Hz sine at 8000 Hz, down to 125 Hz and back. The wings
    // span 0.4 s at this 64x ratio, so the comparison excludes 1 s at each
    // end and requires the interior to come back within 1% of full scale.
    let original = sine(8_000, 20.0, 3);

    let down = convert(&original, 8_000, 125, Quality::KaiserBest);
    assert_eq!(down.len(), 375);

    let back = convert(&down, 125, 8_000, Quality::KaiserBest);
    assert_eq!(back.len(), 24_000);

    let mae = interior_mae(&original, &back, 8_000);
    assert!(mae <= 0.01, "round-trip interior MAE {} > 0.01", mae);
}

#[test]
fn test_kaiser_fast_downsample_tracks_analytic_sine() {
    // Downsampling a clean in-band sine must land on the analytically
    // resampled signal away from the edges.
    let original = sine(8_000, 20.0, 3);
    let down = convert(&original, 8_000, 125, Quality::KaiserFast);
    let expected = sine(125, 20.0, 3);

    let mae = interior_mae(&expected, &down, 60);
    assert!(mae <= 0.01, "downsample interior MAE {} > 0.01", mae);
}

#[test]
fn test_kaiser_fast_upsample_tracks_analytic_sine() {
    let original = sine(125, 20.0, 3);
    let up = convert(&original, 125, 8_000, Quality::KaiserFast);
    let expected = sine(8_000, 20.0, 3);

    let mae = interior_mae(&expected, &up, 4_000);
    assert!(mae <= 0.01, "upsample interior MAE {} > 0.01", mae);
}

#[test]
fn test_presets_preserve_amplitude() {
    // Unity passband gain: a full-scale in-band sine keeps its RMS within
    // a few percent through every Kaiser preset.
    let original = sine(8_000, 100.0, 1);
    for quality in [
        Quality::KaiserFastest,
        Quality::KaiserFast,
        Quality::KaiserBest,
    ] {
        let up = convert(&original, 8_000, 12_000, quality);
        let interior = &up[2_000..up.len() - 2_000];
        let rms = (interior.iter().map(|v| v * v).sum::<f64>() / interior.len() as f64).sqrt();
        let expected = (0.5f64).sqrt();
        assert!(
            (rms - expected).abs() < 0.03,
            "{}: rms {} vs {}",
            quality,
            rms,
            expected
        );
    }
}
