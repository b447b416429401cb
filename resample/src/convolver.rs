//! Per-write working state and the wing convolution driver.
//!
//! A [`Convolver`] owns the decode, output, scratch and encode buffers so
//! that repeated `write` calls do not reallocate. The driver partitions
//! output frames into contiguous batches and computes them on parallel
//! workers; every frame reads disjoint input indices with the same weights
//! and the serialization order is fixed, so the emitted bytes are
//! independent of the worker count.

use crate::error::{Error, Result};
use crate::filter::FilterTable;
use crate::format::Sample;
use rayon::prelude::*;
use std::io::Write;

#[derive(Debug)]
pub(crate) struct Convolver {
    in_rate: u32,
    out_rate: u32,
    channels: usize,
    workers: usize,
    /// Input frames per output frame: `in_rate / out_rate`.
    time_increment: f64,
    /// Decoded f64 view of the whole input block.
    samples: Vec<f64>,
    /// Accumulated output, one f64 per sample.
    output: Vec<f64>,
    /// Per-worker channel accumulators, `channels` slots per batch.
    scratch: Vec<f64>,
    /// Little-endian encoding of `output`.
    encoded: Vec<u8>,
}

impl Convolver {
    pub fn new(in_rate: u32, out_rate: u32, channels: usize, workers: usize) -> Self {
        Self {
            in_rate,
            out_rate,
            channels,
            workers,
            time_increment: in_rate as f64 / out_rate as f64,
            samples: Vec::new(),
            output: Vec::new(),
            scratch: Vec::new(),
            encoded: Vec::new(),
        }
    }

    /// Convolve the frames in `input[start..end]` (byte offsets) against
    /// the filter, using the whole of `input` for wing context on both
    /// sides, and append the encoded result to `sink`.
    ///
    /// Returns the number of output frames emitted.
    pub fn resample<T: Sample, W: Write>(
        &mut self,
        table: &FilterTable,
        input: &[u8],
        start: usize,
        end: usize,
        processed: u64,
        sink: &mut W,
    ) -> Result<u64> {
        self.decode::<T>(input);

        let frame_bytes = T::SIZE * self.channels;
        let start_frame = start / frame_bytes;
        let in_frames = (end - start) / frame_bytes;
        let out_frames = output_frames(in_frames, self.in_rate, self.out_rate);

        self.output.clear();
        self.output.resize(out_frames * self.channels, 0.0);
        self.convolve(table, start_frame, processed);

        self.encode::<T>();
        sink.write_all(&self.encoded)
            .map_err(|source| Error::Sink { source })?;
        Ok(out_frames as u64)
    }

    /// Decode little-endian elements into the f64 sample buffer.
    fn decode<T: Sample>(&mut self, input: &[u8]) {
        self.samples.clear();
        self.samples
            .extend(input.chunks_exact(T::SIZE).map(|c| T::read_le(c).to_f64()));
    }

    /// Encode the accumulated output as little-endian elements.
    fn encode<T: Sample>(&mut self) {
        self.encoded.clear();
        self.encoded.resize(self.output.len() * T::SIZE, 0);
        for (chunk, &value) in self.encoded.chunks_exact_mut(T::SIZE).zip(&self.output) {
            T::from_f64(value).write_le(chunk);
        }
    }

    /// Fill `output` by convolving `samples` against the filter window.
    ///
    /// `start_frame` is the input frame the first output frame is anchored
    /// to; `processed` is the engine's session frame counter, which fixes
    /// the cross-call phase.
    fn convolve(&mut self, table: &FilterTable, start_frame: usize, processed: u64) {
        let channels = self.channels;
        let frames = self.output.len() / channels;
        if frames == 0 || self.samples.is_empty() {
            return;
        }

        let mut workers = self.workers;
        if frames < workers {
            workers = 1;
        }
        let per_batch = frames.div_ceil(workers);
        let batches = frames.div_ceil(per_batch);

        self.scratch.clear();
        self.scratch.resize(batches * channels, 0.0);

        let samples: &[f64] = &self.samples;
        let total_frames = samples.len() / channels;
        let dt = self.time_increment;
        let phi = phase_offset(processed, self.in_rate, self.out_rate);
        let memoized = table.is_memoized();

        let run_batch = |batch: usize, out: &mut [f64], acc: &mut [f64]| {
            let first_frame = batch * per_batch;
            for (local, frame_out) in out.chunks_exact_mut(channels).enumerate() {
                let out_frame = first_frame + local;
                let in_time = out_frame as f64 * dt;
                // min() guards f64 rounding at the block edge
                let in_frame = (in_time as usize + start_frame).min(total_frames - 1);

                if memoized {
                    let global = processed + out_frame as u64;
                    calc_frame_memoized(table, samples, channels, acc, global, in_frame);
                } else {
                    let offset = (in_time + phi).fract();
                    calc_frame(table, samples, channels, acc, offset, in_frame);
                }

                for (slot, value) in frame_out.iter_mut().zip(acc.iter_mut()) {
                    *slot = *value;
                    *value = 0.0;
                }
            }
        };

        if batches == 1 {
            run_batch(0, &mut self.output, &mut self.scratch[..channels]);
        } else {
            self.output
                .par_chunks_mut(per_batch * channels)
                .zip(self.scratch.par_chunks_mut(channels))
                .enumerate()
                .for_each(|(batch, (out, acc))| run_batch(batch, out, acc));
        }
    }
}

/// Accumulate one output frame, interpolating weights from the window.
fn calc_frame(
    table: &FilterTable,
    samples: &[f64],
    channels: usize,
    acc: &mut [f64],
    offset: f64,
    in_frame: usize,
) {
    let frames = samples.len() / channels;

    // Left wing, including the center element.
    let taps = table.wing_length(offset).min(in_frame + 1);
    for i in 0..taps {
        let weight = table.value(offset, i);
        let base = (in_frame - i) * channels;
        for (a, s) in acc.iter_mut().zip(&samples[base..base + channels]) {
            *a += weight * s;
        }
    }

    // Right wing.
    let offset = 1.0 - offset;
    let taps = table.wing_length(offset).min(frames - 1 - in_frame);
    for i in 0..taps {
        let weight = table.value(offset, i);
        let base = (in_frame + 1 + i) * channels;
        for (a, s) in acc.iter_mut().zip(&samples[base..base + channels]) {
            *a += weight * s;
        }
    }
}

/// Accumulate one output frame from the precomputed phase rows.
fn calc_frame_memoized(
    table: &FilterTable,
    samples: &[f64],
    channels: usize,
    acc: &mut [f64],
    global_frame: u64,
    in_frame: usize,
) {
    let frames = samples.len() / channels;
    let phases = table.phases();

    // Left wing, including the center element.
    let phase = (global_frame % phases as u64) as usize;
    let row = table.phase_row(phase);
    let taps = row.len().min(in_frame + 1);
    for (i, &weight) in row[..taps].iter().enumerate() {
        let base = (in_frame - i) * channels;
        for (a, s) in acc.iter_mut().zip(&samples[base..base + channels]) {
            *a += weight * s;
        }
    }

    // Right wing: the mirrored phase row. Row 0 holds the center weight
    // already counted by the left wing, so it contributes from tap 1 on.
    let phase = (phases - phase) % phases;
    let row = table.phase_row(phase);
    let first = usize::from(phase == 0);
    let last = row.len().min(frames - 1 - in_frame).max(first);
    for (i, &weight) in row[first..last].iter().enumerate() {
        let base = (in_frame + 1 + i) * channels;
        for (a, s) in acc.iter_mut().zip(&samples[base..base + channels]) {
            *a += weight * s;
        }
    }
}

/// Output frame count for an input frame count: `floor(n * out / in)`.
pub(crate) fn output_frames(in_frames: usize, in_rate: u32, out_rate: u32) -> usize {
    (in_frames as u128 * out_rate as u128 / in_rate as u128) as usize
}

/// Fractional part of `processed * in_rate / out_rate`, from an exact
/// integer remainder so the cross-call phase does not drift over long
/// sessions.
fn phase_offset(processed: u64, in_rate: u32, out_rate: u32) -> f64 {
    ((processed as u128 * in_rate as u128) % out_rate as u128) as f64 / out_rate as f64
}
