//! The public engine: configuration validation, sample-format dispatch and
//! the byte-stream entry points.

use crate::config::ResamplerConfig;
use crate::convolver::Convolver;
use crate::error::{Error, Result};
use crate::filter::FilterTable;
use crate::format::SampleFormat;
use byteorder::{ByteOrder, LittleEndian};
use std::io::{Read, Write};
use tracing::{debug, trace};

/// Streaming tuning constant for the middle-block size: the working buffer
/// holds roughly this many input frames per worker-hint unit. Cache
/// residency heuristic, not a correctness parameter.
const FRAMES_PER_CORE_HINT: usize = 1024;

/// Streaming bandlimited sample-rate converter.
///
/// A `Resampler` is a single-session engine: it is created fresh
/// (`processed_frames = 0`), enters the session on the first emitted frame
/// and stays in it while [`write`](Self::write) and
/// [`read_from`](Self::read_from) advance the frame counter, and ends when
/// it is dropped or the sink is recovered with
/// [`into_inner`](Self::into_inner). Resampling another stream, or the
/// same stream at another rate pair, requires a new engine.
///
/// Input and output are interleaved little-endian PCM bytes with no
/// header or padding; one frame is `channels` elements.
pub struct Resampler<W: Write> {
    sink: W,
    format: SampleFormat,
    in_rate: u32,
    out_rate: u32,
    channels: usize,
    elem_size: usize,
    table: FilterTable,
    convolver: Convolver,
    workers: usize,
    /// Output frames emitted across all prior calls in this session;
    /// determines the starting phase of the next block.
    processed_frames: u64,
}

impl<W: Write> Resampler<W> {
    /// Create an engine with the default configuration (kaiser_fast,
    /// memoization on).
    pub fn new(
        sink: W,
        format: SampleFormat,
        in_rate: u32,
        out_rate: u32,
        channels: usize,
    ) -> Result<Self> {
        Self::with_config(
            sink,
            format,
            in_rate,
            out_rate,
            channels,
            ResamplerConfig::default(),
        )
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(
        sink: W,
        format: SampleFormat,
        in_rate: u32,
        out_rate: u32,
        channels: usize,
        config: ResamplerConfig,
    ) -> Result<Self> {
        if in_rate == 0 {
            return Err(Error::InvalidSampleRate { rate: in_rate });
        }
        if out_rate == 0 {
            return Err(Error::InvalidSampleRate { rate: out_rate });
        }
        if channels == 0 {
            return Err(Error::InvalidChannelCount { count: channels });
        }

        let table = FilterTable::new(config.quality, in_rate, out_rate, config.memoization)?;
        let workers = config.effective_workers();
        debug!(
            %format,
            in_rate,
            out_rate,
            channels,
            quality = %config.quality,
            memoization = config.memoization,
            workers,
            "resampler created"
        );

        Ok(Self {
            sink,
            format,
            in_rate,
            out_rate,
            channels,
            elem_size: format.bytes_per_sample(),
            table,
            convolver: Convolver::new(in_rate, out_rate, channels, workers),
            workers,
            processed_frames: 0,
        })
    }

    /// Input sample rate in Hz.
    pub fn in_rate(&self) -> u32 {
        self.in_rate
    }

    /// Output sample rate in Hz.
    pub fn out_rate(&self) -> u32 {
        self.out_rate
    }

    /// Number of interleaved channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Output frames emitted so far in this session.
    pub fn processed_frames(&self) -> u64 {
        self.processed_frames
    }

    /// End the session and recover the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Resample one interleaved byte block and append the encoded result
    /// to the sink.
    ///
    /// The block is treated as complete: every frame gets its full filter
    /// window as far as the block provides it, and trailing bytes beyond a
    /// whole frame are silently dropped. Successive calls continue the
    /// session phase, so a stream may be fed in pieces; for bounded-memory
    /// streaming with seamless block joins use
    /// [`read_from`](Self::read_from) instead.
    ///
    /// Returns the number of input bytes consumed (all of them).
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let frame_bytes = self.elem_size * self.channels;
        let whole = bytes.len() / frame_bytes * frame_bytes;

        let emitted = self.resample_block(&bytes[..whole], 0, whole)?;
        self.processed_frames += emitted;
        Ok(bytes.len())
    }

    /// Stream arbitrary-length input with bounded memory.
    ///
    /// The engine reads into a working buffer laid out as
    /// `[left wing][middle][right wing]`; each iteration convolves the
    /// whole buffer but emits only the middle, so every emitted frame sees
    /// all taps in its window and block joins are seamless.
    ///
    /// Returns the number of input bytes consumed. End of input is not an
    /// error.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> Result<u64> {
        let frame_bytes = self.elem_size * self.channels;
        let wing_frames = self.table.wing_length(0.0);
        let wing = wing_frames * frame_bytes;
        // The middle must cover at least one wing, or the head copy below
        // would reach before the buffer start.
        let hint = (self.workers * FRAMES_PER_CORE_HINT).max(wing_frames);
        let middle = hint.div_ceil(self.in_rate as usize) * self.in_rate as usize * frame_bytes;

        let mut buf = vec![0u8; middle + 2 * wing];
        let mut consumed = 0u64;

        // First fill: no left wing yet.
        let n = read_full(reader, &mut buf[..middle + wing])?;
        consumed += n as u64;
        if n < middle + wing {
            // Short stream: one self-contained block.
            let whole = n / frame_bytes * frame_bytes;
            let emitted = self.resample_block(&buf[..whole], 0, whole)?;
            self.processed_frames += emitted;
            return Ok(consumed);
        }

        // Prefix block: emit the middle, hold back the trailing wing.
        let emitted = self.resample_block(&buf[..middle + wing], 0, middle)?;
        self.processed_frames += emitted;
        buf.copy_within(middle - wing..middle + wing, 0);

        loop {
            let n = read_full(reader, &mut buf[2 * wing..2 * wing + middle])?;
            consumed += n as u64;
            trace!(consumed, "streaming iteration");

            if n < middle {
                // Final block: emit the held-back wing and the tail.
                let whole = n / frame_bytes * frame_bytes;
                let end = 2 * wing + whole;
                let emitted = self.resample_block(&buf[..end], wing, end)?;
                self.processed_frames += emitted;
                return Ok(consumed);
            }

            let emitted =
                self.resample_block(&buf[..2 * wing + middle], wing, wing + middle)?;
            self.processed_frames += emitted;
            buf.copy_within(middle..middle + 2 * wing, 0);
        }
    }

    /// Dispatch one block to the typed convolution body.
    fn resample_block(&mut self, input: &[u8], start: usize, end: usize) -> Result<u64> {
        let table = &self.table;
        let sink = &mut self.sink;
        let processed = self.processed_frames;
        match self.format {
            SampleFormat::Int16 => self
                .convolver
                .resample::<i16, W>(table, input, start, end, processed, sink),
            SampleFormat::Int32 => self
                .convolver
                .resample::<i32, W>(table, input, start, end, processed, sink),
            SampleFormat::Int64 => self
                .convolver
                .resample::<i64, W>(table, input, start, end, processed, sink),
            SampleFormat::Float32 => self
                .convolver
                .resample::<f32, W>(table, input, start, end, processed, sink),
            SampleFormat::Float64 => self
                .convolver
                .resample::<f64, W>(table, input, start, end, processed, sink),
        }
    }
}

impl<W: Write> std::fmt::Debug for Resampler<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resampler")
            .field("format", &self.format)
            .field("in_rate", &self.in_rate)
            .field("out_rate", &self.out_rate)
            .field("channels", &self.channels)
            .field("processed_frames", &self.processed_frames)
            .finish()
    }
}

/// Read until the buffer is full or the stream ends.
fn read_full<R: Read>(reader: &mut R, mut buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while !buf.is_empty() {
        match reader.read(&mut *buf) {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                let rest = buf;
                buf = &mut rest[n..];
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(source) => return Err(Error::Source { source }),
        }
    }
    Ok(total)
}

/// One-shot convenience wrapper: resample an i16 slice in memory.
///
/// Equal rates short-circuit to a copy of the input.
pub fn resample_int16(
    input: &[i16],
    in_rate: u32,
    out_rate: u32,
    channels: usize,
    quality: crate::Quality,
) -> Result<Vec<i16>> {
    if in_rate == 0 {
        return Err(Error::InvalidSampleRate { rate: in_rate });
    }
    if out_rate == 0 {
        return Err(Error::InvalidSampleRate { rate: out_rate });
    }
    if channels == 0 {
        return Err(Error::InvalidChannelCount { count: channels });
    }
    if in_rate == out_rate {
        return Ok(input.to_vec());
    }

    let mut bytes = vec![0u8; input.len() * 2];
    LittleEndian::write_i16_into(input, &mut bytes);

    let config = ResamplerConfig::new().with_quality(quality);
    let mut resampler = Resampler::with_config(
        Vec::new(),
        SampleFormat::Int16,
        in_rate,
        out_rate,
        channels,
        config,
    )?;
    resampler.write(&bytes)?;
    let sink = resampler.into_inner();

    let mut output = vec![0i16; sink.len() / 2];
    LittleEndian::read_i16_into(&sink, &mut output);
    Ok(output)
}
