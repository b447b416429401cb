//! Canonical 44-byte WAV header reading and writing.
//!
//! Only the canonical PCM/IEEE-float layout is handled: a `RIFF` chunk
//! holding a 16-byte `fmt ` block followed immediately by the `data`
//! chunk. That is the layout the resampler CLI produces and the one it
//! expects from its inputs; files with extension chunks are rejected
//! rather than skipped.

mod error;

pub use error::{Result, WavError};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use resample::SampleFormat;
use std::io::{Read, Seek, SeekFrom, Write};

/// Total header length of a canonical WAV file.
pub const HEADER_LEN: u32 = 44;

/// Audio format tag for integer PCM.
const FORMAT_PCM: u16 = 1;
/// Audio format tag for IEEE float.
const FORMAT_IEEE_FLOAT: u16 = 3;

/// Stream parameters carried by a WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Element type of the samples.
    pub sample_format: SampleFormat,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl WavSpec {
    /// The `fmt ` block audio format tag: 1 for integer PCM, 3 for float.
    pub fn format_tag(&self) -> u16 {
        if self.sample_format.is_float() {
            FORMAT_IEEE_FLOAT
        } else {
            FORMAT_PCM
        }
    }

    /// Bytes per frame.
    pub fn block_align(&self) -> u16 {
        (self.channels as usize * self.sample_format.bytes_per_sample()) as u16
    }

    /// Bytes per second.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Check that the frame size fits the header's 16-bit block-align
    /// field. The engine itself accepts arbitrary channel counts; the
    /// container cannot carry all of them.
    pub fn validate(&self) -> Result<()> {
        let bytes = self.sample_format.bytes_per_sample();
        if self.channels as usize * bytes > u16::MAX as usize {
            return Err(WavError::BlockAlignOverflow {
                channels: self.channels,
                bytes,
            });
        }
        Ok(())
    }

    /// Map a format tag and bit depth back to a sample format.
    fn from_tag_bits(tag: u16, bits: u16) -> Result<SampleFormat> {
        match (tag, bits) {
            (FORMAT_PCM, 16) => Ok(SampleFormat::Int16),
            (FORMAT_PCM, 32) => Ok(SampleFormat::Int32),
            (FORMAT_PCM, 64) => Ok(SampleFormat::Int64),
            (FORMAT_IEEE_FLOAT, 32) => Ok(SampleFormat::Float32),
            (FORMAT_IEEE_FLOAT, 64) => Ok(SampleFormat::Float64),
            (FORMAT_PCM | FORMAT_IEEE_FLOAT, _) => {
                Err(WavError::UnsupportedLayout { tag, bits })
            }
            _ => Err(WavError::UnsupportedCodec { tag }),
        }
    }
}

/// Read a canonical header, leaving the reader positioned at the first
/// data byte. Returns the stream parameters and the declared data size.
pub fn read_header<R: Read>(reader: &mut R) -> Result<(WavSpec, u32)> {
    let mut fourcc = [0u8; 4];

    reader.read_exact(&mut fourcc)?;
    if &fourcc != b"RIFF" {
        return Err(WavError::NotRiff);
    }
    let _riff_size = reader.read_u32::<LittleEndian>()?;

    reader.read_exact(&mut fourcc)?;
    if &fourcc != b"WAVE" {
        return Err(WavError::NotWave);
    }

    reader.read_exact(&mut fourcc)?;
    if &fourcc != b"fmt " {
        return Err(WavError::MissingChunk { chunk: "fmt " });
    }
    let fmt_size = reader.read_u32::<LittleEndian>()?;
    if fmt_size != 16 {
        return Err(WavError::UnsupportedFmtSize { size: fmt_size });
    }

    let tag = reader.read_u16::<LittleEndian>()?;
    let channels = reader.read_u16::<LittleEndian>()?;
    let sample_rate = reader.read_u32::<LittleEndian>()?;
    let _byte_rate = reader.read_u32::<LittleEndian>()?;
    let _block_align = reader.read_u16::<LittleEndian>()?;
    let bits = reader.read_u16::<LittleEndian>()?;

    if channels == 0 {
        return Err(WavError::ZeroChannels);
    }
    let sample_format = WavSpec::from_tag_bits(tag, bits)?;
    let spec = WavSpec {
        sample_format,
        channels,
        sample_rate,
    };
    spec.validate()?;

    reader.read_exact(&mut fourcc)?;
    if &fourcc != b"data" {
        return Err(WavError::MissingChunk { chunk: "data" });
    }
    let data_size = reader.read_u32::<LittleEndian>()?;

    Ok((spec, data_size))
}

/// Writer that emits a canonical header up front and patches the two size
/// fields once the data length is known.
///
/// Implements [`Write`] so it can sit directly under the resampling
/// engine; call [`finalize`](Self::finalize) when the stream is complete.
#[derive(Debug)]
pub struct WavWriter<W: Write + Seek> {
    inner: W,
    data_bytes: u64,
}

impl<W: Write + Seek> WavWriter<W> {
    /// Write the header with placeholder sizes and hand back the writer.
    pub fn new(mut inner: W, spec: WavSpec) -> Result<Self> {
        spec.validate()?;
        inner.write_all(b"RIFF")?;
        inner.write_u32::<LittleEndian>(0)?; // patched by finalize
        inner.write_all(b"WAVE")?;
        inner.write_all(b"fmt ")?;
        inner.write_u32::<LittleEndian>(16)?;
        inner.write_u16::<LittleEndian>(spec.format_tag())?;
        inner.write_u16::<LittleEndian>(spec.channels)?;
        inner.write_u32::<LittleEndian>(spec.sample_rate)?;
        inner.write_u32::<LittleEndian>(spec.byte_rate())?;
        inner.write_u16::<LittleEndian>(spec.block_align())?;
        inner.write_u16::<LittleEndian>(spec.sample_format.bits_per_sample())?;
        inner.write_all(b"data")?;
        inner.write_u32::<LittleEndian>(0)?; // patched by finalize
        Ok(Self {
            inner,
            data_bytes: 0,
        })
    }

    /// Number of data bytes written so far.
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    /// Patch the RIFF and data sizes, then return the underlying writer
    /// positioned at the end of the file.
    ///
    /// `RiffSize` is the final file size minus 8, the standard RIFF
    /// convention.
    pub fn finalize(mut self) -> Result<W> {
        let data = self.data_bytes as u32;

        self.inner.seek(SeekFrom::Start(4))?;
        self.inner.write_u32::<LittleEndian>(HEADER_LEN - 8 + data)?;
        self.inner.seek(SeekFrom::Start(40))?;
        self.inner.write_u32::<LittleEndian>(data)?;
        self.inner.seek(SeekFrom::End(0))?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write + Seek> Write for WavWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.data_bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
