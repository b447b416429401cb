//! Error types for WAV header handling.

use thiserror::Error;

/// Result type for WAV operations.
pub type Result<T> = std::result::Result<T, WavError>;

/// Errors that can occur while reading or writing WAV headers.
#[derive(Debug, Error)]
pub enum WavError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing RIFF signature.
    #[error("not a RIFF file")]
    NotRiff,

    /// Missing WAVE form type.
    #[error("not a WAVE file")]
    NotWave,

    /// An expected chunk was absent or out of place.
    #[error("missing {chunk:?} chunk")]
    MissingChunk { chunk: &'static str },

    /// Format block size other than the canonical 16 bytes.
    #[error("unsupported fmt block size: {size}")]
    UnsupportedFmtSize { size: u32 },

    /// Audio format tag other than PCM (1) or IEEE float (3).
    #[error("unsupported audio format tag: {tag}")]
    UnsupportedCodec { tag: u16 },

    /// Codec tag and bit depth with no matching sample format.
    #[error("unsupported sample layout: format tag {tag}, {bits} bits")]
    UnsupportedLayout { tag: u16, bits: u16 },

    /// Zero channel count in the header.
    #[error("header declares zero channels")]
    ZeroChannels,

    /// Frame size too large for the 16-bit block-align field.
    #[error("block align overflow: {channels} channels of {bytes} bytes each")]
    BlockAlignOverflow { channels: u16, bytes: usize },
}
