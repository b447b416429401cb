//! Error types for the resampling engine.

use std::io;
use thiserror::Error;

/// Result type for resampling operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or driving a resampler.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid sample rate specified.
    #[error("invalid sample rate: {rate} Hz (must be > 0)")]
    InvalidSampleRate { rate: u32 },

    /// Invalid channel count.
    #[error("invalid channel count: {count} (must be > 0)")]
    InvalidChannelCount { count: usize },

    /// Unknown sample format name.
    #[error("unknown sample format: {name:?}")]
    UnknownFormat { name: String },

    /// Unknown quality preset name.
    #[error("unknown quality preset: {name:?}")]
    UnknownQuality { name: String },

    /// Embedded filter resource absent or of unexpected length.
    #[error("filter resource {path:?}: expected {expected} samples, found {actual}")]
    FilterResource {
        path: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The output sink rejected bytes. The engine's phase state is
    /// undefined afterwards; discard the engine.
    #[error("writing resampled output")]
    Sink {
        #[source]
        source: io::Error,
    },

    /// The input stream failed with a non-EOF error. End of input itself
    /// is not an error.
    #[error("reading input stream")]
    Source {
        #[source]
        source: io::Error,
    },
}
