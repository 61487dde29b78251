//! Decoder result and error taxonomy.

use core::fmt;

/// Decoder-side failures.  Every variant is terminal for the stream that
/// produced it; no resynchronization is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrotliDecoderError {
    /// The window-size header is malformed or names a reserved size.
    InvalidWindowBits,
    /// A meta-block length field violates the format.
    InvalidBlockLength,
    /// A serialized prefix code is over- or under-subscribed, or its
    /// code-length code cannot terminate.
    InvalidPrefixCode,
    /// A prefix-code symbol lies outside its alphabet or repeats.
    InvalidSymbol,
    /// A distance reaches behind the start of the window (or of the custom
    /// dictionary, when one is set).
    InvalidDistance,
    /// The stream ended mid-structure with no further input available.
    TruncatedStream,
    /// A reserved bit that must be zero was set.
    ReservedBitSet,
    /// The stream is valid but uses a feature outside the supported subset.
    Unsupported(&'static str),
}

impl fmt::Display for BrotliDecoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrotliDecoderError::InvalidWindowBits => f.write_str("invalid window size header"),
            BrotliDecoderError::InvalidBlockLength => f.write_str("invalid meta-block length"),
            BrotliDecoderError::InvalidPrefixCode => f.write_str("invalid prefix code"),
            BrotliDecoderError::InvalidSymbol => f.write_str("invalid prefix code symbol"),
            BrotliDecoderError::InvalidDistance => f.write_str("invalid backward distance"),
            BrotliDecoderError::TruncatedStream => f.write_str("truncated stream"),
            BrotliDecoderError::ReservedBitSet => f.write_str("reserved bit set"),
            BrotliDecoderError::Unsupported(what) => write!(f, "unsupported stream feature: {what}"),
        }
    }
}

impl std::error::Error for BrotliDecoderError {}
