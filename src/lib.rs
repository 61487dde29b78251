// brotlir — pure-Rust Brotli streaming encoder and decoder

pub mod ringbuffer;
pub mod hash;
pub mod encode;
pub mod decode;
pub mod api;
pub mod cli;

// ── Version constants ─────────────────────────────────────────────────────────
pub const BROTLI_VERSION_MAJOR: u32 = 1;
pub const BROTLI_VERSION_MINOR: u32 = 0;
pub const BROTLI_VERSION_RELEASE: u32 = 0;
pub const BROTLI_VERSION_NUMBER: u32 =
    BROTLI_VERSION_MAJOR * 100 * 100 + BROTLI_VERSION_MINOR * 100 + BROTLI_VERSION_RELEASE;
pub const BROTLI_VERSION_STRING: &str = "1.0.0";

/// Returns the runtime version number.
pub fn version_number() -> u32 {
    BROTLI_VERSION_NUMBER
}

/// Returns the runtime version string.
pub fn version_string() -> &'static str {
    BROTLI_VERSION_STRING
}

// ── Format limits ─────────────────────────────────────────────────────────────
pub const BROTLI_MIN_WINDOW_BITS: u32 = 10;
pub const BROTLI_MAX_WINDOW_BITS: u32 = 24;
pub const BROTLI_MIN_INPUT_BLOCK_BITS: u32 = 16;
pub const BROTLI_MAX_INPUT_BLOCK_BITS: u32 = 24;
pub const BROTLI_MIN_QUALITY: u32 = 0;
pub const BROTLI_MAX_QUALITY: u32 = 11;

/// Distances never reach closer than this to the window size; the last 16
/// positions of the nominal window are unreachable on the wire.
pub const BROTLI_WINDOW_GAP: usize = 16;

/// Largest backward distance reachable with a `lgwin`-bit window.
pub fn max_backward_limit(lgwin: u32) -> usize {
    (1usize << lgwin) - BROTLI_WINDOW_GAP
}

// ── Top-level re-exports ──────────────────────────────────────────────────────
pub use api::{compress, decompress};
pub use decode::stream::{BrotliDecoder, BrotliDecoderResult};
pub use decode::types::BrotliDecoderError;
pub use encode::stream::{BrotliEncoder, BrotliEncoderOperation, BrotliEncoderParameter};
pub use encode::types::{EncoderError, EncoderMode};
