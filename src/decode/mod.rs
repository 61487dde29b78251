//! Streaming decoder: resumable bit reader, prefix-code tables, and the
//! NEEDS_MORE_INPUT/NEEDS_MORE_OUTPUT state machine.

pub mod bit_reader;
pub mod huffman;
pub mod stream;
pub mod types;

pub use stream::{BrotliDecoder, BrotliDecoderResult};
pub use types::BrotliDecoderError;
