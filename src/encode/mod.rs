//! Streaming encoder: parameters, match loop, entropy stage, and the
//! PROCESS/FLUSH/FINISH state machine.

pub mod backward_references;
pub mod bit_writer;
pub mod command;
pub mod huffman;
pub mod metablock;
pub mod stream;
pub mod types;

pub use stream::{BrotliEncoder, BrotliEncoderOperation, BrotliEncoderParameter};
pub use types::{EncoderError, EncoderMode, EncoderParams};
