//! One-shot buffer APIs over the streaming engines.

use crate::decode::stream::{BrotliDecoder, BrotliDecoderResult};
use crate::decode::types::BrotliDecoderError;
use crate::encode::stream::{BrotliEncoder, BrotliEncoderOperation, BrotliEncoderParameter};
use crate::encode::types::EncoderError;

/// Compresses `input` in one call at the given quality and window size.
pub fn compress(input: &[u8], quality: u32, lgwin: u32) -> Result<Vec<u8>, EncoderError> {
    if quality > crate::BROTLI_MAX_QUALITY
        || !(crate::BROTLI_MIN_WINDOW_BITS..=crate::BROTLI_MAX_WINDOW_BITS).contains(&lgwin)
    {
        return Err(EncoderError::InvalidParameter);
    }
    let mut enc = BrotliEncoder::new();
    if !enc.set_parameter(BrotliEncoderParameter::Quality(quality))
        || !enc.set_parameter(BrotliEncoderParameter::Lgwin(lgwin))
    {
        return Err(EncoderError::InvalidParameter);
    }
    compress_with(&mut enc, input)
}

/// Drives `enc` over `input` with FINISH semantics, collecting all output.
/// The encoder may have been primed (parameters, custom dictionary) by the
/// caller.
pub fn compress_with(enc: &mut BrotliEncoder, input: &[u8]) -> Result<Vec<u8>, EncoderError> {
    let mut out = Vec::new();
    let mut chunk = [0u8; 4096];
    let chunk_len = chunk.len();
    let mut remaining = input;
    loop {
        let mut dst: &mut [u8] = &mut chunk;
        if !enc.compress_stream(BrotliEncoderOperation::Finish, &mut remaining, &mut dst) {
            return Err(EncoderError::Internal);
        }
        let written = chunk_len - dst.len();
        out.extend_from_slice(&chunk[..written]);
        if enc.is_finished() {
            return Ok(out);
        }
    }
}

/// Decompresses a complete stream in one call.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, BrotliDecoderError> {
    let mut dec = BrotliDecoder::new();
    decompress_with(&mut dec, input)
}

/// Drives `dec` over `input`, collecting all output.  A stream that still
/// wants input at the end is reported as truncated.
pub fn decompress_with(
    dec: &mut BrotliDecoder,
    input: &[u8],
) -> Result<Vec<u8>, BrotliDecoderError> {
    let mut out = Vec::new();
    let mut chunk = [0u8; 4096];
    let chunk_len = chunk.len();
    let mut remaining = input;
    loop {
        let mut dst: &mut [u8] = &mut chunk;
        let res = dec.decompress_stream(&mut remaining, &mut dst);
        let written = chunk_len - dst.len();
        out.extend_from_slice(&chunk[..written]);
        match res {
            BrotliDecoderResult::Success => return Ok(out),
            BrotliDecoderResult::NeedsMoreOutput => continue,
            BrotliDecoderResult::NeedsMoreInput => {
                return Err(BrotliDecoderError::TruncatedStream)
            }
            BrotliDecoderResult::Error(e) => return Err(e),
        }
    }
}
