//! E2E: error propagation and engine lifecycle after failures.

use brotli::decode::stream::{BrotliDecoder, BrotliDecoderResult};
use brotli::encode::stream::{BrotliEncoder, BrotliEncoderOperation, BrotliEncoderParameter};
use brotli::encode::types::EncoderError;
use brotli::BrotliDecoderError;

#[test]
fn oneshot_parameter_errors_are_recoverable() {
    // A rejected parameter set leaves the caller free to retry.
    assert_eq!(
        brotli::compress(b"data", 99, 22),
        Err(EncoderError::InvalidParameter)
    );
    assert!(brotli::compress(b"data", 9, 22).is_ok());
}

#[test]
fn set_parameter_rejection_leaves_encoder_usable() {
    let mut enc = BrotliEncoder::new();
    // Invalid block bits are rejected up front without touching state.
    assert!(!enc.set_parameter(BrotliEncoderParameter::Lgblock(5)));
    assert!(enc.set_parameter(BrotliEncoderParameter::Quality(5)));
    let mut input: &[u8] = b"still works";
    let mut buf = [0u8; 256];
    let mut total = Vec::new();
    loop {
        let mut dst: &mut [u8] = &mut buf;
        assert!(enc.compress_stream(
            BrotliEncoderOperation::Finish,
            &mut input,
            &mut dst
        ));
        let written = 256 - dst.len();
        total.extend_from_slice(&buf[..written]);
        if enc.is_finished() {
            break;
        }
    }
    assert_eq!(brotli::decompress(&total).expect("valid"), b"still works");
}

#[test]
fn decoder_error_is_terminal_and_input_independent() {
    let mut dec = BrotliDecoder::new();
    let mut buf = [0u8; 64];
    let mut input: &[u8] = &[0x11]; // reserved window code
    let mut dst: &mut [u8] = &mut buf;
    let first = dec.decompress_stream(&mut input, &mut dst);
    assert_eq!(
        first,
        BrotliDecoderResult::Error(BrotliDecoderError::InvalidWindowBits)
    );
    // Feeding a perfectly valid stream afterwards changes nothing.
    let good = brotli::compress(b"ok", 5, 16).expect("compress");
    let mut input: &[u8] = &good;
    let mut dst: &mut [u8] = &mut buf;
    assert_eq!(dec.decompress_stream(&mut input, &mut dst), first);
}

#[test]
fn unsupported_features_are_named() {
    // Hand-build a stream with two literal block types: valid per the wire
    // format, outside this decoder's subset.
    use brotli::encode::bit_writer::BitWriter;
    let mut w = BitWriter::new(0, 1); // lgwin 16 header
    w.write_bits(1, 1); // ISLAST
    w.write_bits(1, 0); // ISLASTEMPTY = 0
    w.write_bits(2, 0); // MNIBBLES = 4
    w.write_bits(16, 0); // MLEN = 1
    w.write_bits(1, 1); // NBLTYPESL: "1..." → ≥ 2 block types
    w.write_bits(3, 0); // count code 0 → value 2
    w.jump_to_byte_boundary();
    w.write_bits(8, 0);
    let mut dec = BrotliDecoder::new();
    let mut input: &[u8] = w.full_bytes();
    let mut buf = [0u8; 16];
    let mut dst: &mut [u8] = &mut buf;
    match dec.decompress_stream(&mut input, &mut dst) {
        BrotliDecoderResult::Error(BrotliDecoderError::Unsupported(what)) => {
            assert!(what.contains("block types"));
        }
        other => panic!("expected a named Unsupported error, got {other:?}"),
    }
}

#[test]
fn needs_more_input_is_not_an_error_state() {
    let data = b"recoverable suspension".to_vec();
    let compressed = brotli::compress(&data, 5, 16).expect("compress");
    let (head, tail) = compressed.split_at(3);
    let mut dec = BrotliDecoder::new();
    let mut buf = [0u8; 256];
    let mut input: &[u8] = head;
    let mut dst: &mut [u8] = &mut buf;
    assert_eq!(
        dec.decompress_stream(&mut input, &mut dst),
        BrotliDecoderResult::NeedsMoreInput
    );
    // Supplying the rest completes normally.
    let mut input: &[u8] = tail;
    let mut out = Vec::new();
    loop {
        let mut dst: &mut [u8] = &mut buf;
        let res = dec.decompress_stream(&mut input, &mut dst);
        let written = 256 - dst.len();
        out.extend_from_slice(&buf[..written]);
        match res {
            BrotliDecoderResult::Success => break,
            BrotliDecoderResult::NeedsMoreOutput => continue,
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(out, data);
}
