//! Encoder stream-machine behavior through the public API.

use brotli::encode::stream::{BrotliEncoder, BrotliEncoderOperation, BrotliEncoderParameter};

fn collect(enc: &mut BrotliEncoder, op: BrotliEncoderOperation, mut input: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut chunk = [0u8; 256];
    loop {
        let mut dst: &mut [u8] = &mut chunk;
        assert!(enc.compress_stream(op, &mut input, &mut dst));
        let written = 256 - dst.len();
        out.extend_from_slice(&chunk[..written]);
        if input.is_empty() && written == 0 {
            break;
        }
    }
    out
}

#[test]
fn process_without_full_block_produces_no_output() {
    let mut enc = BrotliEncoder::new();
    enc.set_parameter(BrotliEncoderParameter::Quality(5));
    let out = collect(&mut enc, BrotliEncoderOperation::Process, b"tiny");
    assert!(out.is_empty(), "partial block must stay buffered");
    assert!(!enc.is_finished());
}

#[test]
fn full_block_triggers_emission_during_process() {
    let mut enc = BrotliEncoder::new();
    enc.set_parameter(BrotliEncoderParameter::Quality(2)); // lgblock = 14
    let data = vec![0x42u8; (1 << 14) + 100];
    let out = collect(&mut enc, BrotliEncoderOperation::Process, &data);
    assert!(
        !out.is_empty(),
        "a complete input block must be emitted without waiting for FINISH"
    );
}

#[test]
fn flush_then_finish_decodes_to_full_input() {
    let mut enc = BrotliEncoder::new();
    enc.set_parameter(BrotliEncoderParameter::Quality(5));
    let mut stream = collect(&mut enc, BrotliEncoderOperation::Flush, b"first half, ");
    let flushed_len = stream.len();
    assert!(flushed_len > 0);
    // Everything emitted so far decodes to the first chunk by itself.
    let mut dec = brotli::decode::stream::BrotliDecoder::new();
    let mut partial = Vec::new();
    let mut buf = [0u8; 256];
    let mut inp: &[u8] = &stream;
    loop {
        let mut dst: &mut [u8] = &mut buf;
        let r = dec.decompress_stream(&mut inp, &mut dst);
        let w = 256 - dst.len();
        partial.extend_from_slice(&buf[..w]);
        match r {
            brotli::decode::stream::BrotliDecoderResult::NeedsMoreInput => break,
            brotli::decode::stream::BrotliDecoderResult::NeedsMoreOutput => continue,
            other => panic!("unexpected result {other:?}"),
        }
    }
    assert_eq!(partial, b"first half, ");
    // Closing the stream completes the round trip.
    stream.extend_from_slice(&collect(
        &mut enc,
        BrotliEncoderOperation::Finish,
        b"second half.",
    ));
    let full = brotli::decompress(&stream).expect("full stream decodes");
    assert_eq!(full, b"first half, second half.");
}

#[test]
fn output_can_be_drained_one_byte_at_a_time() {
    let mut enc = BrotliEncoder::new();
    enc.set_parameter(BrotliEncoderParameter::Quality(4));
    let data: Vec<u8> = b"drip-feed the output buffer. "
        .iter()
        .copied()
        .cycle()
        .take(10_000)
        .collect();
    let mut input: &[u8] = &data;
    let mut out = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        let mut dst: &mut [u8] = &mut byte;
        assert!(enc.compress_stream(BrotliEncoderOperation::Finish, &mut input, &mut dst));
        if dst.is_empty() {
            out.push(byte[0]);
        } else if input.is_empty() {
            break;
        }
    }
    assert!(enc.is_finished());
    assert_eq!(brotli::decompress(&out).expect("decodes"), data);
}
