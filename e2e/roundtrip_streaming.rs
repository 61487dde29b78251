//! E2E: streaming determinism — chunking invariance and independent-instance
//! reproducibility.

use brotli::encode::stream::{BrotliEncoder, BrotliEncoderOperation, BrotliEncoderParameter};
use brotli::{compress, decompress};

fn corpus(len: usize) -> Vec<u8> {
    let mut v = Vec::new();
    let mut i = 0u32;
    while v.len() < len {
        v.extend_from_slice(format!("chunk {:04x} of the streaming corpus; ", i).as_bytes());
        i = i.wrapping_mul(69069).wrapping_add(1);
    }
    v.truncate(len);
    v
}

fn compress_chunked(data: &[u8], quality: u32, lgwin: u32, chunk_size: usize) -> Vec<u8> {
    let mut enc = BrotliEncoder::new();
    assert!(enc.set_parameter(BrotliEncoderParameter::Quality(quality)));
    assert!(enc.set_parameter(BrotliEncoderParameter::Lgwin(lgwin)));
    let mut out = Vec::new();
    let mut buf = [0u8; 1024];
    for chunk in data.chunks(chunk_size) {
        let mut input: &[u8] = chunk;
        while !input.is_empty() {
            let mut dst: &mut [u8] = &mut buf;
            assert!(enc.compress_stream(BrotliEncoderOperation::Process, &mut input, &mut dst));
            let written = 1024 - dst.len();
            out.extend_from_slice(&buf[..written]);
        }
        // Drain anything the full-block boundary produced.
        loop {
            let mut input: &[u8] = &[];
            let mut dst: &mut [u8] = &mut buf;
            assert!(enc.compress_stream(BrotliEncoderOperation::Process, &mut input, &mut dst));
            let written = 1024 - dst.len();
            if written == 0 {
                break;
            }
            out.extend_from_slice(&buf[..written]);
        }
    }
    loop {
        let mut input: &[u8] = &[];
        let mut dst: &mut [u8] = &mut buf;
        assert!(enc.compress_stream(BrotliEncoderOperation::Finish, &mut input, &mut dst));
        let written = 1024 - dst.len();
        out.extend_from_slice(&buf[..written]);
        if enc.is_finished() {
            break;
        }
    }
    out
}

#[test]
fn one_byte_chunks_match_oneshot_exactly() {
    let data = corpus(30_000);
    for (quality, lgwin) in [(2u32, 11u32), (5, 18), (9, 22)] {
        let oneshot = compress(&data, quality, lgwin).expect("oneshot");
        let chunked = compress_chunked(&data, quality, lgwin, 1);
        assert_eq!(
            chunked, oneshot,
            "1-byte chunking changed the bytes at q{quality}/w{lgwin}"
        );
    }
}

#[test]
fn odd_sized_chunks_match_oneshot_exactly() {
    let data = corpus(50_000);
    for chunk_size in [7usize, 1000, 16384, 49_999] {
        let oneshot = compress(&data, 5, 18).expect("oneshot");
        let chunked = compress_chunked(&data, 5, 18, chunk_size);
        assert_eq!(chunked, oneshot, "chunk size {chunk_size} changed the bytes");
    }
}

#[test]
fn independent_instances_are_deterministic() {
    let data = corpus(40_000);
    for quality in [2u32, 5, 9, 11] {
        let len = if quality >= 10 { 8_000 } else { data.len() };
        let a = compress(&data[..len], quality, 18).expect("a");
        let b = compress(&data[..len], quality, 18).expect("b");
        assert_eq!(a, b, "two engines diverged at q{quality}");
    }
}

#[test]
fn streamed_output_decodes_after_each_flush_boundary() {
    let data = corpus(20_000);
    let mut enc = BrotliEncoder::new();
    assert!(enc.set_parameter(BrotliEncoderParameter::Quality(5)));
    let mut stream = Vec::new();
    let mut buf = [0u8; 1024];
    let parts = [&data[..5_000], &data[5_000..11_111], &data[11_111..]];
    let mut expected = Vec::new();
    for part in &parts[..2] {
        expected.extend_from_slice(part);
        let mut input: &[u8] = part;
        loop {
            let mut dst: &mut [u8] = &mut buf;
            assert!(enc.compress_stream(BrotliEncoderOperation::Flush, &mut input, &mut dst));
            let written = 1024 - dst.len();
            stream.extend_from_slice(&buf[..written]);
            if input.is_empty() && written == 0 {
                break;
            }
        }
        // Everything emitted so far must decode to everything fed so far.
        let mut dec = brotli::BrotliDecoder::new();
        let mut got = Vec::new();
        let mut inp: &[u8] = &stream;
        loop {
            let mut obuf = [0u8; 2048];
            let mut dst: &mut [u8] = &mut obuf;
            let res = dec.decompress_stream(&mut inp, &mut dst);
            let written = 2048 - dst.len();
            got.extend_from_slice(&obuf[..written]);
            match res {
                brotli::BrotliDecoderResult::NeedsMoreInput => break,
                brotli::BrotliDecoderResult::NeedsMoreOutput => continue,
                brotli::BrotliDecoderResult::Success => break,
                brotli::BrotliDecoderResult::Error(e) => panic!("flush boundary corrupt: {e}"),
            }
        }
        assert_eq!(got, expected, "flush boundary must be decodable");
    }
    expected.extend_from_slice(parts[2]);
    let mut input: &[u8] = parts[2];
    loop {
        let mut dst: &mut [u8] = &mut buf;
        assert!(enc.compress_stream(BrotliEncoderOperation::Finish, &mut input, &mut dst));
        let written = 1024 - dst.len();
        stream.extend_from_slice(&buf[..written]);
        if enc.is_finished() {
            break;
        }
    }
    assert_eq!(decompress(&stream).expect("final"), expected);
}
