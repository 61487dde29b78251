//! Suspension and resumption across arbitrarily small buffers.

use brotli::decode::stream::{BrotliDecoder, BrotliDecoderResult};
use brotli::{compress, decompress};

fn sample_data() -> Vec<u8> {
    let mut v = Vec::new();
    for i in 0..900u32 {
        v.extend_from_slice(format!("record {:05} body {} | ", i, i * 17 % 251).as_bytes());
    }
    v
}

#[test]
fn one_byte_input_chunks_decode_identically() {
    let data = sample_data();
    let compressed = compress(&data, 5, 18).expect("compress");
    let mut dec = BrotliDecoder::new();
    let mut out = Vec::new();
    let mut buf = [0u8; 512];
    for (i, &byte) in compressed.iter().enumerate() {
        let single = [byte];
        let mut input: &[u8] = &single;
        loop {
            let mut dst: &mut [u8] = &mut buf;
            let res = dec.decompress_stream(&mut input, &mut dst);
            let written = 512 - dst.len();
            out.extend_from_slice(&buf[..written]);
            match res {
                BrotliDecoderResult::NeedsMoreInput => break,
                BrotliDecoderResult::NeedsMoreOutput => continue,
                BrotliDecoderResult::Success => {
                    assert_eq!(i, compressed.len() - 1, "early success at byte {i}");
                    break;
                }
                BrotliDecoderResult::Error(e) => panic!("error at byte {i}: {e}"),
            }
        }
    }
    assert_eq!(out, data);
}

#[test]
fn tiny_output_buffers_decode_identically() {
    let data = sample_data();
    let compressed = compress(&data, 5, 18).expect("compress");
    let mut dec = BrotliDecoder::new();
    let mut out = Vec::new();
    let mut input: &[u8] = &compressed;
    loop {
        let mut buf = [0u8; 3];
        let mut dst: &mut [u8] = &mut buf;
        let res = dec.decompress_stream(&mut input, &mut dst);
        let written = 3 - dst.len();
        out.extend_from_slice(&buf[..written]);
        match res {
            BrotliDecoderResult::Success => break,
            BrotliDecoderResult::NeedsMoreOutput => continue,
            BrotliDecoderResult::NeedsMoreInput => panic!("complete stream starved"),
            BrotliDecoderResult::Error(e) => panic!("error: {e}"),
        }
    }
    assert_eq!(out, data);
}

#[test]
fn chunked_and_oneshot_agree() {
    let data = sample_data();
    let compressed = compress(&data, 7, 20).expect("compress");
    let oneshot = decompress(&compressed).expect("oneshot");
    // 13-byte input chunks, 7-byte output buffers.
    let mut dec = BrotliDecoder::new();
    let mut out = Vec::new();
    let mut done = false;
    for chunk in compressed.chunks(13) {
        let mut input: &[u8] = chunk;
        loop {
            let mut buf = [0u8; 7];
            let mut dst: &mut [u8] = &mut buf;
            let res = dec.decompress_stream(&mut input, &mut dst);
            let written = 7 - dst.len();
            out.extend_from_slice(&buf[..written]);
            match res {
                BrotliDecoderResult::NeedsMoreInput => break,
                BrotliDecoderResult::NeedsMoreOutput => continue,
                BrotliDecoderResult::Success => {
                    done = true;
                    break;
                }
                BrotliDecoderResult::Error(e) => panic!("error: {e}"),
            }
        }
        if done {
            break;
        }
    }
    assert!(done, "stream must complete");
    assert_eq!(out, oneshot);
    assert_eq!(out, data);
}
