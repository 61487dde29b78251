//! E2E: custom-dictionary priming on both engines.

use brotli::api::{compress_with, decompress_with};
use brotli::encode::stream::{BrotliEncoder, BrotliEncoderParameter};
use brotli::BrotliDecoder;

fn dictionary() -> Vec<u8> {
    b"GET /api/v1/resources HTTP/1.1\r\nHost: example.net\r\nAccept: application/json\r\n"
        .to_vec()
}

fn payload() -> Vec<u8> {
    let mut v = Vec::new();
    for i in 0..40u32 {
        v.extend_from_slice(b"GET /api/v1/resources HTTP/1.1\r\nHost: example.net\r\n");
        v.extend_from_slice(format!("X-Request-Id: {i}\r\n\r\n").as_bytes());
    }
    v
}

fn compress_with_dict(data: &[u8], dict: Option<&[u8]>, quality: u32) -> Vec<u8> {
    let mut enc = BrotliEncoder::new();
    assert!(enc.set_parameter(BrotliEncoderParameter::Quality(quality)));
    assert!(enc.set_parameter(BrotliEncoderParameter::Lgwin(18)));
    if let Some(d) = dict {
        enc.set_custom_dictionary(d);
    }
    compress_with(&mut enc, data).expect("compress")
}

fn decompress_with_dict(
    stream: &[u8],
    dict: Option<&[u8]>,
) -> Result<Vec<u8>, brotli::BrotliDecoderError> {
    let mut dec = BrotliDecoder::new();
    if let Some(d) = dict {
        dec.set_custom_dictionary(d);
    }
    decompress_with(&mut dec, stream)
}

#[test]
fn dictionary_roundtrip_and_gain() {
    let dict = dictionary();
    let data = payload();
    let with = compress_with_dict(&data, Some(&dict), 7);
    let without = compress_with_dict(&data, None, 7);
    // The very first request line is only matchable through the dictionary.
    assert!(
        with.len() < without.len(),
        "dictionary gained nothing: {} vs {}",
        with.len(),
        without.len()
    );
    let plain = decompress_with_dict(&with, Some(&dict)).expect("decode with dict");
    assert_eq!(plain, data);
}

#[test]
fn missing_dictionary_fails_loudly() {
    let dict = dictionary();
    let data = payload();
    let with = compress_with_dict(&data, Some(&dict), 7);
    // Decoding without the dictionary must not silently return the data.
    match decompress_with_dict(&with, None) {
        Err(_) => {}
        Ok(out) => assert_ne!(out, data, "dictionary-less decode returned correct bytes"),
    }
}

#[test]
fn wrong_dictionary_corrupts_detectably() {
    let dict = dictionary();
    let data = payload();
    let with = compress_with_dict(&data, Some(&dict), 7);
    let mut wrong = dict.clone();
    for b in wrong.iter_mut() {
        *b = b.wrapping_add(1);
    }
    match decompress_with_dict(&with, Some(&wrong)) {
        Err(_) => {}
        Ok(out) => assert_ne!(out, data, "wrong dictionary decoded to the original"),
    }
}

#[test]
fn dictionary_longer_than_window_uses_tail() {
    // lgwin 10 window: only the final (1 << 10) - 16 dictionary bytes count.
    let mut dict = vec![b'x'; 4096];
    dict.extend_from_slice(b"trailing-marker-sequence");
    let data = b"trailing-marker-sequence trailing-marker-sequence".to_vec();
    let mut enc = BrotliEncoder::new();
    assert!(enc.set_parameter(BrotliEncoderParameter::Quality(5)));
    assert!(enc.set_parameter(BrotliEncoderParameter::Lgwin(10)));
    enc.set_custom_dictionary(&dict);
    let stream = compress_with(&mut enc, &data).expect("compress");
    let mut dec = BrotliDecoder::new();
    dec.set_custom_dictionary(&dict);
    let plain = decompress_with(&mut dec, &stream).expect("decompress");
    assert_eq!(plain, data);
}
