//! E2E: one-shot round trips across the quality/window grid.

use brotli::{compress, decompress};

fn text_corpus(len: usize) -> Vec<u8> {
    let mut v = Vec::new();
    let mut i = 0u32;
    while v.len() < len {
        v.extend_from_slice(
            format!(
                "Packet {:06}: the compression window slides over repeated structure; \
                 field={} checksum={:08x}.\n",
                i,
                i % 97,
                (i as u64 * 2_654_435_761) & 0xFFFF_FFFF
            )
            .as_bytes(),
        );
        i += 1;
    }
    v.truncate(len);
    v
}

fn random_corpus(len: usize) -> Vec<u8> {
    let mut x = 0x9E37_79B9_7F4A_7C15u64;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            (x >> 24) as u8
        })
        .collect()
}

fn roundtrip(data: &[u8], quality: u32, lgwin: u32) {
    let compressed = compress(data, quality, lgwin)
        .unwrap_or_else(|e| panic!("compress failed at q{quality}/w{lgwin}: {e}"));
    let plain = decompress(&compressed)
        .unwrap_or_else(|e| panic!("decompress failed at q{quality}/w{lgwin}: {e}"));
    assert_eq!(
        plain, data,
        "round trip mismatch at q{quality}/w{lgwin} ({} bytes)",
        data.len()
    );
}

#[test]
fn text_roundtrips_across_grid() {
    let data = text_corpus(60_000);
    let small = &data[..8_000];
    for quality in 0..=9u32 {
        for lgwin in [10u32, 16, 22] {
            roundtrip(&data, quality, lgwin);
        }
    }
    // The tree matcher is expensive per byte; keep its inputs smaller.
    for quality in [10u32, 11] {
        for lgwin in [10u32, 16] {
            roundtrip(small, quality, lgwin);
        }
    }
    roundtrip(&data, 9, 24);
    roundtrip(small, 11, 24);
}

#[test]
fn degenerate_inputs_roundtrip() {
    for quality in [0u32, 1, 2, 4, 5, 7, 9, 11] {
        roundtrip(b"", quality, 16);
        roundtrip(b"a", quality, 16);
        roundtrip(b"ab", quality, 10);
        roundtrip(&[0u8; 40_000], quality, 16);
    }
}

#[test]
fn thirteen_repeated_bytes_compress_below_input() {
    let data = b"aaaaaaaaaaaaa"; // 13 bytes
    let compressed = compress(data, 9, 22).expect("compress");
    assert!(
        compressed.len() < 13,
        "repetition must be exploited: got {} bytes",
        compressed.len()
    );
    assert_eq!(decompress(&compressed).expect("decompress"), data);
}

#[test]
fn incompressible_data_survives_and_stays_bounded() {
    let data = random_corpus(30_000);
    for quality in [2u32, 5, 9] {
        let compressed = compress(&data, quality, 18).expect("compress");
        // The raw fallback bounds expansion to headers only.
        assert!(
            compressed.len() < data.len() + 256,
            "q{quality} expanded too much: {}",
            compressed.len()
        );
        assert_eq!(decompress(&compressed).expect("decompress"), data);
    }
}

#[test]
fn window_wrap_roundtrips() {
    // lgwin 10 with 150 KB forces many laps around the ring buffer.
    let data = text_corpus(150_000);
    for quality in [2u32, 5, 9] {
        roundtrip(&data, quality, 10);
    }
    // Input exactly one window long.
    let one_window = &data[..1 << 10];
    roundtrip(one_window, 5, 10);
}

#[test]
fn quality_monotonicity_soft() {
    let data = text_corpus(30_000);
    let low = compress(&data, 1, 22).expect("q1").len();
    let high = compress(&data, 11, 22).expect("q11").len();
    assert!(
        high <= low,
        "quality 11 ({high}) should not lose to quality 1 ({low}) on redundant text"
    );
}

#[test]
fn compression_actually_compresses_redundant_data() {
    let data = text_corpus(60_000);
    for quality in [4u32, 7, 9] {
        let compressed = compress(&data, quality, 22).expect("compress");
        assert!(
            compressed.len() < data.len() / 2,
            "q{quality}: only reached {} of {}",
            compressed.len(),
            data.len()
        );
    }
}
