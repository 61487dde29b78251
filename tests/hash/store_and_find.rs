//! Store/lookup behavior shared by all matcher variants.

use brotli::encode::types::{choose_hasher, EncoderParams};
use brotli::hash::types::{Hasher, HasherSearchResult, K_MIN_SCORE};

const PHRASE: &[u8] = b"synchronize the state machine across suspension points. ";

fn build(quality: u32, lgwin: u32) -> Hasher {
    let mut p = EncoderParams {
        quality,
        lgwin,
        ..EncoderParams::default()
    };
    p.hasher = choose_hasher(&p);
    Hasher::new(&p)
}

fn corpus() -> Vec<u8> {
    let mut v: Vec<u8> = PHRASE.iter().copied().cycle().take(4 * PHRASE.len()).collect();
    v.extend_from_slice(&[0u8; 160]);
    v
}

#[test]
fn all_variants_find_a_planted_repeat() {
    let data = corpus();
    let period = PHRASE.len();
    // Quality/window pairs covering every variant family.
    for (q, w) in [
        (2u32, 22u32),
        (3, 22),
        (4, 22),
        (5, 16),
        (7, 16),
        (9, 16),
        (9, 22),
        (10, 16),
    ] {
        let mut h = build(q, w);
        h.prepare(false, 0, &data);
        let cur = 2 * period;
        for ix in 0..cur {
            h.store(&data, usize::MAX, ix);
        }
        let cache = [10_000i64, 10_001, 10_002, 10_003];
        let mut sr = HasherSearchResult::new(K_MIN_SCORE);
        let found = h.find_longest_match(
            &data,
            usize::MAX,
            &cache,
            cur,
            period - 8,
            1 << 15,
            &mut sr,
        );
        assert!(found, "variant for q{q}/w{w} missed the repeat");
        assert_eq!(sr.distance % period, 0, "q{q}/w{w} wrong distance");
        assert!(sr.len >= 8, "q{q}/w{w} short match: {}", sr.len);
    }
}

#[test]
fn stitch_restores_boundary_positions() {
    // Without stitching, the final 3 positions of a block are invisible to
    // the matcher; with it, a query right after the boundary can match them.
    let data = corpus();
    let period = PHRASE.len();
    let block_end = period;
    let mut h = build(5, 16);
    h.prepare(false, 0, &data);
    // Positions close to the block end could not be stored yet.
    for ix in 0..block_end - 3 {
        h.store(&data, usize::MAX, ix);
    }
    // The next block arrives; the boundary positions become hashable.
    h.stitch_to_previous_block(period, block_end, &data, usize::MAX);
    let cache = [10_000i64, 10_001, 10_002, 10_003];
    let mut sr = HasherSearchResult::new(K_MIN_SCORE);
    // Query one period after the last stitched position.
    let cur = block_end + period - 2;
    let found = h.find_longest_match(&data, usize::MAX, &cache, cur, 40, 1 << 15, &mut sr);
    assert!(found, "stitched positions must be reachable");
    assert_eq!(sr.distance % period, 0);
}
