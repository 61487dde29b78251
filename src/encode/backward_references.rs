//! Greedy match-finding and command emission.
//!
//! Walks one input block, querying the matcher at each position and turning
//! accepted matches into [`Command`]s.  Two heuristics shape the walk:
//!
//! - *Lazy matching*: a match is deferred by one byte (at most four times in
//!   a row) when the next position scores clearly better.
//! - *Sparse search*: after a long spree without matches the walk assumes
//!   incompressible data and stores only every 2nd/4th position, skipping
//!   match lookups entirely.

use crate::encode::command::{compute_distance_code, Command};
use crate::encode::types::{EncoderParams, MIN_QUALITY_FOR_EXTENSIVE_REFERENCE_SEARCH};
use crate::hash::types::{Hasher, HasherSearchResult, K_MIN_SCORE};
use crate::max_backward_limit;

/// Score margin a one-byte-later match must clear to defer emission.
const COST_DIFF_LAZY: u64 = 175;

/// Length of the no-match spree after which the sparse-search heuristics
/// engage.
fn literal_spree_length_for_sparse_search(params: &EncoderParams) -> usize {
    if params.quality < 9 {
        64
    } else {
        512
    }
}

/// Emits commands for `num_bytes` of new data starting at the (wrapped)
/// stream position `position`.
///
/// `last_insert_len` carries the pending literal run across block
/// boundaries; the final partial run is handed back through it rather than
/// emitted, because the next block may extend it or attach it to a match.
#[allow(clippy::too_many_arguments)]
pub fn create_backward_references(
    num_bytes: usize,
    position: usize,
    ringbuffer: &[u8],
    ringbuffer_mask: usize,
    params: &EncoderParams,
    hasher: &mut Hasher,
    dist_cache: &mut [i64; 4],
    last_insert_len: &mut usize,
    commands: &mut Vec<Command>,
    num_literals: &mut usize,
) {
    let max_backward = max_backward_limit(params.lgwin);
    let mut insert_length = *last_insert_len;
    let pos_end = position + num_bytes;
    let store_end = if num_bytes >= hasher.store_lookahead() {
        position + num_bytes - hasher.store_lookahead() + 1
    } else {
        position
    };
    let random_heuristics_window_size = literal_spree_length_for_sparse_search(params);
    let mut apply_random_heuristics = position + random_heuristics_window_size;
    let mut position = position;

    while position + hasher.hash_type_length() < pos_end {
        let mut max_length = pos_end - position;
        let max_distance = position.min(max_backward);
        let mut sr = HasherSearchResult::new(K_MIN_SCORE);
        let found = hasher.find_longest_match(
            ringbuffer,
            ringbuffer_mask,
            dist_cache,
            position,
            max_length,
            max_distance,
            &mut sr,
        );
        if found {
            // Found a match; look one byte ahead for something clearly
            // better before committing.
            let mut delayed_backward_references_in_row = 0;
            loop {
                max_length -= 1;
                let mut sr2 = HasherSearchResult::new(K_MIN_SCORE);
                sr2.len = if params.quality < MIN_QUALITY_FOR_EXTENSIVE_REFERENCE_SEARCH {
                    sr.len.saturating_sub(1).min(max_length)
                } else {
                    0
                };
                let max_distance2 = (position + 1).min(max_backward);
                let found2 = hasher.find_longest_match(
                    ringbuffer,
                    ringbuffer_mask,
                    dist_cache,
                    position + 1,
                    max_length,
                    max_distance2,
                    &mut sr2,
                );
                if found2 && sr2.score >= sr.score + COST_DIFF_LAZY {
                    // Emit one more literal and restart from the next byte.
                    position += 1;
                    insert_length += 1;
                    sr = sr2;
                    delayed_backward_references_in_row += 1;
                    if delayed_backward_references_in_row < 4
                        && position + hasher.hash_type_length() < pos_end
                    {
                        continue;
                    }
                }
                break;
            }
            apply_random_heuristics =
                position + 2 * sr.len + random_heuristics_window_size;
            let max_distance = position.min(max_backward);
            let distance_code = compute_distance_code(sr.distance, max_distance, dist_cache);
            if sr.distance <= max_distance && distance_code > 0 {
                dist_cache[3] = dist_cache[2];
                dist_cache[2] = dist_cache[1];
                dist_cache[1] = dist_cache[0];
                dist_cache[0] = sr.distance as i64;
            }
            commands.push(Command::new(
                insert_length,
                sr.len,
                (sr.len as i64 + sr.len_code_delta as i64) as usize,
                distance_code,
            ));
            *num_literals += insert_length;
            insert_length = 0;
            // Feed the matched span to the tables; positions too close to
            // the block end wait for the next stitch.
            hasher.store_range(
                ringbuffer,
                ringbuffer_mask,
                position + 2,
                (position + sr.len).min(store_end),
            );
            position += sr.len;
        } else {
            insert_length += 1;
            position += 1;
            // Unsuccessful lookups dominate the cost of incompressible
            // spans; widen the stride the longer the drought lasts.
            if position > apply_random_heuristics {
                if position > apply_random_heuristics + 4 * random_heuristics_window_size {
                    let k_margin = (hasher.store_lookahead() - 1).max(4);
                    let limit = pos_end.saturating_sub(k_margin);
                    let pos_jump = (position + 16).min(limit);
                    while position < pos_jump {
                        hasher.store(ringbuffer, ringbuffer_mask, position);
                        insert_length += 4;
                        position += 4;
                    }
                } else {
                    let k_margin = (hasher.store_lookahead() - 1).max(2);
                    let limit = pos_end.saturating_sub(k_margin);
                    let pos_jump = (position + 8).min(limit);
                    while position < pos_jump {
                        hasher.store(ringbuffer, ringbuffer_mask, position);
                        insert_length += 2;
                        position += 2;
                    }
                }
            }
        }
    }
    insert_length += pos_end - position;
    *last_insert_len = insert_length;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::types::{choose_hasher, EncoderParams};

    fn setup(quality: u32, data: &[u8]) -> (EncoderParams, Hasher, Vec<u8>) {
        let mut params = EncoderParams {
            quality,
            lgwin: 16,
            ..EncoderParams::default()
        };
        params.lgblock = crate::encode::types::compute_lgblock(&params);
        params.hasher = choose_hasher(&params);
        let mut hasher = Hasher::new(&params);
        let mut buf = data.to_vec();
        buf.extend_from_slice(&[0u8; 8]);
        hasher.prepare(true, data.len(), &buf);
        (params, hasher, buf)
    }

    #[test]
    fn repetitive_input_becomes_copies() {
        let data: Vec<u8> = b"abcdefgh".iter().copied().cycle().take(256).collect();
        let (params, mut hasher, buf) = setup(5, &data);
        let mut dist_cache = [4i64, 11, 15, 16];
        let mut last_insert = 0usize;
        let mut commands = Vec::new();
        let mut num_literals = 0usize;
        create_backward_references(
            data.len(),
            0,
            &buf,
            usize::MAX,
            &params,
            &mut hasher,
            &mut dist_cache,
            &mut last_insert,
            &mut commands,
            &mut num_literals,
        );
        assert!(!commands.is_empty(), "periodic data must produce copies");
        // The literal prefix plus copies plus the pending tail must cover
        // the block exactly.
        let covered: usize = commands
            .iter()
            .map(|c| (c.insert_len + c.copy_len) as usize)
            .sum::<usize>()
            + last_insert;
        assert_eq!(covered, data.len());
        // The bulk must be copied, not emitted literally.
        assert!(num_literals < data.len() / 4);
        // Period-8 data repeats at distance 8.
        assert!(commands.iter().any(|c| c.copy_len > 0));
    }

    #[test]
    fn unique_input_stays_literal() {
        let data: Vec<u8> = (0..=255u8).collect();
        let (params, mut hasher, buf) = setup(5, &data);
        let mut dist_cache = [4i64, 11, 15, 16];
        let mut last_insert = 0usize;
        let mut commands = Vec::new();
        let mut num_literals = 0usize;
        create_backward_references(
            data.len(),
            0,
            &buf,
            usize::MAX,
            &params,
            &mut hasher,
            &mut dist_cache,
            &mut last_insert,
            &mut commands,
            &mut num_literals,
        );
        let covered: usize = commands
            .iter()
            .map(|c| (c.insert_len + c.copy_len) as usize)
            .sum::<usize>()
            + last_insert;
        assert_eq!(covered, data.len());
        assert!(commands.iter().all(|c| c.copy_len == 0) || commands.is_empty());
    }

    #[test]
    fn distance_cache_tracks_emitted_distances() {
        let data: Vec<u8> = b"0123456789ABCDEF".iter().copied().cycle().take(512).collect();
        let (params, mut hasher, buf) = setup(5, &data);
        let mut dist_cache = [4i64, 11, 15, 16];
        let mut last_insert = 0usize;
        let mut commands = Vec::new();
        let mut num_literals = 0usize;
        create_backward_references(
            data.len(),
            0,
            &buf,
            usize::MAX,
            &params,
            &mut hasher,
            &mut dist_cache,
            &mut last_insert,
            &mut commands,
            &mut num_literals,
        );
        // Period-16 copies must have pushed 16 to the cache front.
        assert!(commands.iter().any(|c| c.copy_len > 0));
        assert_eq!(dist_cache[0], 16);
    }

    #[test]
    fn coverage_invariant_across_qualities() {
        let mut data = Vec::new();
        for i in 0..600u32 {
            data.extend_from_slice(format!("token-{} ", i % 37).as_bytes());
        }
        for q in [2u32, 4, 5, 7, 9, 10] {
            let (params, mut hasher, buf) = setup(q, &data);
            let mut dist_cache = [4i64, 11, 15, 16];
            let mut last_insert = 0usize;
            let mut commands = Vec::new();
            let mut num_literals = 0usize;
            create_backward_references(
                data.len(),
                0,
                &buf,
                usize::MAX,
                &params,
                &mut hasher,
                &mut dist_cache,
                &mut last_insert,
                &mut commands,
                &mut num_literals,
            );
            let covered: usize = commands
                .iter()
                .map(|c| (c.insert_len + c.copy_len) as usize)
                .sum::<usize>()
                + last_insert;
            assert_eq!(covered, data.len(), "quality {q} lost bytes");
            for c in &commands {
                assert!(c.copy_len == 0 || c.copy_len >= 2, "degenerate copy at q{q}");
            }
        }
    }
}
