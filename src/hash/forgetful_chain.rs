//! Forgetful-chain matchers (types 40, 41, 42).
//!
//! Approximates unbounded hash chaining within fixed memory: each bucket
//! heads a singly linked chain of positions whose links live in fixed-size
//! "banks" of slots and carry 16-bit position deltas.  Old links are
//! overwritten as banks recycle, so chains silently forget their tails.
//! Traversal is bounded by `max_hops`, which caps worst-case latency.
//!
//! An 8-bit truncated hash per absolute position gives O(1) rejection of
//! distance-cache candidates that cannot possibly match.

use crate::encode::types::{EncoderParams, K_HASH_MUL32};
use crate::hash::types::{
    backward_reference_score, backward_reference_score_using_last_distance, find_match_length,
    load32, HasherSearchResult, K_DISTANCE_CACHE_INDEX, K_DISTANCE_CACHE_OFFSET,
};

const BUCKET_BITS: u32 = 15;
const BUCKET_SIZE: usize = 1 << BUCKET_BITS;

/// One chain link: delta to the previous position with the same key, and the
/// bank slot holding that previous link.
#[derive(Clone, Copy, Default)]
struct Slot {
    delta: u16,
    next: u16,
}

/// Forgetful-chain matcher.
///
/// `CAPPED_CHAINS` selects the delta-overflow policy: a delta wider than 16
/// bits either terminates the chain (`true`: reset to 0) or saturates to
/// 0xFFFF and keeps walking (`false`).
pub struct HashForgetfulChain<
    const NUM_BANKS: usize,
    const BANK_BITS: u32,
    const NUM_LAST_DISTANCES_TO_CHECK: usize,
    const CAPPED_CHAINS: bool,
> {
    addr: Vec<u32>,
    head: Vec<u16>,
    /// Truncated hash per absolute position, for quick rejection of
    /// distance-cache candidates.
    tiny_hash: Vec<u8>,
    banks: Vec<Slot>,
    free_slot_idx: [u16; NUM_BANKS],
    max_hops: usize,
}

impl<
        const NUM_BANKS: usize,
        const BANK_BITS: u32,
        const NUM_LAST_DISTANCES_TO_CHECK: usize,
        const CAPPED_CHAINS: bool,
    > HashForgetfulChain<NUM_BANKS, BANK_BITS, NUM_LAST_DISTANCES_TO_CHECK, CAPPED_CHAINS>
{
    const BANK_SIZE: usize = 1 << BANK_BITS;

    pub fn new(params: &EncoderParams) -> Self {
        HashForgetfulChain {
            addr: vec![0u32; BUCKET_SIZE],
            head: vec![0u16; BUCKET_SIZE],
            tiny_hash: vec![0u8; 1 << 16],
            banks: vec![Slot::default(); NUM_BANKS * Self::BANK_SIZE],
            free_slot_idx: [0u16; NUM_BANKS],
            max_hops: (if params.quality > 6 { 7usize } else { 8 }) << (params.quality - 4),
        }
    }

    #[inline(always)]
    fn hash_bytes(data: &[u8], ix: usize) -> usize {
        let h = load32(data, ix).wrapping_mul(K_HASH_MUL32);
        (h >> (32 - BUCKET_BITS)) as usize
    }

    pub fn prepare(&mut self, one_shot: bool, input_size: usize, data: &[u8]) {
        let partial_prepare_threshold = BUCKET_SIZE >> 6;
        if one_shot && input_size <= partial_prepare_threshold {
            for i in 0..input_size {
                let bucket = Self::hash_bytes(data, i);
                self.addr[bucket] = 0xCCCC_CCCC;
                self.head[bucket] = 0xCCCC;
            }
        } else {
            // 0xCCCCCCCC sits beyond any wrapped position the engine can
            // produce, so every fresh chain terminates after its first node.
            for a in &mut self.addr {
                *a = 0xCCCC_CCCC;
            }
            for h in &mut self.head {
                *h = 0;
            }
        }
        for t in &mut self.tiny_hash {
            *t = 0;
        }
        self.free_slot_idx = [0u16; NUM_BANKS];
    }

    pub fn mem_size(&self) -> usize {
        self.addr.len() * core::mem::size_of::<u32>()
            + self.head.len() * core::mem::size_of::<u16>()
            + self.tiny_hash.len()
            + self.banks.len() * core::mem::size_of::<Slot>()
            + core::mem::size_of_val(&self.free_slot_idx)
    }

    /// Prepends `ix` to its key's chain and records the truncated hash for
    /// the position.
    #[inline]
    pub fn store(&mut self, data: &[u8], mask: usize, ix: usize) {
        let key = Self::hash_bytes(data, ix & mask);
        let bank = key & (NUM_BANKS - 1);
        let idx = (self.free_slot_idx[bank] as usize) & (Self::BANK_SIZE - 1);
        self.free_slot_idx[bank] = self.free_slot_idx[bank].wrapping_add(1);
        let mut delta = (ix as u32).wrapping_sub(self.addr[key]) as usize;
        self.tiny_hash[ix & 0xFFFF] = key as u8;
        if delta > 0xFFFF {
            delta = if CAPPED_CHAINS { 0 } else { 0xFFFF };
        }
        self.banks[bank * Self::BANK_SIZE + idx] = Slot {
            delta: delta as u16,
            next: self.head[key],
        };
        self.addr[key] = ix as u32;
        self.head[key] = idx as u16;
    }

    #[allow(clippy::too_many_arguments)]
    pub fn find_longest_match(
        &mut self,
        data: &[u8],
        mask: usize,
        dist_cache: &[i64; 4],
        cur_ix: usize,
        max_length: usize,
        max_backward: usize,
        out: &mut HasherSearchResult,
    ) -> bool {
        let cur_ix_masked = cur_ix & mask;
        let key = Self::hash_bytes(data, cur_ix_masked);
        let tiny_hash = key as u8;
        let mut is_match_found = false;
        out.len_code_delta = 0;

        // Distance-cache probes, gated by the truncated hash except for the
        // plain repeat (code 0), where even 2-byte matches pay off.
        for i in 0..NUM_LAST_DISTANCES_TO_CHECK {
            let backward = dist_cache[K_DISTANCE_CACHE_INDEX[i]] + K_DISTANCE_CACHE_OFFSET[i];
            if backward <= 0 {
                continue;
            }
            let backward = backward as usize;
            if backward > cur_ix {
                continue;
            }
            let prev_ix_abs = cur_ix - backward;
            if i > 0 && self.tiny_hash[prev_ix_abs & 0xFFFF] != tiny_hash {
                continue;
            }
            if backward > max_backward {
                continue;
            }
            let prev_ix = prev_ix_abs & mask;
            let best_len = out.len;
            if cur_ix_masked + best_len > mask
                || prev_ix + best_len > mask
                || data[cur_ix_masked + best_len] != data[prev_ix + best_len]
            {
                continue;
            }
            let len = find_match_length(data, prev_ix, cur_ix_masked, max_length);
            if len >= 2 {
                let score = backward_reference_score_using_last_distance(len, i);
                if out.score < score {
                    out.len = len;
                    out.distance = backward;
                    out.score = score;
                    is_match_found = true;
                }
            }
        }

        // Walk the chain, newest link first.
        {
            let bank = key & (NUM_BANKS - 1);
            let mut backward = 0usize;
            let mut hops = self.max_hops;
            let mut delta = (cur_ix as u32).wrapping_sub(self.addr[key]) as usize;
            let mut slot = self.head[key] as usize;
            while hops > 0 {
                hops -= 1;
                let last = slot;
                backward = backward.wrapping_add(delta);
                if backward > max_backward || (CAPPED_CHAINS && delta == 0) {
                    break;
                }
                let link = self.banks[bank * Self::BANK_SIZE + last];
                slot = link.next as usize;
                delta = link.delta as usize;
                let prev_ix = cur_ix.wrapping_sub(backward) & mask;
                let best_len = out.len;
                if cur_ix_masked + best_len > mask
                    || prev_ix + best_len > mask
                    || data[cur_ix_masked + best_len] != data[prev_ix + best_len]
                {
                    continue;
                }
                let len = find_match_length(data, prev_ix, cur_ix_masked, max_length);
                if len >= 4 {
                    let score = backward_reference_score(len, backward);
                    if out.score < score {
                        out.len = len;
                        out.distance = backward;
                        out.score = score;
                        is_match_found = true;
                    }
                }
            }
            self.store(data, mask, cur_ix);
        }
        is_match_found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::types::K_MIN_SCORE;

    type H40 = HashForgetfulChain<1, 16, 1, false>;
    type H41 = HashForgetfulChain<1, 16, 10, false>;
    type Capped = HashForgetfulChain<1, 16, 1, true>;

    fn params(quality: u32) -> crate::encode::types::EncoderParams {
        crate::encode::types::EncoderParams {
            quality,
            lgwin: 16,
            ..Default::default()
        }
    }

    #[test]
    fn max_hops_follows_quality() {
        assert_eq!(H40::new(&params(5)).max_hops, 16);
        assert_eq!(H40::new(&params(6)).max_hops, 32);
        assert_eq!(H40::new(&params(7)).max_hops, 56);
        assert_eq!(H40::new(&params(9)).max_hops, 224);
    }

    #[test]
    fn chain_walk_reaches_older_entries() {
        // Three occurrences of the same 8-byte string; the walk must be able
        // to surface the middle one even though the newest is closer.
        let mut data = Vec::new();
        data.extend_from_slice(b"fox-jump");
        data.extend_from_slice(b"........");
        data.extend_from_slice(b"fox-jump");
        data.extend_from_slice(b"????????");
        data.extend_from_slice(b"fox-jumpXY");
        data.extend_from_slice(&[0u8; 8]);
        let mask = usize::MAX;
        let mut h = H41::new(&params(6));
        h.prepare(false, 0, &data);
        for ix in 0..32 {
            h.store(&data, mask, ix);
        }
        let cache = [900i64, 901, 902, 903];
        let mut sr = HasherSearchResult::new(K_MIN_SCORE);
        let found = h.find_longest_match(&data, mask, &cache, 32, 8, 1 << 15, &mut sr);
        assert!(found);
        assert_eq!(sr.len, 8);
        // Both occurrences match 8 bytes; the nearer one scores higher.
        assert_eq!(sr.distance, 16);
    }

    #[test]
    fn tiny_hash_rejects_stale_cache_slots() {
        let mut data = vec![b'z'; 64];
        data.extend_from_slice(&[0u8; 8]);
        let mask = usize::MAX;
        let mut h = H41::new(&params(6));
        h.prepare(false, 0, &data);
        // Nothing stored: every cache probe beyond code 0 must be rejected
        // by the zeroed tiny-hash table unless the key byte happens to be 0.
        let cache = [2i64, 4, 8, 16];
        let mut sr = HasherSearchResult::new(K_MIN_SCORE);
        let _ = h.find_longest_match(&data, mask, &cache, 32, 8, 1 << 15, &mut sr);
        // Code 0 (distance 2) is exempt from the tiny-hash gate and matches.
        assert_eq!(sr.distance, 2);
    }

    #[test]
    fn capped_chain_terminates_on_zero_delta() {
        let mut data = vec![b'q'; 32];
        data.extend_from_slice(&[0u8; 8]);
        let mask = usize::MAX;
        let mut h = Capped::new(&params(5));
        h.prepare(false, 0, &data);
        h.store(&data, mask, 0);
        let cache = [500i64, 501, 502, 503];
        let mut sr = HasherSearchResult::new(K_MIN_SCORE);
        // Walking past position 0 yields delta 0xFFFF→0 under capping; the
        // walk must stop rather than loop.
        let _ = h.find_longest_match(&data, mask, &cache, 8, 8, 1 << 15, &mut sr);
    }
}
