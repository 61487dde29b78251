//! Bucketed longest-match matchers (types 5 and 6).
//!
//! Each bucket holds the `block_size` most recently stored positions for its
//! key, and lookup scans those candidates newest-first for the true longest
//! match.  Table geometry (bucket bits, block bits, probe depth) comes from
//! the quality-derived [`HasherParams`].  Type 5 hashes 4 bytes through a
//! 32-bit product; type 6 hashes a masked 8-byte load through a 64-bit
//! product for large-window, large-input streams.

use crate::encode::types::{EncoderParams, K_HASH_MUL32, K_HASH_MUL64_LONG};
use crate::hash::types::{
    backward_reference_score, backward_reference_score_using_last_distance, find_match_length,
    load32, load64, HasherCommon, HasherSearchResult, K_DISTANCE_CACHE_INDEX,
    K_DISTANCE_CACHE_OFFSET,
};

/// Probes the sixteen short-code variations of the distance cache before any
/// table lookup; a hit there is almost free on the wire.
///
/// Returns true when `out` was improved.
#[allow(clippy::too_many_arguments)]
pub(crate) fn probe_distance_cache(
    num_to_check: usize,
    data: &[u8],
    mask: usize,
    dist_cache: &[i64; 4],
    cur_ix: usize,
    max_length: usize,
    max_backward: usize,
    out: &mut HasherSearchResult,
) -> bool {
    let cur_ix_masked = cur_ix & mask;
    let mut found = false;
    for i in 0..num_to_check {
        let backward = dist_cache[K_DISTANCE_CACHE_INDEX[i]] + K_DISTANCE_CACHE_OFFSET[i];
        if backward <= 0 {
            continue;
        }
        let backward = backward as usize;
        if backward > cur_ix || backward > max_backward {
            continue;
        }
        let prev_ix = (cur_ix - backward) & mask;
        let best_len = out.len;
        if cur_ix_masked + best_len > mask
            || prev_ix + best_len > mask
            || data[cur_ix_masked + best_len] != data[prev_ix + best_len]
        {
            continue;
        }
        let len = find_match_length(data, prev_ix, cur_ix_masked, max_length);
        if len >= 3 || (len == 2 && i < 2) {
            // Short lengths only pay off through the two cheapest codes.
            let score = backward_reference_score_using_last_distance(len, i);
            if out.score < score {
                out.len = len;
                out.distance = backward;
                out.score = score;
                found = true;
            }
        }
    }
    found
}

// ─────────────────────────────────────────────────────────────────────────────
// Type 5: 4-byte keys
// ─────────────────────────────────────────────────────────────────────────────

/// Bucketed most-recent-positions matcher over 4-byte keys.
pub struct HashLongestMatch {
    bucket_size: usize,
    block_size: usize,
    block_bits: u32,
    block_mask: u32,
    hash_shift: u32,
    /// Total stores per bucket (wrapping); the low `block_bits` select the
    /// slot, so only the newest `block_size` survive.
    num: Vec<u16>,
    buckets: Vec<u32>,
}

impl HashLongestMatch {
    pub fn new(params: &EncoderParams) -> Self {
        let bucket_size = 1usize << params.hasher.bucket_bits;
        let block_size = 1usize << params.hasher.block_bits;
        HashLongestMatch {
            bucket_size,
            block_size,
            block_bits: params.hasher.block_bits,
            block_mask: (block_size - 1) as u32,
            hash_shift: 32 - params.hasher.bucket_bits,
            num: vec![0u16; bucket_size],
            buckets: vec![0u32; bucket_size * block_size],
        }
    }

    #[inline(always)]
    fn hash_bytes(&self, data: &[u8], ix: usize) -> usize {
        let h = load32(data, ix).wrapping_mul(K_HASH_MUL32);
        (h >> self.hash_shift) as usize
    }

    pub fn prepare(&mut self, one_shot: bool, input_size: usize, data: &[u8]) {
        let partial_prepare_threshold = self.bucket_size >> 6;
        if one_shot && input_size <= partial_prepare_threshold {
            for i in 0..input_size {
                let key = self.hash_bytes(data, i);
                self.num[key] = 0;
            }
        } else {
            for n in &mut self.num {
                *n = 0;
            }
        }
    }

    pub fn mem_size(&self) -> usize {
        self.num.len() * core::mem::size_of::<u16>()
            + self.buckets.len() * core::mem::size_of::<u32>()
    }

    #[inline]
    pub fn store(&mut self, data: &[u8], mask: usize, ix: usize) {
        let key = self.hash_bytes(data, ix & mask);
        let minor_ix = (self.num[key] as u32 & self.block_mask) as usize;
        self.buckets[(key << self.block_bits) + minor_ix] = ix as u32;
        self.num[key] = self.num[key].wrapping_add(1);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn find_longest_match(
        &mut self,
        common: &HasherCommon,
        data: &[u8],
        mask: usize,
        dist_cache: &[i64; 4],
        cur_ix: usize,
        max_length: usize,
        max_backward: usize,
        out: &mut HasherSearchResult,
    ) -> bool {
        let cur_ix_masked = cur_ix & mask;
        out.len_code_delta = 0;
        let mut is_match_found = probe_distance_cache(
            common.params.num_last_distances_to_check,
            data,
            mask,
            dist_cache,
            cur_ix,
            max_length,
            max_backward,
            out,
        );
        {
            let key = self.hash_bytes(data, cur_ix_masked);
            let bucket = &self.buckets[key << self.block_bits..(key << self.block_bits) + self.block_size];
            let hi = self.num[key] as usize;
            let down = hi.saturating_sub(self.block_size);
            let mut i = hi;
            while i > down {
                i -= 1;
                let prev = bucket[i & self.block_mask as usize] as usize;
                let backward = cur_ix.wrapping_sub(prev);
                if backward > max_backward {
                    break;
                }
                let prev_ix = prev & mask;
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
            let minor_ix = (self.num[key] as u32 & self.block_mask) as usize;
            self.buckets[(key << self.block_bits) + minor_ix] = cur_ix as u32;
            self.num[key] = self.num[key].wrapping_add(1);
        }
        is_match_found
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Type 6: masked 8-byte keys
// ─────────────────────────────────────────────────────────────────────────────

/// Bucketed most-recent-positions matcher over masked 8-byte keys.
pub struct HashLongestMatch64 {
    bucket_size: usize,
    block_size: usize,
    block_bits: u32,
    block_mask: u32,
    hash_shift: u32,
    hash_mask: u64,
    num: Vec<u16>,
    buckets: Vec<u32>,
}

impl HashLongestMatch64 {
    pub fn new(params: &EncoderParams) -> Self {
        let bucket_size = 1usize << params.hasher.bucket_bits;
        let block_size = 1usize << params.hasher.block_bits;
        HashLongestMatch64 {
            bucket_size,
            block_size,
            block_bits: params.hasher.block_bits,
            block_mask: (block_size - 1) as u32,
            hash_shift: 64 - params.hasher.bucket_bits,
            hash_mask: u64::MAX >> (64 - 8 * params.hasher.hash_len),
            num: vec![0u16; bucket_size],
            buckets: vec![0u32; bucket_size * block_size],
        }
    }

    #[inline(always)]
    fn hash_bytes(&self, data: &[u8], ix: usize) -> usize {
        let h = (load64(data, ix) & self.hash_mask).wrapping_mul(K_HASH_MUL64_LONG);
        (h >> self.hash_shift) as usize
    }

    pub fn prepare(&mut self, one_shot: bool, input_size: usize, data: &[u8]) {
        let partial_prepare_threshold = self.bucket_size >> 6;
        if one_shot && input_size <= partial_prepare_threshold {
            for i in 0..input_size {
                let key = self.hash_bytes(data, i);
                self.num[key] = 0;
            }
        } else {
            for n in &mut self.num {
                *n = 0;
            }
        }
    }

    pub fn mem_size(&self) -> usize {
        self.num.len() * core::mem::size_of::<u16>()
            + self.buckets.len() * core::mem::size_of::<u32>()
    }

    #[inline]
    pub fn store(&mut self, data: &[u8], mask: usize, ix: usize) {
        let key = self.hash_bytes(data, ix & mask);
        let minor_ix = (self.num[key] as u32 & self.block_mask) as usize;
        self.buckets[(key << self.block_bits) + minor_ix] = ix as u32;
        self.num[key] = self.num[key].wrapping_add(1);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn find_longest_match(
        &mut self,
        common: &HasherCommon,
        data: &[u8],
        mask: usize,
        dist_cache: &[i64; 4],
        cur_ix: usize,
        max_length: usize,
        max_backward: usize,
        out: &mut HasherSearchResult,
    ) -> bool {
        let cur_ix_masked = cur_ix & mask;
        out.len_code_delta = 0;
        let mut is_match_found = probe_distance_cache(
            common.params.num_last_distances_to_check,
            data,
            mask,
            dist_cache,
            cur_ix,
            max_length,
            max_backward,
            out,
        );
        {
            let key = self.hash_bytes(data, cur_ix_masked);
            let bucket = &self.buckets[key << self.block_bits..(key << self.block_bits) + self.block_size];
            let hi = self.num[key] as usize;
            let down = hi.saturating_sub(self.block_size);
            let mut i = hi;
            while i > down {
                i -= 1;
                let prev = bucket[i & self.block_mask as usize] as usize;
                let backward = cur_ix.wrapping_sub(prev);
                if backward > max_backward {
                    break;
                }
                let prev_ix = prev & mask;
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
            let minor_ix = (self.num[key] as u32 & self.block_mask) as usize;
            self.buckets[(key << self.block_bits) + minor_ix] = cur_ix as u32;
            self.num[key] = self.num[key].wrapping_add(1);
        }
        is_match_found
    }
}
