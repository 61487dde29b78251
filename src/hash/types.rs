//! Shared matcher machinery: search results, scoring, match-length counting,
//! the distance-cache probe tables, and the variant dispatch wrapper.
//!
//! Every matcher variant answers the same "where did I last see the bytes
//! at this position" query against fixed-size tables keyed by a
//! multiplicative hash of the next 4–8 bytes.  The variants differ in table
//! layout and eviction policy; [`Hasher`] resolves the variant once at
//! construction so the hot loops pay no per-call dispatch beyond one match.

use crate::encode::types::{EncoderParams, HasherParams};
use crate::hash::binary_tree::HashToBinaryTree;
use crate::hash::forgetful_chain::HashForgetfulChain;
use crate::hash::longest_match::{HashLongestMatch, HashLongestMatch64};
use crate::hash::quickly::HashLongestMatchQuickly;

// ─────────────────────────────────────────────────────────────────────────────
// Unaligned little-endian loads
// ─────────────────────────────────────────────────────────────────────────────

/// Reads 4 bytes at `ix` as a little-endian word.  The ring buffer carries 7
/// slack bytes past its addressable end so these loads stay in bounds at the
/// write frontier.
#[inline(always)]
pub fn load32(data: &[u8], ix: usize) -> u32 {
    u32::from_le_bytes([data[ix], data[ix + 1], data[ix + 2], data[ix + 3]])
}

/// Reads 8 bytes at `ix` as a little-endian word.
#[inline(always)]
pub fn load64(data: &[u8], ix: usize) -> u64 {
    u64::from_le_bytes([
        data[ix],
        data[ix + 1],
        data[ix + 2],
        data[ix + 3],
        data[ix + 4],
        data[ix + 5],
        data[ix + 6],
        data[ix + 7],
    ])
}

/// Number of leading bytes shared by the sequences at `a` and `b`, at most
/// `limit`.  The limit is additionally clamped to the slice so that probes
/// whose guards let them run close to the buffer end stay safe.
pub fn find_match_length(data: &[u8], a: usize, b: usize, limit: usize) -> usize {
    let limit = limit
        .min(data.len().saturating_sub(a))
        .min(data.len().saturating_sub(b));
    let mut matched = 0;
    while matched < limit && data[a + matched] == data[b + matched] {
        matched += 1;
    }
    matched
}

#[inline(always)]
pub fn log2_floor_non_zero(n: usize) -> u32 {
    debug_assert!(n != 0);
    (usize::BITS - 1) - n.leading_zeros()
}

// ─────────────────────────────────────────────────────────────────────────────
// Backward-reference scoring
// ─────────────────────────────────────────────────────────────────────────────

/// Score granted per copied byte.
pub const LITERAL_BYTE_SCORE: u64 = 135;
/// Score deducted per bit of backward distance.
pub const DISTANCE_BIT_PENALTY: u64 = 30;
/// Bias keeping all scores positive for any representable distance.
pub const SCORE_BASE: u64 = DISTANCE_BIT_PENALTY * 8 * 8;
/// Smallest score a candidate must beat to be emitted at all.
pub const K_MIN_SCORE: u64 = SCORE_BASE + 100;

/// Fixed cost adjustment for the sixteen short distance codes; re-using a
/// recent distance is cheap on the wire, so near-cache candidates win ties
/// against slightly longer far matches.
pub const K_DISTANCE_SHORT_CODE_COST: [u64; 16] = [
    SCORE_BASE + 60,
    SCORE_BASE - 95,
    SCORE_BASE + 40,
    SCORE_BASE - 105,
    SCORE_BASE + 25,
    SCORE_BASE - 138,
    SCORE_BASE - 25,
    SCORE_BASE - 152,
    SCORE_BASE - 55,
    SCORE_BASE - 158,
    SCORE_BASE - 125,
    SCORE_BASE - 183,
    SCORE_BASE - 148,
    SCORE_BASE - 192,
    SCORE_BASE - 160,
    SCORE_BASE - 199,
];

#[inline(always)]
pub fn backward_reference_score(copy_length: usize, backward_reference_offset: usize) -> u64 {
    SCORE_BASE + LITERAL_BYTE_SCORE * copy_length as u64
        - DISTANCE_BIT_PENALTY * log2_floor_non_zero(backward_reference_offset) as u64
}

#[inline(always)]
pub fn backward_reference_score_using_last_distance(
    copy_length: usize,
    distance_short_code: usize,
) -> u64 {
    LITERAL_BYTE_SCORE * copy_length as u64 + K_DISTANCE_SHORT_CODE_COST[distance_short_code]
}

// ─────────────────────────────────────────────────────────────────────────────
// Distance-cache probe tables
// ─────────────────────────────────────────────────────────────────────────────

/// Which cache slot each of the sixteen short distance codes refers to.
pub const K_DISTANCE_CACHE_INDEX: [usize; 16] = [0, 1, 2, 3, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1];

/// Offset applied to the cached distance for each short code.
pub const K_DISTANCE_CACHE_OFFSET: [i64; 16] =
    [0, 0, 0, 0, -1, 1, -2, 2, -3, 3, -1, 1, -2, 2, -3, 3];

// ─────────────────────────────────────────────────────────────────────────────
// Search result and common state
// ─────────────────────────────────────────────────────────────────────────────

/// Result of one longest-match query.
#[derive(Debug, Clone, Copy)]
pub struct HasherSearchResult {
    pub len: usize,
    /// Difference between the length code to emit and the literal copy
    /// length; non-zero only for synthetic commands.
    pub len_code_delta: i32,
    pub distance: usize,
    pub score: u64,
}

impl HasherSearchResult {
    pub fn new(min_score: u64) -> Self {
        HasherSearchResult {
            len: 0,
            len_code_delta: 0,
            distance: 0,
            score: min_score,
        }
    }
}

/// State shared by every matcher variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct HasherCommon {
    pub params: HasherParams,
    /// Tables are zeroed lazily on first use; false until then.
    pub is_prepared: bool,
    pub dict_num_lookups: usize,
    pub dict_num_matches: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Variant dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// One concrete matcher algorithm.
pub enum HasherImpl {
    /// Sweep-of-1 direct-mapped table, 5-byte keys.
    H2(HashLongestMatchQuickly<16, 1, 5>),
    /// Sweep-of-2, 5-byte keys.
    H3(HashLongestMatchQuickly<16, 2, 5>),
    /// Sweep-of-4 over a wider table, 5-byte keys.
    H4(HashLongestMatchQuickly<17, 4, 5>),
    /// Sweep-of-4 over a 1M-bucket table, 7-byte keys (large-input fast path).
    H54(HashLongestMatchQuickly<20, 4, 7>),
    /// Bucketed most-recent-positions search, 4-byte keys.
    H5(HashLongestMatch),
    /// Bucketed most-recent-positions search, masked 8-byte keys.
    H6(HashLongestMatch64),
    /// Forgetful chain, one bank, cache probe depth 1.
    H40(HashForgetfulChain<1, 16, 1, false>),
    /// Forgetful chain, one bank, cache probe depth 10.
    H41(HashForgetfulChain<1, 16, 10, false>),
    /// Forgetful chain, 512 banks, cache probe depth 16.
    H42(HashForgetfulChain<512, 9, 16, false>),
    /// Binary-tree search over every window position.
    H10(HashToBinaryTree),
}

/// A matcher variant bound to one encoder stream.
///
/// Construction resolves the variant from the already-chosen
/// [`HasherParams`]; every later call dispatches over the closed enum.
pub struct Hasher {
    pub common: HasherCommon,
    pub imp: HasherImpl,
}

impl Hasher {
    /// Builds the variant selected in `params.hasher` and derives its table
    /// sizes and shift constants.
    pub fn new(params: &EncoderParams) -> Self {
        let imp = match params.hasher.hasher_type {
            2 => HasherImpl::H2(HashLongestMatchQuickly::new()),
            3 => HasherImpl::H3(HashLongestMatchQuickly::new()),
            4 => HasherImpl::H4(HashLongestMatchQuickly::new()),
            54 => HasherImpl::H54(HashLongestMatchQuickly::new()),
            5 => HasherImpl::H5(HashLongestMatch::new(params)),
            6 => HasherImpl::H6(HashLongestMatch64::new(params)),
            40 => HasherImpl::H40(HashForgetfulChain::new(params)),
            41 => HasherImpl::H41(HashForgetfulChain::new(params)),
            42 => HasherImpl::H42(HashForgetfulChain::new(params)),
            _ => HasherImpl::H10(HashToBinaryTree::new(params)),
        };
        Hasher {
            common: HasherCommon {
                params: params.hasher,
                is_prepared: false,
                dict_num_lookups: 0,
                dict_num_matches: 0,
            },
            imp,
        }
    }

    /// Bytes the hash key spans.
    pub fn hash_type_length(&self) -> usize {
        match &self.imp {
            HasherImpl::H2(_) | HasherImpl::H3(_) | HasherImpl::H4(_) | HasherImpl::H54(_) => 8,
            HasherImpl::H5(_) => 4,
            HasherImpl::H6(_) => 8,
            HasherImpl::H40(_) | HasherImpl::H41(_) | HasherImpl::H42(_) => 4,
            HasherImpl::H10(_) => 4,
        }
    }

    /// Bytes of table storage held by this variant.
    pub fn hash_mem_size(&self) -> usize {
        match &self.imp {
            HasherImpl::H2(h) => h.mem_size(),
            HasherImpl::H3(h) => h.mem_size(),
            HasherImpl::H4(h) => h.mem_size(),
            HasherImpl::H54(h) => h.mem_size(),
            HasherImpl::H5(h) => h.mem_size(),
            HasherImpl::H6(h) => h.mem_size(),
            HasherImpl::H40(h) => h.mem_size(),
            HasherImpl::H41(h) => h.mem_size(),
            HasherImpl::H42(h) => h.mem_size(),
            HasherImpl::H10(h) => h.mem_size(),
        }
    }

    /// How many following bytes must exist before a position can be stored.
    pub fn store_lookahead(&self) -> usize {
        match &self.imp {
            HasherImpl::H2(_) | HasherImpl::H3(_) | HasherImpl::H4(_) | HasherImpl::H54(_) => 8,
            HasherImpl::H5(_) => 4,
            HasherImpl::H6(_) => 8,
            HasherImpl::H40(_) | HasherImpl::H41(_) | HasherImpl::H42(_) => 4,
            HasherImpl::H10(_) => HashToBinaryTree::MAX_TREE_COMP_LENGTH,
        }
    }

    /// Zeroes (or partially zeroes) the tables ahead of first use.
    ///
    /// For a small one-shot input only the buckets the input can touch are
    /// cleared; clearing the whole table for a few dozen bytes would dominate
    /// the compression time.
    pub fn prepare(&mut self, one_shot: bool, input_size: usize, data: &[u8]) {
        match &mut self.imp {
            HasherImpl::H2(h) => h.prepare(one_shot, input_size, data),
            HasherImpl::H3(h) => h.prepare(one_shot, input_size, data),
            HasherImpl::H4(h) => h.prepare(one_shot, input_size, data),
            HasherImpl::H54(h) => h.prepare(one_shot, input_size, data),
            HasherImpl::H5(h) => h.prepare(one_shot, input_size, data),
            HasherImpl::H6(h) => h.prepare(one_shot, input_size, data),
            HasherImpl::H40(h) => h.prepare(one_shot, input_size, data),
            HasherImpl::H41(h) => h.prepare(one_shot, input_size, data),
            HasherImpl::H42(h) => h.prepare(one_shot, input_size, data),
            HasherImpl::H10(h) => h.prepare(one_shot, input_size, data),
        }
    }

    /// Records position `ix` under the hash of the bytes at `data[ix & mask]`.
    pub fn store(&mut self, data: &[u8], mask: usize, ix: usize) {
        match &mut self.imp {
            HasherImpl::H2(h) => h.store(data, mask, ix),
            HasherImpl::H3(h) => h.store(data, mask, ix),
            HasherImpl::H4(h) => h.store(data, mask, ix),
            HasherImpl::H54(h) => h.store(data, mask, ix),
            HasherImpl::H5(h) => h.store(data, mask, ix),
            HasherImpl::H6(h) => h.store(data, mask, ix),
            HasherImpl::H40(h) => h.store(data, mask, ix),
            HasherImpl::H41(h) => h.store(data, mask, ix),
            HasherImpl::H42(h) => h.store(data, mask, ix),
            HasherImpl::H10(h) => h.store(data, mask, ix),
        }
    }

    /// Stores every position in `[start, end)`.
    pub fn store_range(&mut self, data: &[u8], mask: usize, start: usize, end: usize) {
        let mut ix = start;
        while ix < end {
            self.store(data, mask, ix);
            ix += 1;
        }
    }

    /// Re-hashes the final positions of the previous streamed block now that
    /// the bytes following them exist.  A key spans bytes that straddle the
    /// block boundary, so those positions could not be stored earlier.
    pub fn stitch_to_previous_block(
        &mut self,
        num_bytes: usize,
        position: usize,
        ringbuffer: &[u8],
        ringbuffer_mask: usize,
    ) {
        if let HasherImpl::H10(h) = &mut self.imp {
            h.stitch_to_previous_block(num_bytes, position, ringbuffer, ringbuffer_mask);
            return;
        }
        if num_bytes >= self.hash_type_length() - 1 && position >= 3 {
            self.store(ringbuffer, ringbuffer_mask, position - 3);
            self.store(ringbuffer, ringbuffer_mask, position - 2);
            self.store(ringbuffer, ringbuffer_mask, position - 1);
        }
    }

    /// Finds the highest-scoring backward reference for `cur_ix`, storing the
    /// current position as a side effect.  Returns true when `out` was
    /// improved beyond its initial score.
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
        let common = &self.common;
        match &mut self.imp {
            HasherImpl::H2(h) => {
                h.find_longest_match(data, mask, dist_cache, cur_ix, max_length, max_backward, out)
            }
            HasherImpl::H3(h) => {
                h.find_longest_match(data, mask, dist_cache, cur_ix, max_length, max_backward, out)
            }
            HasherImpl::H4(h) => {
                h.find_longest_match(data, mask, dist_cache, cur_ix, max_length, max_backward, out)
            }
            HasherImpl::H54(h) => {
                h.find_longest_match(data, mask, dist_cache, cur_ix, max_length, max_backward, out)
            }
            HasherImpl::H5(h) => h.find_longest_match(
                common, data, mask, dist_cache, cur_ix, max_length, max_backward, out,
            ),
            HasherImpl::H6(h) => h.find_longest_match(
                common, data, mask, dist_cache, cur_ix, max_length, max_backward, out,
            ),
            HasherImpl::H40(h) => {
                h.find_longest_match(data, mask, dist_cache, cur_ix, max_length, max_backward, out)
            }
            HasherImpl::H41(h) => {
                h.find_longest_match(data, mask, dist_cache, cur_ix, max_length, max_backward, out)
            }
            HasherImpl::H42(h) => {
                h.find_longest_match(data, mask, dist_cache, cur_ix, max_length, max_backward, out)
            }
            HasherImpl::H10(h) => {
                h.find_longest_match(data, mask, dist_cache, cur_ix, max_length, max_backward, out)
            }
        }
    }
}
