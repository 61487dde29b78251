//! Encoder parameters, quality constants, and derived sizing.
//!
//! Covers:
//! - Quality tier thresholds and hash multiplier constants
//! - [`EncoderMode`] / [`EncoderParams`] (user-visible knobs)
//! - Parameter sanitizing and the `lgblock` / ring-buffer-bits derivations
//! - [`EncoderError`] with `Display` + `Error` impls

use core::fmt;

use crate::{BROTLI_MAX_WINDOW_BITS, BROTLI_MIN_WINDOW_BITS};

// ─────────────────────────────────────────────────────────────────────────────
// Quality tiers
// ─────────────────────────────────────────────────────────────────────────────

pub const FAST_ONE_PASS_COMPRESSION_QUALITY: u32 = 0;
pub const FAST_TWO_PASS_COMPRESSION_QUALITY: u32 = 1;
pub const MIN_QUALITY_FOR_BLOCK_SPLIT: u32 = 4;
pub const MIN_QUALITY_FOR_EXTENSIVE_REFERENCE_SEARCH: u32 = 5;

pub const BROTLI_DEFAULT_QUALITY: u32 = 11;
pub const BROTLI_DEFAULT_WINDOW: u32 = 22;

// ─────────────────────────────────────────────────────────────────────────────
// Hash multipliers
// ─────────────────────────────────────────────────────────────────────────────

/// Knuth-style multiplier for 4-byte keys; the high bits of the product carry
/// the most mixture, so bucket indices are taken from the top.
pub const K_HASH_MUL32: u32 = 0x1e35_a7bd;
/// Multiplier for 5–7 byte keys hashed through a 64-bit product.
pub const K_HASH_MUL64: u64 = 0x1e35_a7bd_1e35_a7bd;
/// Multiplier for masked 5–8 byte keys (wide-window hashers).
pub const K_HASH_MUL64_LONG: u64 = 0x1fe3_5a7b_d357_9bd3;

// ─────────────────────────────────────────────────────────────────────────────
// Modes and parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Input-class hint; affects only heuristics, never stream validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum EncoderMode {
    /// No assumptions about the input.
    #[default]
    Generic = 0,
    /// UTF-8 text.
    Text = 1,
    /// WOFF 2.0 font data.
    Font = 2,
}

/// Parameters of the matcher variant selected for a stream.
///
/// `bucket_bits`, `block_bits`, `hash_len` and
/// `num_last_distances_to_check` are only meaningful for the table-driven
/// variants (types 5 and 6); the fixed-layout variants ignore them.
#[derive(Debug, Clone, Copy, Default)]
pub struct HasherParams {
    pub hasher_type: u32,
    pub bucket_bits: u32,
    pub block_bits: u32,
    pub hash_len: u32,
    pub num_last_distances_to_check: usize,
}

/// User-visible compression parameters.
///
/// Frozen once the encoder has consumed its first byte; later mutation
/// attempts are rejected by the stream layer.
#[derive(Debug, Clone, Copy)]
pub struct EncoderParams {
    pub mode: EncoderMode,
    /// 0–11; trades speed for ratio and selects the matcher variant.
    pub quality: u32,
    /// Log2 of the sliding-window size, 10–24.
    pub lgwin: u32,
    /// Log2 of the input block size, 16–24, or 0 to derive from quality.
    pub lgblock: u32,
    /// Expected total input size; 0 when unknown.
    pub size_hint: u64,
    pub disable_literal_context_modeling: bool,
    pub hasher: HasherParams,
}

impl Default for EncoderParams {
    fn default() -> Self {
        EncoderParams {
            mode: EncoderMode::Generic,
            quality: BROTLI_DEFAULT_QUALITY,
            lgwin: BROTLI_DEFAULT_WINDOW,
            lgblock: 0,
            size_hint: 0,
            disable_literal_context_modeling: false,
            hasher: HasherParams::default(),
        }
    }
}

/// Clamps `quality` and `lgwin` into their legal ranges.
pub fn sanitize_params(params: &mut EncoderParams) {
    params.quality = params.quality.min(crate::BROTLI_MAX_QUALITY);
    if params.lgwin < BROTLI_MIN_WINDOW_BITS {
        params.lgwin = BROTLI_MIN_WINDOW_BITS;
    } else if params.lgwin > BROTLI_MAX_WINDOW_BITS {
        params.lgwin = BROTLI_MAX_WINDOW_BITS;
    }
}

/// Returns the effective `lgblock` for the given (sanitized) parameters.
pub fn compute_lgblock(params: &EncoderParams) -> u32 {
    let mut lgblock = params.lgblock;
    if params.quality == FAST_ONE_PASS_COMPRESSION_QUALITY
        || params.quality == FAST_TWO_PASS_COMPRESSION_QUALITY
    {
        lgblock = params.lgwin;
    } else if params.quality < MIN_QUALITY_FOR_BLOCK_SPLIT {
        lgblock = 14;
    } else if lgblock == 0 {
        lgblock = 16;
        if params.quality >= 9 && params.lgwin > lgblock {
            lgblock = params.lgwin.min(18);
        }
    } else {
        lgblock = lgblock
            .max(crate::BROTLI_MIN_INPUT_BLOCK_BITS)
            .min(crate::BROTLI_MAX_INPUT_BLOCK_BITS);
    }
    lgblock
}

/// Log2 of the ring-buffer area: one bit more than the larger of window and
/// block, so a freshly added block always fits while `lgwin` bits of history
/// remain addressable, and the copy-tail length stays below the buffer size.
pub fn compute_rb_bits(params: &EncoderParams) -> u32 {
    1 + params.lgwin.max(params.lgblock)
}

/// Picks the matcher variant and its constructor parameters.
///
/// The decision is keyed on quality, window size, and size hint; it is made
/// once per stream and affects the compressed bytes, not just speed.
pub fn choose_hasher(params: &EncoderParams) -> HasherParams {
    let mut h = HasherParams::default();
    if params.quality > 9 {
        h.hasher_type = 10;
    } else if params.quality == 4 && params.size_hint >= (1 << 20) {
        h.hasher_type = 54;
    } else if params.quality < 5 {
        // Qualities 0 and 1 run through the same engine as quality 2; the
        // sweep-of-one table is the cheapest variant available.
        h.hasher_type = params.quality.max(2);
    } else if params.lgwin <= 16 {
        h.hasher_type = if params.quality < 7 {
            40
        } else if params.quality < 9 {
            41
        } else {
            42
        };
    } else if params.size_hint >= (1 << 20) && params.lgwin >= 19 {
        h.hasher_type = 6;
        h.block_bits = params.quality - 1;
        h.bucket_bits = 15;
        h.hash_len = 5;
        h.num_last_distances_to_check = if params.quality < 7 {
            4
        } else if params.quality < 9 {
            10
        } else {
            16
        };
    } else {
        h.hasher_type = 5;
        h.block_bits = params.quality - 1;
        h.bucket_bits = if params.quality < 7 { 14 } else { 15 };
        h.num_last_distances_to_check = if params.quality < 7 {
            4
        } else if params.quality < 9 {
            10
        } else {
            16
        };
    }
    h
}

// ─────────────────────────────────────────────────────────────────────────────
// Encoder errors
// ─────────────────────────────────────────────────────────────────────────────

/// Encoder-side failures.
///
/// Parameter errors are recoverable (retry with corrected values before the
/// stream starts); everything else latches the engine into its terminal
/// error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderError {
    /// A parameter value is outside its documented range.
    InvalidParameter,
    /// Parameters can no longer change: the stream has started.
    StateFrozen,
    /// An internal invariant was violated; the engine is unusable.
    Internal,
}

impl fmt::Display for EncoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncoderError::InvalidParameter => f.write_str("invalid encoder parameter"),
            EncoderError::StateFrozen => {
                f.write_str("encoder parameters are frozen after the first input byte")
            }
            EncoderError::Internal => f.write_str("internal encoder failure"),
        }
    }
}

impl std::error::Error for EncoderError {}
