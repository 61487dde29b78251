//! Meta-block emission: headers, prefix codes, and the command/literal data
//! pass.
//!
//! Every meta-block here uses one block type per category, no literal
//! context modeling, and no distance postfix: a single literal tree, one
//! insert-and-copy tree, and one distance tree, each stored in simple or
//! complex serialized form.  Incompressible blocks fall back to the
//! uncompressed form, and flushes byte-align the stream with an empty
//! metadata meta-block.

use crate::encode::bit_writer::BitWriter;
use crate::encode::command::{
    Command, get_copy_length_code, get_insert_length_code, BROTLI_NUM_COMMAND_SYMBOLS,
    BROTLI_NUM_LITERAL_SYMBOLS, COPY_BASE, COPY_EXTRA, INSERT_BASE, INSERT_EXTRA,
    SIMPLE_DISTANCE_ALPHABET_SIZE,
};
use crate::encode::huffman::build_and_store_huffman_tree;

// ─────────────────────────────────────────────────────────────────────────────
// Headers
// ─────────────────────────────────────────────────────────────────────────────

/// Writes ISLAST (and ISLASTEMPTY = 0), MNIBBLES, and MLEN − 1, then the
/// ISUNCOMPRESSED = 0 bit for non-final blocks.
fn store_compressed_meta_block_header(is_last: bool, length: usize, w: &mut BitWriter) {
    w.write_bits(1, u64::from(is_last));
    if is_last {
        w.write_bits(1, 0);
    }
    store_mlen(length, w);
    if !is_last {
        w.write_bits(1, 0);
    }
}

fn store_uncompressed_meta_block_header(length: usize, w: &mut BitWriter) {
    // Uncompressed blocks are never ISLAST.
    w.write_bits(1, 0);
    store_mlen(length, w);
    w.write_bits(1, 1);
}

fn store_mlen(length: usize, w: &mut BitWriter) {
    debug_assert!(length >= 1 && length <= 1 << 24);
    let lendiff = (length - 1) as u64;
    let nibbles: u32 = if lendiff < 1 << 16 {
        4
    } else if lendiff < 1 << 20 {
        5
    } else {
        6
    };
    w.write_bits(2, (nibbles - 4) as u64);
    w.write_bits(nibbles * 4, lendiff);
}

/// Final zero-length meta-block: ISLAST + ISLASTEMPTY, byte-aligned.
pub fn store_last_empty_meta_block(w: &mut BitWriter) {
    w.write_bits(2, 3);
    w.jump_to_byte_boundary();
}

/// Empty metadata meta-block; pads the stream to a byte boundary without
/// touching the window, which is what a flush needs.
pub fn store_empty_metadata_meta_block(w: &mut BitWriter) {
    // ISLAST = 0, MNIBBLES code = 3 (metadata), reserved = 0, MSKIPBYTES = 0.
    w.write_bits(1, 0);
    w.write_bits(2, 3);
    w.write_bits(1, 0);
    w.write_bits(2, 0);
    w.jump_to_byte_boundary();
}

/// Stores `len` bytes starting at ring position `position` verbatim.
pub fn store_uncompressed_meta_block(
    is_final_block: bool,
    data: &[u8],
    position: usize,
    mask: usize,
    len: usize,
    w: &mut BitWriter,
) {
    let masked_pos = position & mask;
    store_uncompressed_meta_block_header(len, w);
    w.jump_to_byte_boundary();
    let ring_size = mask.wrapping_add(1);
    if ring_size != 0 && masked_pos + len > ring_size {
        // The block wraps the ring; emit it in two pieces.
        let len1 = ring_size - masked_pos;
        w.write_bytes(&data[masked_pos..masked_pos + len1]);
        w.write_bytes(&data[..len - len1]);
    } else {
        w.write_bytes(&data[masked_pos..masked_pos + len]);
    }
    // An uncompressed block cannot carry ISLAST; close the stream with an
    // empty one when needed.
    if is_final_block {
        store_last_empty_meta_block(w);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Histograms
// ─────────────────────────────────────────────────────────────────────────────

struct MetaBlockHistograms {
    literals: Vec<u32>,
    commands: Vec<u32>,
    distances: Vec<u32>,
}

fn build_histograms(
    data: &[u8],
    start_pos: usize,
    mask: usize,
    commands: &[Command],
) -> MetaBlockHistograms {
    let mut h = MetaBlockHistograms {
        literals: vec![0u32; BROTLI_NUM_LITERAL_SYMBOLS],
        commands: vec![0u32; BROTLI_NUM_COMMAND_SYMBOLS],
        distances: vec![0u32; SIMPLE_DISTANCE_ALPHABET_SIZE],
    };
    let mut pos = start_pos;
    for cmd in commands {
        h.commands[cmd.cmd_prefix as usize] += 1;
        for _ in 0..cmd.insert_len {
            h.literals[data[pos & mask] as usize] += 1;
            pos += 1;
        }
        pos += cmd.copy_len as usize;
        if cmd.copy_len > 0 && cmd.has_explicit_distance() {
            h.distances[cmd.dist_prefix as usize] += 1;
        }
    }
    h
}

// ─────────────────────────────────────────────────────────────────────────────
// Compressibility estimate
// ─────────────────────────────────────────────────────────────────────────────

fn shannon_entropy(population: &[u32]) -> (f64, u64) {
    let mut sum = 0u64;
    let mut retval = 0f64;
    for &p in population {
        if p > 0 {
            sum += p as u64;
            retval -= p as f64 * (p as f64).log2();
        }
    }
    if sum > 0 {
        retval += sum as f64 * (sum as f64).log2();
    }
    (retval, sum)
}

fn bits_entropy(population: &[u32]) -> f64 {
    let (mut retval, sum) = shannon_entropy(population);
    if retval < sum as f64 {
        // At least one bit per symbol.
        retval = sum as f64;
    }
    retval
}

/// Samples the block's literals and estimates whether entropy coding can
/// beat storing the bytes raw.
fn should_compress(
    data: &[u8],
    mask: usize,
    last_flush_pos: usize,
    bytes: usize,
    num_literals: usize,
    num_commands: usize,
) -> bool {
    if num_commands < (bytes >> 8) + 2 && num_literals as f64 > 0.99 * bytes as f64 {
        let mut literal_histo = [0u32; 256];
        const K_SAMPLE_RATE: usize = 13;
        const K_MIN_ENTROPY: f64 = 7.92;
        let bit_cost_threshold = bytes as f64 * K_MIN_ENTROPY / K_SAMPLE_RATE as f64;
        let t = (bytes + K_SAMPLE_RATE - 1) / K_SAMPLE_RATE;
        let mut pos = last_flush_pos;
        for _ in 0..t {
            literal_histo[data[pos & mask] as usize] += 1;
            pos += K_SAMPLE_RATE;
        }
        if bits_entropy(&literal_histo) > bit_cost_threshold {
            return false;
        }
    }
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Compressed meta-block
// ─────────────────────────────────────────────────────────────────────────────

/// Extra-bit payload of one command: insert and copy extras packed together.
fn store_command_extra(cmd: &Command, w: &mut BitWriter) {
    let copylen_code = cmd.copy_len_code;
    let inscode = get_insert_length_code(cmd.insert_len as usize);
    let copycode = get_copy_length_code(copylen_code as usize);
    let insnumextra = INSERT_EXTRA[inscode as usize];
    let insextraval = (cmd.insert_len - INSERT_BASE[inscode as usize]) as u64;
    let copyextraval = (copylen_code - COPY_BASE[copycode as usize]) as u64;
    let bits = (copyextraval << insnumextra) | insextraval;
    w.write_bits(insnumextra + COPY_EXTRA[copycode as usize], bits);
}

/// Stores a complete compressed meta-block with one tree per category.
pub fn store_meta_block_trivial(
    data: &[u8],
    start_pos: usize,
    length: usize,
    mask: usize,
    is_last: bool,
    commands: &[Command],
    w: &mut BitWriter,
) {
    let histograms = build_histograms(data, start_pos, mask, commands);

    store_compressed_meta_block_header(is_last, length, w);
    // One block type per category, no distance postfix or direct codes, one
    // context mode, one literal tree, one distance tree: thirteen zero bits.
    w.write_bits(13, 0);

    let mut lit_depth = [0u8; BROTLI_NUM_LITERAL_SYMBOLS];
    let mut lit_bits = [0u16; BROTLI_NUM_LITERAL_SYMBOLS];
    let mut cmd_depth = [0u8; BROTLI_NUM_COMMAND_SYMBOLS];
    let mut cmd_bits = [0u16; BROTLI_NUM_COMMAND_SYMBOLS];
    let mut dist_depth = [0u8; SIMPLE_DISTANCE_ALPHABET_SIZE];
    let mut dist_bits = [0u16; SIMPLE_DISTANCE_ALPHABET_SIZE];
    build_and_store_huffman_tree(&histograms.literals, &mut lit_depth, &mut lit_bits, w);
    build_and_store_huffman_tree(&histograms.commands, &mut cmd_depth, &mut cmd_bits, w);
    build_and_store_huffman_tree(&histograms.distances, &mut dist_depth, &mut dist_bits, w);

    let mut pos = start_pos;
    for cmd in commands {
        let code = cmd.cmd_prefix as usize;
        w.write_bits(cmd_depth[code] as u32, cmd_bits[code] as u64);
        store_command_extra(cmd, w);
        for _ in 0..cmd.insert_len {
            let literal = data[pos & mask] as usize;
            w.write_bits(lit_depth[literal] as u32, lit_bits[literal] as u64);
            pos += 1;
        }
        pos += cmd.copy_len as usize;
        if cmd.copy_len > 0 && cmd.has_explicit_distance() {
            let dist_code = cmd.dist_prefix as usize;
            w.write_bits(dist_depth[dist_code] as u32, dist_bits[dist_code] as u64);
            w.write_bits(cmd.dist_extra_bits, cmd.dist_extra as u64);
        }
    }
    if is_last {
        w.jump_to_byte_boundary();
    }
}

/// Emits the accumulated block: compressed when the estimate says the
/// entropy stage will pay off, raw otherwise (restoring the distance cache
/// the discarded commands would have clobbered), and never longer than the
/// raw form plus a small constant.
#[allow(clippy::too_many_arguments)]
pub fn write_meta_block_internal(
    data: &[u8],
    mask: usize,
    last_flush_pos: usize,
    bytes: usize,
    is_last: bool,
    num_literals: usize,
    commands: &[Command],
    saved_dist_cache: &[i64; 4],
    dist_cache: &mut [i64; 4],
    w: &mut BitWriter,
) {
    if bytes == 0 {
        debug_assert!(is_last);
        store_last_empty_meta_block(w);
        return;
    }

    if !should_compress(data, mask, last_flush_pos, bytes, num_literals, commands.len()) {
        // The commands' cache updates never reach the stream.
        *dist_cache = *saved_dist_cache;
        store_uncompressed_meta_block(is_last, data, last_flush_pos, mask, bytes, w);
        return;
    }

    let snapshot = w.snapshot();
    store_meta_block_trivial(data, last_flush_pos, bytes, mask, is_last, commands, w);
    // Degenerate inputs can make the compressed form larger than raw
    // storage; redo such blocks uncompressed.
    if (w.bit_pos() - snapshot.0) / 8 > bytes + 4 {
        w.rewind(snapshot);
        *dist_cache = *saved_dist_cache;
        store_uncompressed_meta_block(is_last, data, last_flush_pos, mask, bytes, w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mlen_nibble_selection() {
        let mut w = BitWriter::new(0, 0);
        store_mlen(1, &mut w);
        assert_eq!(w.bit_pos(), 2 + 16);
        let mut w = BitWriter::new(0, 0);
        store_mlen(1 << 16, &mut w);
        assert_eq!(w.bit_pos(), 2 + 16);
        let mut w = BitWriter::new(0, 0);
        store_mlen((1 << 16) + 1, &mut w);
        assert_eq!(w.bit_pos(), 2 + 20);
        let mut w = BitWriter::new(0, 0);
        store_mlen(1 << 24, &mut w);
        assert_eq!(w.bit_pos(), 2 + 24);
    }

    #[test]
    fn last_empty_block_is_two_set_bits() {
        let mut w = BitWriter::new(0, 0);
        store_last_empty_meta_block(&mut w);
        assert_eq!(w.full_bytes(), &[0b0000_0011]);
    }

    #[test]
    fn uncompressed_block_holds_raw_bytes() {
        let data = b"abcdefgh".to_vec();
        let mut w = BitWriter::new(0, 0);
        store_uncompressed_meta_block(false, &data, 0, usize::MAX, 8, &mut w);
        let out = w.full_bytes();
        // Header: ISLAST=0, MNIBBLES code 0, MLEN-1 = 7 (16 bits),
        // ISUNCOMPRESSED=1, then alignment: 1 + 2 + 16 + 1 = 20 bits → 3 bytes.
        assert_eq!(&out[3..11], b"abcdefgh");
    }

    #[test]
    fn random_bytes_are_stored_raw() {
        // A xorshift stream defeats the entropy estimate.
        let mut x = 0x2545_F491_4F6C_DD1Du64;
        let data: Vec<u8> = (0..65536)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 7;
                x ^= x << 17;
                (x >> 32) as u8
            })
            .collect();
        assert!(!should_compress(&data, usize::MAX, 0, data.len(), data.len(), 1));
        // Text-like data passes.
        let text: Vec<u8> = b"all work and no play makes jack a dull boy. "
            .iter()
            .copied()
            .cycle()
            .take(65536)
            .collect();
        assert!(should_compress(&text, usize::MAX, 0, text.len(), text.len(), 1));
    }

    #[test]
    fn histogram_replay_counts_literals_and_distances() {
        let data = b"aabbaabb".to_vec();
        // One command: 4 literals then a copy of 4 at distance 4.
        let cmd = Command::new(4, 4, 4, 4 + 15);
        let h = build_histograms(&data, 0, usize::MAX, &[cmd]);
        assert_eq!(h.literals[b'a' as usize], 2);
        assert_eq!(h.literals[b'b' as usize], 2);
        assert_eq!(h.commands[cmd.cmd_prefix as usize], 1);
        assert_eq!(h.distances[cmd.dist_prefix as usize], 1);
        // Insert-only commands contribute no distance.
        let tail = Command::new_insert(3);
        let h2 = build_histograms(&data, 0, usize::MAX, &[tail]);
        assert_eq!(h2.distances.iter().sum::<u32>(), 0);
    }
}
