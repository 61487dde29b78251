//! Sliding-window ring buffer for the compressor.
//!
//! Stores the most recent window of processed input so that the matchers and
//! the meta-block writer can reference any earlier position within the
//! window.  Two properties make the storage safe to read wherever the hot
//! loops want to read it:
//!
//! 1. A *tail* region of `tail_size` bytes past the nominal end mirrors the
//!    beginning of the buffer, so a read that crosses the wrap boundary is a
//!    single contiguous slice.
//! 2. Seven slack bytes past the tail absorb the 8-byte-wide speculative
//!    loads issued by the hash functions.

/// Slack bytes appended after the addressable region so that 8-byte hash
/// reads starting at the last valid position stay in bounds.
const K_SLACK_FOR_EIGHT_BYTE_HASHING_EVERYWHERE: usize = 7;

/// The low 31 bits of `pos` hold the logical write position; bit 31 records
/// that the position counter itself has overflowed at least once, so the
/// first-lap test stays false after the counter wraps.
const POS_MASK: u32 = (1u32 << 31) - 1;

/// Circular byte storage with a mirrored tail.
///
/// `setup` must be called before the first `write`.  Allocation is lazy: the
/// first write only allocates what it needs, and the buffer grows to its
/// full `size + tail_size` extent when a later write requires it.
pub struct RingBuffer {
    /// Size of the addressable ring area (power of two).
    size: u32,
    /// `size - 1`; positions are reduced with `pos & mask`.
    mask: u32,
    /// Size of the mirrored tail region (one input block).
    tail_size: u32,
    /// `size + tail_size`.
    total_size: u32,
    /// Currently allocated extent of the ring area (≤ `total_size`).
    cur_size: u32,
    /// Logical write position (see [`POS_MASK`]).
    pos: u32,
    buffer: Vec<u8>,
}

impl RingBuffer {
    pub fn new() -> Self {
        RingBuffer {
            size: 0,
            mask: 0,
            tail_size: 0,
            total_size: 0,
            cur_size: 0,
            pos: 0,
            buffer: Vec::new(),
        }
    }

    /// Sizes the ring area to `1 << window_bits` with a `1 << tail_bits`
    /// mirrored tail.  Does not allocate; `write` allocates on demand.
    pub fn setup(&mut self, window_bits: u32, tail_bits: u32) {
        self.size = 1u32 << window_bits;
        self.mask = (1u32 << window_bits) - 1;
        self.tail_size = 1u32 << tail_bits;
        self.total_size = self.size + self.tail_size;
    }

    /// Logical write position: bytes written so far, modulo 2^31.
    #[inline]
    pub fn pos(&self) -> u32 {
        self.pos & POS_MASK
    }

    /// True until the buffer has been written all the way around once.
    ///
    /// While this holds, positions past `pos` contain unwritten storage and
    /// the caller must zero-fill anything the hash loads could touch.  The
    /// raw `pos` is compared, so the overflow flag in bit 31 keeps the test
    /// false forever once set.
    #[inline]
    pub fn is_first_lap(&self) -> bool {
        self.pos <= self.mask
    }

    #[inline]
    pub fn mask(&self) -> usize {
        self.mask as usize
    }

    /// Full backing storage, including the mirrored tail and hash slack.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Zero-fills `n` bytes starting at the current masked write position.
    ///
    /// Used on the first lap only: the hash functions read up to 8 bytes at
    /// a time, so the few positions just past the copied input must hold
    /// defined values or the choice of backward references (and therefore
    /// the compressed bytes) would depend on whatever the allocator left
    /// there.  Once the buffer has wrapped, those positions hold real data
    /// and must not be cleared.
    pub fn zero_fill_after_pos(&mut self, n: usize) {
        let start = (self.pos & self.mask) as usize;
        let end = (start + n).min(self.buffer.len());
        for b in &mut self.buffer[start..end] {
            *b = 0;
        }
    }

    /// Grows the allocation to `buflen` addressable bytes plus hash slack,
    /// preserving previously written content.
    fn init_buffer(&mut self, buflen: u32) {
        let new_len = buflen as usize + K_SLACK_FOR_EIGHT_BYTE_HASHING_EVERYWHERE;
        self.buffer.resize(new_len, 0);
        self.cur_size = buflen;
    }

    /// Appends `bytes` at the logical write position, wrapping at `mask` and
    /// mirroring anything that lands in the first `tail_size` positions into
    /// the tail region.
    ///
    /// The caller never writes more than `size` bytes per call (one input
    /// block), so at most one wrap can occur per write.
    pub fn write(&mut self, bytes: &[u8]) {
        let n = bytes.len();
        if self.pos == 0 && (n as u32) < self.tail_size {
            // First write, smaller than one block: allocate just enough.
            // Most one-shot users never need the full window allocation.
            self.pos = n as u32;
            self.init_buffer(self.pos);
            self.buffer[..n].copy_from_slice(bytes);
            return;
        }
        if self.cur_size < self.total_size {
            self.init_buffer(self.total_size);
            // The two bytes just before the nominal end are compared by the
            // match loops before the first wrap; give them defined values.
            self.buffer[self.size as usize - 2] = 0;
            self.buffer[self.size as usize - 1] = 0;
        }
        {
            let masked_pos = (self.pos & self.mask) as usize;
            // Mirror the prefix of this write into the tail if it lands there.
            if masked_pos < self.tail_size as usize {
                let p = self.size as usize + masked_pos;
                let count = n.min(self.tail_size as usize - masked_pos);
                self.buffer[p..p + count].copy_from_slice(&bytes[..count]);
            }
            if masked_pos + n <= self.size as usize {
                // The write fits without wrapping.
                self.buffer[masked_pos..masked_pos + n].copy_from_slice(bytes);
            } else {
                // Split: fill through the end of the ring area *including*
                // the tail region (which keeps the mirror coherent), then
                // wrap the remainder to the beginning.
                let head = n.min(self.total_size as usize - masked_pos);
                self.buffer[masked_pos..masked_pos + head].copy_from_slice(&bytes[..head]);
                let rewind = self.size as usize - masked_pos;
                self.buffer[..n - rewind].copy_from_slice(&bytes[rewind..]);
            }
        }
        let counter_overflowed = (self.pos & !POS_MASK) != 0;
        self.pos = (self.pos & POS_MASK).wrapping_add(n as u32);
        if counter_overflowed {
            self.pos |= !POS_MASK;
        }
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}
