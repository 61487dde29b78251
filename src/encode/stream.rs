//! Streaming compression engine.
//!
//! [`BrotliEncoder`] turns bounded, resumable buffer operations into one
//! logical compression: the caller feeds input and drains output in chunks
//! of its choosing, with PROCESS/FLUSH/FINISH semantics.  Between calls the
//! engine keeps the ring buffer, matcher tables, pending commands, and the
//! partial trailing byte of the bit stream.
//!
//! Input accumulates in the ring buffer up to one block; a full block (or a
//! flush/finish with a partial one) runs the match loop and entropy-codes a
//! meta-block into an internal queue the caller drains at its own pace.

use crate::encode::backward_references::create_backward_references;
use crate::encode::bit_writer::BitWriter;
use crate::encode::command::Command;
use crate::encode::metablock::{store_empty_metadata_meta_block, write_meta_block_internal};
use crate::encode::types::{
    choose_hasher, compute_lgblock, compute_rb_bits, sanitize_params, EncoderMode, EncoderParams,
    FAST_TWO_PASS_COMPRESSION_QUALITY,
};
use crate::hash::types::Hasher;
use crate::max_backward_limit;
use crate::ringbuffer::RingBuffer;

/// What a [`BrotliEncoder::compress_stream`] call should work towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrotliEncoderOperation {
    /// Consume input as block capacity allows; produce output opportunistically.
    Process,
    /// Consume all input and emit enough output to decode everything so far.
    Flush,
    /// Consume all input, emit everything, and close the stream.
    Finish,
}

/// Tunable knob set through [`BrotliEncoder::set_parameter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrotliEncoderParameter {
    Mode(EncoderMode),
    /// 0–11.
    Quality(u32),
    /// Log2 of window size, 10–24.
    Lgwin(u32),
    /// Log2 of block size, 16–24, or 0 for automatic.
    Lgblock(u32),
    /// Expected input size, 0 if unknown.
    SizeHint(u64),
    DisableLiteralContextModeling(bool),
}

/// Externally observable stream state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Processing,
    FlushRequested,
    Finished,
    Errored,
}

/// Reduces a 64-bit stream position to the 32-bit domain the matcher tables
/// store, preserving distance arithmetic across the wrap.
#[inline]
pub(crate) fn wrap_position(position: u64) -> u32 {
    let result = position as u32;
    let gb = position >> 30;
    if gb > 2 {
        (result & ((1u32 << 30) - 1)) | ((((gb - 1) & 1) as u32 + 1) << 30)
    } else {
        result
    }
}

/// Streaming Brotli compressor.
pub struct BrotliEncoder {
    params: EncoderParams,
    is_initialized: bool,
    /// Total bytes accepted from the caller (dictionary included).
    input_pos: u64,
    /// End of the last emitted meta-block.
    last_flush_pos: u64,
    /// End of the last block run through the match loop.
    last_processed_pos: u64,
    commands: Vec<Command>,
    num_literals: usize,
    last_insert_len: usize,
    dist_cache: [i64; 4],
    saved_dist_cache: [i64; 4],
    last_byte: u8,
    last_byte_bits: u8,
    ringbuffer: RingBuffer,
    hasher: Option<Hasher>,
    stream_state: StreamState,
    is_last_block_emitted: bool,
    output: Vec<u8>,
    output_pos: usize,
}

impl BrotliEncoder {
    pub fn new() -> Self {
        BrotliEncoder {
            params: EncoderParams::default(),
            is_initialized: false,
            input_pos: 0,
            last_flush_pos: 0,
            last_processed_pos: 0,
            commands: Vec::new(),
            num_literals: 0,
            last_insert_len: 0,
            dist_cache: [4, 11, 15, 16],
            saved_dist_cache: [4, 11, 15, 16],
            last_byte: 0,
            last_byte_bits: 0,
            ringbuffer: RingBuffer::new(),
            hasher: None,
            stream_state: StreamState::Processing,
            is_last_block_emitted: false,
            output: Vec::new(),
            output_pos: 0,
        }
    }

    /// Adjusts one parameter.  Returns false once the stream has started or
    /// when the value is rejected.
    pub fn set_parameter(&mut self, p: BrotliEncoderParameter) -> bool {
        if self.is_initialized {
            return false;
        }
        match p {
            BrotliEncoderParameter::Mode(m) => {
                self.params.mode = m;
                true
            }
            BrotliEncoderParameter::Quality(q) => {
                self.params.quality = q;
                true
            }
            BrotliEncoderParameter::Lgwin(w) => {
                self.params.lgwin = w;
                true
            }
            BrotliEncoderParameter::Lgblock(b) => {
                if b != 0 && !(crate::BROTLI_MIN_INPUT_BLOCK_BITS..=crate::BROTLI_MAX_INPUT_BLOCK_BITS).contains(&b) {
                    return false;
                }
                self.params.lgblock = b;
                true
            }
            BrotliEncoderParameter::SizeHint(h) => {
                self.params.size_hint = h;
                true
            }
            BrotliEncoderParameter::DisableLiteralContextModeling(v) => {
                self.params.disable_literal_context_modeling = v;
                true
            }
        }
    }

    /// True once FINISH has run to completion and all output was drained.
    pub fn is_finished(&self) -> bool {
        self.stream_state == StreamState::Finished && self.pending_output_len() == 0
    }

    fn pending_output_len(&self) -> usize {
        self.output.len() - self.output_pos
    }

    /// The stream header encodes the window size into the first byte.
    fn encode_window_bits(lgwin: u32) -> (u8, u8) {
        if lgwin == 16 {
            (0, 1)
        } else if lgwin == 17 {
            (1, 7)
        } else if lgwin > 17 {
            ((((lgwin - 17) << 1) | 1) as u8, 4)
        } else {
            ((((lgwin - 8) << 4) | 1) as u8, 7)
        }
    }

    /// Freezes parameters, sizes the ring buffer, and seeds the bit stream
    /// with the window header on the first streaming call.
    fn ensure_initialized(&mut self) -> bool {
        if self.is_initialized {
            return true;
        }
        sanitize_params(&mut self.params);
        self.params.lgblock = compute_lgblock(&self.params);
        self.ringbuffer
            .setup(compute_rb_bits(&self.params), self.params.lgblock);
        let (last_byte, last_byte_bits) = Self::encode_window_bits(self.params.lgwin);
        self.last_byte = last_byte;
        self.last_byte_bits = last_byte_bits;
        self.is_initialized = true;
        true
    }

    fn input_block_size(&self) -> usize {
        1usize << self.params.lgblock
    }

    fn remaining_input_block_size(&self) -> usize {
        let delta = (self.input_pos - self.last_processed_pos) as usize;
        self.input_block_size().saturating_sub(delta)
    }

    /// Copies caller input into the ring buffer.  No processing happens
    /// here; the matcher sees the bytes when a block completes.
    fn copy_input_to_ring_buffer(&mut self, input: &[u8]) {
        self.ringbuffer.write(input);
        self.input_pos += input.len() as u64;
        // On the first lap the positions just past the copied input are
        // unwritten storage; the 8-byte hash loads must never observe it,
        // or the compressed bytes would depend on allocator garbage.  After
        // one lap the tail mirror provides real data instead.
        if self.ringbuffer.is_first_lap() {
            self.ringbuffer.zero_fill_after_pos(7);
        }
    }

    /// Pre-seeds the window and the matcher with `dict`, as if it preceded
    /// the first real input byte.  Must be called before any input; no-op at
    /// the fast qualities, which do no window-based matching.
    pub fn set_custom_dictionary(&mut self, dict: &[u8]) {
        if !self.ensure_initialized() {
            return;
        }
        if dict.is_empty() || self.params.quality <= FAST_TWO_PASS_COMPRESSION_QUALITY {
            return;
        }
        let max_dict_size = max_backward_limit(self.params.lgwin);
        let dict = if dict.len() > max_dict_size {
            &dict[dict.len() - max_dict_size..]
        } else {
            dict
        };
        self.copy_input_to_ring_buffer(dict);
        self.last_flush_pos = dict.len() as u64;
        self.last_processed_pos = dict.len() as u64;
        if self.hasher.is_none() {
            self.params.hasher = choose_hasher(&self.params);
            self.hasher = Some(Hasher::new(&self.params));
        }
        let data = self.ringbuffer.data();
        let mask = self.ringbuffer.mask();
        if let Some(hasher) = self.hasher.as_mut() {
            if !hasher.common.is_prepared {
                hasher.prepare(false, dict.len(), data);
                hasher.common.is_prepared = true;
            }
            let overlap = hasher.store_lookahead() - 1;
            let mut i = 0usize;
            while i + overlap < dict.len() {
                hasher.store(data, mask, i);
                i += 1;
            }
        }
    }

    /// Runs the match loop over the accumulated block and emits one
    /// meta-block into the internal output queue.
    fn encode_data(&mut self, is_last: bool, _force_flush: bool) -> bool {
        let bytes = (self.input_pos - self.last_processed_pos) as usize;
        if bytes > self.input_block_size() {
            return false;
        }
        let wrapped_last_processed = wrap_position(self.last_processed_pos) as usize;

        if bytes != 0 {
            if self.hasher.is_none() {
                self.params.hasher = choose_hasher(&self.params);
                self.hasher = Some(Hasher::new(&self.params));
            }
            let one_shot = self.last_processed_pos == 0 && is_last;
            let data = self.ringbuffer.data();
            let mask = self.ringbuffer.mask();
            let Some(hasher) = self.hasher.as_mut() else {
                return false;
            };
            if !hasher.common.is_prepared {
                hasher.prepare(one_shot, bytes, data);
                if self.last_processed_pos == 0 {
                    hasher.common.dict_num_lookups = 0;
                    hasher.common.dict_num_matches = 0;
                }
                hasher.common.is_prepared = true;
            }
            hasher.stitch_to_previous_block(bytes, wrapped_last_processed, data, mask);
            create_backward_references(
                bytes,
                wrapped_last_processed,
                data,
                mask,
                &self.params,
                hasher,
                &mut self.dist_cache,
                &mut self.last_insert_len,
                &mut self.commands,
                &mut self.num_literals,
            );
            self.last_processed_pos = self.input_pos;
        }

        if self.last_insert_len > 0 {
            self.commands.push(Command::new_insert(self.last_insert_len));
            self.num_literals += self.last_insert_len;
            self.last_insert_len = 0;
        }
        if !is_last && self.input_pos == self.last_flush_pos {
            // Nothing accumulated; a flush of an empty block is pure
            // padding, handled on the output path.
            return true;
        }
        let metablock_size = (self.input_pos - self.last_flush_pos) as usize;
        let mut w = BitWriter::new(self.last_byte, self.last_byte_bits);
        write_meta_block_internal(
            self.ringbuffer.data(),
            self.ringbuffer.mask(),
            wrap_position(self.last_flush_pos) as usize,
            metablock_size,
            is_last,
            self.num_literals,
            &self.commands,
            &self.saved_dist_cache,
            &mut self.dist_cache,
            &mut w,
        );
        self.commands.clear();
        self.num_literals = 0;
        self.saved_dist_cache = self.dist_cache;
        self.last_flush_pos = self.input_pos;
        self.output.extend_from_slice(w.full_bytes());
        let (last_byte, last_byte_bits) = w.last_byte();
        self.last_byte = last_byte;
        self.last_byte_bits = last_byte_bits;
        if is_last {
            self.is_last_block_emitted = true;
            debug_assert_eq!(last_byte_bits, 0, "final meta-block must end byte-aligned");
        }
        true
    }

    /// Moves queued output into the caller's buffer; pads the bit stream to
    /// a byte boundary first when a flush is waiting on partial bits.
    /// Returns true when it made progress.
    fn inject_flush_or_push_output(&mut self, output: &mut &mut [u8]) -> bool {
        if self.stream_state == StreamState::FlushRequested && self.last_byte_bits != 0 {
            let mut w = BitWriter::new(self.last_byte, self.last_byte_bits);
            store_empty_metadata_meta_block(&mut w);
            self.output.extend_from_slice(w.full_bytes());
            self.last_byte = 0;
            self.last_byte_bits = 0;
            return true;
        }
        let pending = self.pending_output_len();
        if pending != 0 && !output.is_empty() {
            let n = pending.min(output.len());
            let out = core::mem::take(output);
            let (dst, rest) = out.split_at_mut(n);
            dst.copy_from_slice(&self.output[self.output_pos..self.output_pos + n]);
            *output = rest;
            self.output_pos += n;
            if self.output_pos == self.output.len() {
                self.output.clear();
                self.output_pos = 0;
            }
            return true;
        }
        false
    }

    fn check_flush_complete(&mut self) {
        if self.stream_state == StreamState::FlushRequested && self.pending_output_len() == 0 {
            self.stream_state = StreamState::Processing;
        }
    }

    /// One bounded streaming step.
    ///
    /// Consumes from the front of `*input` and writes to the front of
    /// `*output`, advancing both slices.  Returns false only on the terminal
    /// error state; otherwise the call made as much progress as the buffers
    /// allowed and can be repeated.
    pub fn compress_stream(
        &mut self,
        op: BrotliEncoderOperation,
        input: &mut &[u8],
        output: &mut &mut [u8],
    ) -> bool {
        if self.stream_state == StreamState::Errored {
            return false;
        }
        if !self.ensure_initialized() {
            self.stream_state = StreamState::Errored;
            return false;
        }
        // New input is only legal while processing; a pending flush must be
        // drained and a finished stream stays finished.
        if self.stream_state != StreamState::Processing && !input.is_empty() {
            return false;
        }
        loop {
            let remaining_block_size = self.remaining_input_block_size();
            if remaining_block_size != 0 && !input.is_empty() {
                let copy = remaining_block_size.min(input.len());
                self.copy_input_to_ring_buffer(&input[..copy]);
                *input = &input[copy..];
                continue;
            }
            if self.inject_flush_or_push_output(output) {
                continue;
            }
            // Compress only when the queue is empty and no flush is pending.
            if self.pending_output_len() == 0 && self.stream_state == StreamState::Processing {
                let op_forces = op != BrotliEncoderOperation::Process;
                if remaining_block_size == 0 || op_forces {
                    let is_last = input.is_empty() && op == BrotliEncoderOperation::Finish;
                    let force_flush = input.is_empty() && op == BrotliEncoderOperation::Flush;
                    if !self.encode_data(is_last, force_flush) {
                        self.stream_state = StreamState::Errored;
                        return false;
                    }
                    if force_flush {
                        self.stream_state = StreamState::FlushRequested;
                    }
                    if is_last {
                        self.stream_state = StreamState::Finished;
                    }
                    continue;
                }
            }
            break;
        }
        self.check_flush_complete();
        true
    }
}

impl Default for BrotliEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(enc: &mut BrotliEncoder, op: BrotliEncoderOperation, mut input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut chunk = [0u8; 128];
        loop {
            let mut dst: &mut [u8] = &mut chunk;
            assert!(enc.compress_stream(op, &mut input, &mut dst));
            let written = 128 - dst.len();
            out.extend_from_slice(&chunk[..written]);
            if input.is_empty() && written == 0 {
                break;
            }
        }
        out
    }

    #[test]
    fn parameters_freeze_after_first_byte() {
        let mut enc = BrotliEncoder::new();
        assert!(enc.set_parameter(BrotliEncoderParameter::Quality(5)));
        assert!(enc.set_parameter(BrotliEncoderParameter::Lgwin(18)));
        let mut input: &[u8] = b"x";
        let mut buf = [0u8; 64];
        let mut out: &mut [u8] = &mut buf;
        assert!(enc.compress_stream(BrotliEncoderOperation::Process, &mut input, &mut out));
        assert!(!enc.set_parameter(BrotliEncoderParameter::Quality(9)));
        assert!(!enc.set_parameter(BrotliEncoderParameter::Lgwin(20)));
    }

    #[test]
    fn lgblock_range_is_validated() {
        let mut enc = BrotliEncoder::new();
        assert!(enc.set_parameter(BrotliEncoderParameter::Lgblock(0)));
        assert!(enc.set_parameter(BrotliEncoderParameter::Lgblock(16)));
        assert!(enc.set_parameter(BrotliEncoderParameter::Lgblock(24)));
        assert!(!enc.set_parameter(BrotliEncoderParameter::Lgblock(8)));
        assert!(!enc.set_parameter(BrotliEncoderParameter::Lgblock(25)));
    }

    #[test]
    fn finish_on_empty_stream_emits_valid_header() {
        let mut enc = BrotliEncoder::new();
        enc.set_parameter(BrotliEncoderParameter::Quality(5));
        enc.set_parameter(BrotliEncoderParameter::Lgwin(22));
        let out = drain(&mut enc, BrotliEncoderOperation::Finish, b"");
        // Window header plus the last-empty meta-block fit a single byte.
        assert!(!out.is_empty());
        assert!(enc.is_finished());
    }

    #[test]
    fn finish_twice_is_a_noop() {
        let mut enc = BrotliEncoder::new();
        let first = drain(&mut enc, BrotliEncoderOperation::Finish, b"hello hello hello");
        assert!(enc.is_finished());
        let again = drain(&mut enc, BrotliEncoderOperation::Finish, b"");
        assert!(again.is_empty());
        assert!(!first.is_empty());
    }

    #[test]
    fn flush_byte_aligns_the_stream() {
        let mut enc = BrotliEncoder::new();
        enc.set_parameter(BrotliEncoderParameter::Quality(4));
        let flushed = drain(&mut enc, BrotliEncoderOperation::Flush, b"some data to flush");
        assert!(!flushed.is_empty());
        // After a completed flush nothing is pending and the partial byte
        // was sealed.
        assert_eq!(enc.pending_output_len(), 0);
        assert_eq!(enc.last_byte_bits, 0);
        // The stream is still open for more data.
        assert!(!enc.is_finished());
        let rest = drain(&mut enc, BrotliEncoderOperation::Finish, b"more data");
        assert!(!rest.is_empty());
        assert!(enc.is_finished());
    }

    #[test]
    fn window_header_bit_patterns() {
        assert_eq!(BrotliEncoder::encode_window_bits(16), (0, 1));
        assert_eq!(BrotliEncoder::encode_window_bits(17), (1, 7));
        assert_eq!(BrotliEncoder::encode_window_bits(18), (0b0011, 4));
        assert_eq!(BrotliEncoder::encode_window_bits(24), (0b1111, 4));
        assert_eq!(BrotliEncoder::encode_window_bits(10), (0b0010_0001, 7));
        assert_eq!(BrotliEncoder::encode_window_bits(15), (0b0111_0001, 7));
    }

    #[test]
    fn wrap_position_preserves_low_bits() {
        assert_eq!(wrap_position(0), 0);
        assert_eq!(wrap_position(123_456), 123_456);
        let big = (3u64 << 30) + 777;
        let wrapped = wrap_position(big);
        assert_eq!(wrapped & ((1 << 30) - 1), 777);
        assert!(wrapped >= 1 << 30, "wrapped position must stay past the window");
    }

    #[test]
    fn dictionary_is_skipped_at_fast_qualities() {
        let mut enc = BrotliEncoder::new();
        enc.set_parameter(BrotliEncoderParameter::Quality(1));
        enc.set_custom_dictionary(b"some dictionary content");
        assert_eq!(enc.input_pos, 0, "fast path must ignore the dictionary");
        let mut enc = BrotliEncoder::new();
        enc.set_parameter(BrotliEncoderParameter::Quality(5));
        enc.set_custom_dictionary(b"some dictionary content");
        assert_eq!(enc.input_pos, 23);
        assert_eq!(enc.last_flush_pos, 23);
    }
}
