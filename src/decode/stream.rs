//! Streaming decompression engine.
//!
//! [`BrotliDecoder`] is a resumable state machine over bounded input and
//! output buffers.  Input is appended to an internal bit reader and decoded
//! into the window ring buffer; decoded bytes drain into the caller's
//! buffer as space allows.  Whenever the bits for the next structure are
//! incomplete the cursor rewinds to the structure's start and the call
//! returns `NeedsMoreInput`; whenever the window fills ahead of the caller
//! the call returns `NeedsMoreOutput` with the current command partially
//! applied.  All malformed-input conditions are terminal.

use crate::decode::bit_reader::BitReader;
use crate::decode::huffman::{code_length_code_for_lengths, PrefixCode};
use crate::decode::types::BrotliDecoderError;
use crate::encode::command::{
    split_command_code, COPY_BASE, COPY_EXTRA, INSERT_BASE, INSERT_EXTRA, SHORT_CODE_INDEX,
    SHORT_CODE_OFFSET,
};
use crate::encode::huffman::CODE_LENGTH_CODE_ORDER;
use crate::BROTLI_WINDOW_GAP;

/// Result of one [`BrotliDecoder::decompress_stream`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrotliDecoderResult {
    /// Decoding suspended mid-structure; feed more input.
    NeedsMoreInput,
    /// The output buffer filled; drain it and call again.
    NeedsMoreOutput,
    /// The final meta-block was decoded and fully delivered.
    Success,
    /// Terminal failure; the instance is unusable.
    Error(BrotliDecoderError),
}

/// Aborting conditions inside one decoding step.
enum DecodeAbort {
    /// Ran out of buffered bits.
    Starved,
    Malformed(BrotliDecoderError),
}

type DResult<T> = Result<T, DecodeAbort>;

/// Outcome of one state-machine step.
enum Step {
    Continue,
    NeedInput,
    NeedOutput,
    Fail(BrotliDecoderError),
}

/// Coarse decoding stage; fine-grained command state lives in
/// [`CommandSub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    StreamHeader,
    MetaBlockBegin,
    SkipMetadata { remaining: usize },
    CopyUncompressed { remaining: usize },
    Commands,
    Done,
}

/// Position within the current command.
#[derive(Clone, Copy)]
enum CommandSub {
    Begin,
    Literals {
        remaining: usize,
        copy_len: usize,
        implicit: bool,
    },
    Distance {
        copy_len: usize,
    },
    Copy {
        remaining: usize,
        distance: usize,
    },
}

/// Per-meta-block decoding state: the three prefix codes and the remaining
/// length.
struct MetaBlockState {
    mlen_remaining: usize,
    is_last: bool,
    npostfix: u32,
    ndirect: u32,
    lit: PrefixCode,
    cmd: PrefixCode,
    dist: PrefixCode,
    sub: CommandSub,
}

/// Copies pending decoded bytes from the window into the caller's buffer.
fn flush_to(rb: &[u8], rb_size: usize, pos: u64, flushed: &mut u64, output: &mut &mut [u8]) {
    while *flushed < pos && !output.is_empty() {
        let mask = rb_size - 1;
        let start = (*flushed as usize) & mask;
        let n = ((pos - *flushed) as usize)
            .min(rb_size - start)
            .min(output.len());
        let out = core::mem::take(output);
        let (dst, rest) = out.split_at_mut(n);
        dst.copy_from_slice(&rb[start..start + n]);
        *output = rest;
        *flushed += n as u64;
    }
}

/// Streaming Brotli decompressor.
pub struct BrotliDecoder {
    br: BitReader,
    stage: Stage,
    /// Window ring buffer; allocated once the header names the window size.
    rb: Vec<u8>,
    rb_size: usize,
    max_backward: usize,
    /// Total bytes produced, custom dictionary included.
    pos: u64,
    /// Bytes delivered to the caller (dictionary excluded via its offset).
    flushed: u64,
    dist_cache: [i64; 4],
    meta: Option<MetaBlockState>,
    error: Option<BrotliDecoderError>,
    custom_dict: Vec<u8>,
}

impl BrotliDecoder {
    pub fn new() -> Self {
        BrotliDecoder {
            br: BitReader::new(),
            stage: Stage::StreamHeader,
            rb: Vec::new(),
            rb_size: 0,
            max_backward: 0,
            pos: 0,
            flushed: 0,
            dist_cache: [4, 11, 15, 16],
            meta: None,
            error: None,
            custom_dict: Vec::new(),
        }
    }

    /// Pre-seeds the window with `dict`, mirroring the encoder-side priming.
    /// Must be called before the first input byte; later calls are ignored.
    pub fn set_custom_dictionary(&mut self, dict: &[u8]) {
        if self.stage == Stage::StreamHeader && self.pos == 0 {
            self.custom_dict = dict.to_vec();
        }
    }

    fn bits(&mut self, n: u32) -> DResult<u32> {
        self.br.take_bits(n).ok_or(DecodeAbort::Starved)
    }

    fn bit(&mut self) -> DResult<u32> {
        self.bits(1)
    }

    /// Reads a block-type or tree count: 1, or a 1..=8-bit offset range.
    fn read_count(&mut self) -> DResult<u32> {
        if self.bit()? == 0 {
            return Ok(1);
        }
        let k = self.bits(3)?;
        let extra = self.bits(k)?;
        Ok((1 << k) + 1 + extra)
    }

    // ── Stream header ─────────────────────────────────────────────────────────

    fn step_stream_header(&mut self) -> Step {
        let cp = self.br.checkpoint();
        match self.stream_header_inner() {
            Ok(step) => step,
            Err(DecodeAbort::Starved) => {
                self.br.restore(cp);
                Step::NeedInput
            }
            Err(DecodeAbort::Malformed(e)) => Step::Fail(e),
        }
    }

    fn stream_header_inner(&mut self) -> DResult<Step> {
        let wbits = if self.bit()? == 0 {
            16
        } else {
            let n = self.bits(3)?;
            if n != 0 {
                17 + n
            } else {
                let m = self.bits(3)?;
                if m == 1 {
                    return Err(DecodeAbort::Malformed(BrotliDecoderError::InvalidWindowBits));
                }
                if m == 0 {
                    17
                } else {
                    8 + m
                }
            }
        };
        self.rb_size = 1usize << wbits;
        self.max_backward = self.rb_size - BROTLI_WINDOW_GAP;
        self.rb = vec![0u8; self.rb_size];
        if !self.custom_dict.is_empty() {
            let use_len = self.custom_dict.len().min(self.max_backward);
            let src = &self.custom_dict[self.custom_dict.len() - use_len..];
            self.rb[..use_len].copy_from_slice(src);
            self.pos = use_len as u64;
            self.flushed = use_len as u64;
        }
        self.stage = Stage::MetaBlockBegin;
        Ok(Step::Continue)
    }

    // ── Meta-block header ─────────────────────────────────────────────────────

    fn step_meta_block_begin(&mut self) -> Step {
        let cp = self.br.checkpoint();
        match self.meta_block_begin_inner() {
            Ok(step) => step,
            Err(DecodeAbort::Starved) => {
                self.br.restore(cp);
                Step::NeedInput
            }
            Err(DecodeAbort::Malformed(e)) => Step::Fail(e),
        }
    }

    fn meta_block_begin_inner(&mut self) -> DResult<Step> {
        let is_last = self.bit()? == 1;
        if is_last && self.bit()? == 1 {
            self.stage = Stage::Done;
            return Ok(Step::Continue);
        }
        let mnibbles_code = self.bits(2)?;
        if mnibbles_code == 3 {
            // Metadata meta-block: byte-aligned skip region.
            if is_last {
                return Err(DecodeAbort::Malformed(BrotliDecoderError::InvalidBlockLength));
            }
            if self.bit()? != 0 {
                return Err(DecodeAbort::Malformed(BrotliDecoderError::ReservedBitSet));
            }
            let mskipbytes = self.bits(2)?;
            let mut skip_len = 0usize;
            for i in 0..mskipbytes {
                let b = self.bits(8)? as usize;
                if i + 1 == mskipbytes && b == 0 {
                    // The most significant skip byte must not be zero.
                    return Err(DecodeAbort::Malformed(BrotliDecoderError::InvalidBlockLength));
                }
                skip_len |= b << (8 * i);
            }
            let remaining = if mskipbytes == 0 { 0 } else { skip_len + 1 };
            self.br.align_to_byte();
            self.stage = Stage::SkipMetadata { remaining };
            return Ok(Step::Continue);
        }
        let nibbles = 4 + mnibbles_code;
        let mlen_m1 = self.bits(nibbles * 4)?;
        if nibbles > 4 && (mlen_m1 >> ((nibbles - 1) * 4)) == 0 {
            // Lengths must use their shortest nibble form.
            return Err(DecodeAbort::Malformed(BrotliDecoderError::InvalidBlockLength));
        }
        let mlen = mlen_m1 as usize + 1;
        if !is_last && self.bit()? == 1 {
            self.br.align_to_byte();
            self.stage = Stage::CopyUncompressed { remaining: mlen };
            return Ok(Step::Continue);
        }
        // Compressed meta-block; only single-block-type, context-free
        // streams are inside the supported subset.
        for _ in 0..3 {
            if self.read_count()? != 1 {
                return Err(DecodeAbort::Malformed(BrotliDecoderError::Unsupported(
                    "multiple block types",
                )));
            }
        }
        let npostfix = self.bits(2)?;
        let ndirect = self.bits(4)? << npostfix;
        let _context_mode = self.bits(2)?;
        if self.read_count()? != 1 {
            return Err(DecodeAbort::Malformed(BrotliDecoderError::Unsupported(
                "literal context map",
            )));
        }
        if self.read_count()? != 1 {
            return Err(DecodeAbort::Malformed(BrotliDecoderError::Unsupported(
                "distance context map",
            )));
        }
        let lit = self.read_prefix_code(256)?;
        let cmd = self.read_prefix_code(704)?;
        let dist_alphabet = 16 + ndirect as usize + (48usize << npostfix);
        let dist = self.read_prefix_code(dist_alphabet)?;
        self.meta = Some(MetaBlockState {
            mlen_remaining: mlen,
            is_last,
            npostfix,
            ndirect,
            lit,
            cmd,
            dist,
            sub: CommandSub::Begin,
        });
        self.stage = Stage::Commands;
        Ok(Step::Continue)
    }

    // ── Prefix-code parsing ───────────────────────────────────────────────────

    fn read_cl_symbol(&mut self, code: &PrefixCode) -> DResult<u16> {
        match code.read_symbol(&mut self.br) {
            None => Err(DecodeAbort::Starved),
            Some(Ok(v)) => Ok(v),
            Some(Err(e)) => Err(DecodeAbort::Malformed(e)),
        }
    }

    fn read_prefix_code(&mut self, alphabet_size: usize) -> DResult<PrefixCode> {
        let form = self.bits(2)?;
        if form == 1 {
            return self.read_simple_prefix_code(alphabet_size);
        }
        let hskip = form as usize;

        // Lengths of the code-length code, in storage order, until the code
        // space closes.
        let static_code = code_length_code_for_lengths();
        let mut cl_lengths = [0u8; 18];
        let mut space = 32i32;
        let mut num_codes = 0usize;
        let mut single = 0usize;
        for i in hskip..18 {
            if space <= 0 {
                break;
            }
            let v = self.read_cl_symbol(&static_code)? as u8;
            cl_lengths[CODE_LENGTH_CODE_ORDER[i]] = v;
            if v != 0 {
                space -= 32 >> v;
                num_codes += 1;
                single = CODE_LENGTH_CODE_ORDER[i];
            }
        }
        if num_codes == 0 || (num_codes != 1 && space != 0) {
            return Err(DecodeAbort::Malformed(BrotliDecoderError::InvalidPrefixCode));
        }
        let cl_code = if num_codes == 1 {
            // Even a lone repeat code terminates: every read appends at
            // least one length, and the symbol count is bounded.
            PrefixCode::single_symbol(single as u16)
        } else {
            PrefixCode::from_lengths(&cl_lengths).map_err(DecodeAbort::Malformed)?
        };

        // The actual code lengths, with repeat codes 16 and 17.
        let mut lengths = vec![0u8; alphabet_size];
        let mut symbol = 0usize;
        let mut space = 32768i64;
        let mut prev_code_len = 8u8;
        let mut repeat = 0usize;
        let mut repeat_code_len = 0u8;
        while symbol < alphabet_size && space > 0 {
            let code_len = self.read_cl_symbol(&cl_code)? as u8;
            if code_len < 16 {
                repeat = 0;
                lengths[symbol] = code_len;
                symbol += 1;
                if code_len != 0 {
                    prev_code_len = code_len;
                    space -= 32768 >> code_len;
                }
            } else {
                let extra_bits = if code_len == 16 { 2u32 } else { 3 };
                let new_len = if code_len == 16 { prev_code_len } else { 0 };
                let repeat_delta = self.bits(extra_bits)? as usize;
                if repeat_code_len != new_len {
                    repeat = 0;
                    repeat_code_len = new_len;
                }
                let old_repeat = repeat;
                if repeat > 0 {
                    repeat = (repeat - 2) << extra_bits;
                }
                repeat += repeat_delta + 3;
                let delta = repeat - old_repeat;
                if symbol + delta > alphabet_size {
                    return Err(DecodeAbort::Malformed(BrotliDecoderError::InvalidPrefixCode));
                }
                for _ in 0..delta {
                    lengths[symbol] = new_len;
                    symbol += 1;
                }
                if new_len != 0 {
                    space -= (32768 >> new_len) * delta as i64;
                }
            }
        }
        if space != 0 {
            return Err(DecodeAbort::Malformed(BrotliDecoderError::InvalidPrefixCode));
        }
        PrefixCode::from_lengths(&lengths).map_err(DecodeAbort::Malformed)
    }

    fn read_simple_prefix_code(&mut self, alphabet_size: usize) -> DResult<PrefixCode> {
        let nsym = self.bits(2)? as usize + 1;
        let alphabet_bits = {
            let mut counter = alphabet_size - 1;
            let mut bits = 0u32;
            while counter != 0 {
                counter >>= 1;
                bits += 1;
            }
            bits
        };
        let mut syms = [0u16; 4];
        for i in 0..nsym {
            let s = self.bits(alphabet_bits)? as usize;
            if s >= alphabet_size {
                return Err(DecodeAbort::Malformed(BrotliDecoderError::InvalidSymbol));
            }
            for &prev in syms.iter().take(i) {
                if prev == s as u16 {
                    return Err(DecodeAbort::Malformed(BrotliDecoderError::InvalidSymbol));
                }
            }
            syms[i] = s as u16;
        }
        if nsym == 1 {
            return Ok(PrefixCode::single_symbol(syms[0]));
        }
        let mut lengths = vec![0u8; alphabet_size];
        match nsym {
            2 => {
                lengths[syms[0] as usize] = 1;
                lengths[syms[1] as usize] = 1;
            }
            3 => {
                lengths[syms[0] as usize] = 1;
                lengths[syms[1] as usize] = 2;
                lengths[syms[2] as usize] = 2;
            }
            _ => {
                if self.bits(1)? == 1 {
                    let depths = [1u8, 2, 3, 3];
                    for (i, &s) in syms.iter().enumerate() {
                        lengths[s as usize] = depths[i];
                    }
                } else {
                    for &s in &syms {
                        lengths[s as usize] = 2;
                    }
                }
            }
        }
        PrefixCode::from_lengths(&lengths).map_err(DecodeAbort::Malformed)
    }

    // ── Data stages ───────────────────────────────────────────────────────────

    fn step_skip_metadata(&mut self) -> Step {
        let Stage::SkipMetadata { remaining } = self.stage else {
            return Step::Fail(BrotliDecoderError::InvalidBlockLength);
        };
        let skipped = self.br.skip_bytes(remaining);
        if skipped < remaining {
            self.stage = Stage::SkipMetadata {
                remaining: remaining - skipped,
            };
            return Step::NeedInput;
        }
        self.stage = Stage::MetaBlockBegin;
        Step::Continue
    }

    fn step_copy_uncompressed(&mut self, output: &mut &mut [u8]) -> Step {
        let Stage::CopyUncompressed { mut remaining } = self.stage else {
            return Step::Fail(BrotliDecoderError::InvalidBlockLength);
        };
        let mask = self.rb_size - 1;
        while remaining > 0 {
            if (self.pos - self.flushed) as usize == self.rb_size {
                flush_to(&self.rb, self.rb_size, self.pos, &mut self.flushed, output);
                if (self.pos - self.flushed) as usize == self.rb_size {
                    self.stage = Stage::CopyUncompressed { remaining };
                    return Step::NeedOutput;
                }
            }
            let start = (self.pos as usize) & mask;
            let window_room = self.rb_size - start;
            let flush_room = self.rb_size - (self.pos - self.flushed) as usize;
            let want = remaining.min(window_room).min(flush_room);
            let got = self.br.take_bytes(&mut self.rb[start..start + want]);
            if got == 0 {
                self.stage = Stage::CopyUncompressed { remaining };
                return Step::NeedInput;
            }
            self.pos += got as u64;
            remaining -= got;
        }
        self.stage = Stage::MetaBlockBegin;
        Step::Continue
    }

    fn step_commands(&mut self, output: &mut &mut [u8]) -> Step {
        let rb_size = self.rb_size;
        let mask = rb_size - 1;
        let max_backward = self.max_backward;
        loop {
            let Some(meta) = self.meta.as_mut() else {
                return Step::Fail(BrotliDecoderError::InvalidBlockLength);
            };
            match meta.sub {
                CommandSub::Begin => {
                    if meta.mlen_remaining == 0 {
                        if meta.is_last {
                            self.stage = Stage::Done;
                        } else {
                            self.stage = Stage::MetaBlockBegin;
                        }
                        self.meta = None;
                        return Step::Continue;
                    }
                    let cp = self.br.checkpoint();
                    let cmd_sym = match meta.cmd.read_symbol(&mut self.br) {
                        None => return Step::NeedInput,
                        Some(Ok(s)) => s,
                        Some(Err(e)) => return Step::Fail(e),
                    };
                    let (inscode, copycode, implicit) = split_command_code(cmd_sym);
                    let (insert_len, copy_len) = {
                        let ins_extra = match self.br.take_bits(INSERT_EXTRA[inscode as usize]) {
                            Some(v) => v,
                            None => {
                                self.br.restore(cp);
                                return Step::NeedInput;
                            }
                        };
                        let copy_extra = match self.br.take_bits(COPY_EXTRA[copycode as usize]) {
                            Some(v) => v,
                            None => {
                                self.br.restore(cp);
                                return Step::NeedInput;
                            }
                        };
                        (
                            INSERT_BASE[inscode as usize] as usize + ins_extra as usize,
                            COPY_BASE[copycode as usize] as usize + copy_extra as usize,
                        )
                    };
                    if insert_len > meta.mlen_remaining {
                        return Step::Fail(BrotliDecoderError::InvalidBlockLength);
                    }
                    meta.sub = CommandSub::Literals {
                        remaining: insert_len,
                        copy_len,
                        implicit,
                    };
                }
                CommandSub::Literals {
                    mut remaining,
                    copy_len,
                    implicit,
                } => {
                    while remaining > 0 {
                        if (self.pos - self.flushed) as usize == rb_size {
                            flush_to(&self.rb, rb_size, self.pos, &mut self.flushed, output);
                            if (self.pos - self.flushed) as usize == rb_size {
                                meta.sub = CommandSub::Literals {
                                    remaining,
                                    copy_len,
                                    implicit,
                                };
                                return Step::NeedOutput;
                            }
                        }
                        let lit = match meta.lit.read_symbol(&mut self.br) {
                            None => {
                                meta.sub = CommandSub::Literals {
                                    remaining,
                                    copy_len,
                                    implicit,
                                };
                                return Step::NeedInput;
                            }
                            Some(Ok(s)) => s,
                            Some(Err(e)) => return Step::Fail(e),
                        };
                        self.rb[(self.pos as usize) & mask] = lit as u8;
                        self.pos += 1;
                        meta.mlen_remaining -= 1;
                        remaining -= 1;
                    }
                    if meta.mlen_remaining == 0 {
                        // Meta-block length exhausted: the copy part of this
                        // command is void.
                        meta.sub = CommandSub::Begin;
                    } else if implicit {
                        let distance = self.dist_cache[0];
                        let max_distance = (self.pos as usize).min(max_backward);
                        if distance <= 0 || distance as usize > max_distance {
                            return Step::Fail(BrotliDecoderError::InvalidDistance);
                        }
                        if copy_len > meta.mlen_remaining {
                            return Step::Fail(BrotliDecoderError::InvalidBlockLength);
                        }
                        meta.sub = CommandSub::Copy {
                            remaining: copy_len,
                            distance: distance as usize,
                        };
                    } else {
                        meta.sub = CommandSub::Distance { copy_len };
                    }
                }
                CommandSub::Distance { copy_len } => {
                    let cp = self.br.checkpoint();
                    let dcode = match meta.dist.read_symbol(&mut self.br) {
                        None => return Step::NeedInput,
                        Some(Ok(s)) => s as usize,
                        Some(Err(e)) => return Step::Fail(e),
                    };
                    let ndirect = meta.ndirect as usize;
                    let distance: i64 = if dcode < 16 {
                        self.dist_cache[SHORT_CODE_INDEX[dcode]] + SHORT_CODE_OFFSET[dcode]
                    } else if dcode < 16 + ndirect {
                        (dcode - 16 + 1) as i64
                    } else {
                        let npostfix = meta.npostfix;
                        let postfix_mask = (1usize << npostfix) - 1;
                        let hcode = (dcode - ndirect - 16) >> npostfix;
                        let lcode = (dcode - ndirect - 16) & postfix_mask;
                        let nbits = 1 + (hcode as u32 >> 1);
                        let offset = ((2 + (hcode & 1)) << nbits) - 4;
                        let extra = match self.br.take_bits(nbits) {
                            Some(v) => v as usize,
                            None => {
                                self.br.restore(cp);
                                return Step::NeedInput;
                            }
                        };
                        (((offset + extra) << npostfix) + lcode + ndirect + 1) as i64
                    };
                    if distance <= 0 {
                        return Step::Fail(BrotliDecoderError::InvalidDistance);
                    }
                    let distance = distance as usize;
                    let max_distance = (self.pos as usize).min(max_backward);
                    if distance > max_distance {
                        return Step::Fail(if distance > max_backward {
                            BrotliDecoderError::Unsupported("static dictionary reference")
                        } else {
                            BrotliDecoderError::InvalidDistance
                        });
                    }
                    if copy_len > meta.mlen_remaining {
                        return Step::Fail(BrotliDecoderError::InvalidBlockLength);
                    }
                    if dcode != 0 {
                        self.dist_cache[3] = self.dist_cache[2];
                        self.dist_cache[2] = self.dist_cache[1];
                        self.dist_cache[1] = self.dist_cache[0];
                        self.dist_cache[0] = distance as i64;
                    }
                    meta.sub = CommandSub::Copy {
                        remaining: copy_len,
                        distance,
                    };
                }
                CommandSub::Copy {
                    mut remaining,
                    distance,
                } => {
                    while remaining > 0 {
                        if (self.pos - self.flushed) as usize == rb_size {
                            flush_to(&self.rb, rb_size, self.pos, &mut self.flushed, output);
                            if (self.pos - self.flushed) as usize == rb_size {
                                meta.sub = CommandSub::Copy {
                                    remaining,
                                    distance,
                                };
                                return Step::NeedOutput;
                            }
                        }
                        let b = self.rb[((self.pos - distance as u64) as usize) & mask];
                        self.rb[(self.pos as usize) & mask] = b;
                        self.pos += 1;
                        meta.mlen_remaining -= 1;
                        remaining -= 1;
                    }
                    meta.sub = CommandSub::Begin;
                }
            }
        }
    }

    // ── Driver ────────────────────────────────────────────────────────────────

    /// One bounded streaming step: consumes all of `*input`, fills `*output`
    /// as far as decoding allows, and reports how to proceed.
    pub fn decompress_stream(
        &mut self,
        input: &mut &[u8],
        output: &mut &mut [u8],
    ) -> BrotliDecoderResult {
        if let Some(e) = self.error {
            return BrotliDecoderResult::Error(e);
        }
        if !input.is_empty() {
            self.br.append(*input);
            *input = &[];
        }
        loop {
            if self.rb_size > 0 {
                flush_to(&self.rb, self.rb_size, self.pos, &mut self.flushed, output);
            }
            let step = match self.stage {
                Stage::StreamHeader => self.step_stream_header(),
                Stage::MetaBlockBegin => self.step_meta_block_begin(),
                Stage::SkipMetadata { .. } => self.step_skip_metadata(),
                Stage::CopyUncompressed { .. } => self.step_copy_uncompressed(output),
                Stage::Commands => self.step_commands(output),
                Stage::Done => {
                    return if self.flushed < self.pos {
                        BrotliDecoderResult::NeedsMoreOutput
                    } else {
                        BrotliDecoderResult::Success
                    };
                }
            };
            match step {
                Step::Continue => continue,
                Step::NeedInput => return BrotliDecoderResult::NeedsMoreInput,
                Step::NeedOutput => return BrotliDecoderResult::NeedsMoreOutput,
                Step::Fail(e) => {
                    self.error = Some(e);
                    return BrotliDecoderResult::Error(e);
                }
            }
        }
    }
}

impl Default for BrotliDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(stream: &[u8]) -> Result<Vec<u8>, BrotliDecoderError> {
        let mut dec = BrotliDecoder::new();
        let mut input = stream;
        let mut out = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let mut dst: &mut [u8] = &mut buf;
            let res = dec.decompress_stream(&mut input, &mut dst);
            let written = 4096 - dst.len();
            out.extend_from_slice(&buf[..written]);
            match res {
                BrotliDecoderResult::Success => return Ok(out),
                BrotliDecoderResult::NeedsMoreOutput => continue,
                BrotliDecoderResult::NeedsMoreInput => {
                    return Err(BrotliDecoderError::TruncatedStream)
                }
                BrotliDecoderResult::Error(e) => return Err(e),
            }
        }
    }

    #[test]
    fn empty_last_block_decodes_to_nothing() {
        // lgwin 16 header (single 0 bit) + ISLAST + ISLASTEMPTY = 0b110.
        let stream = [0b0000_0110u8];
        assert_eq!(decode_all(&stream).expect("valid"), Vec::<u8>::new());
    }

    #[test]
    fn reserved_window_code_is_rejected() {
        // First bit 1, then 3 zero bits, then m = 1: reserved.
        let stream = [0b0_001_000_1u8, 0];
        assert_eq!(
            decode_all(&stream),
            Err(BrotliDecoderError::InvalidWindowBits)
        );
    }

    #[test]
    fn truncated_stream_reports_need_input() {
        let mut dec = BrotliDecoder::new();
        // Header only; no meta-block bits at all.
        let mut input: &[u8] = &[0b0000_0000];
        let mut buf = [0u8; 16];
        let mut dst: &mut [u8] = &mut buf;
        assert_eq!(
            dec.decompress_stream(&mut input, &mut dst),
            BrotliDecoderResult::NeedsMoreInput
        );
        assert!(input.is_empty(), "input must be fully consumed");
    }

    #[test]
    fn uncompressed_meta_block_roundtrip() {
        // Hand-built stream: lgwin 16, one uncompressed block "AB", last-empty.
        use crate::encode::bit_writer::BitWriter;
        let mut w = BitWriter::new(0, 1); // window header: single 0 bit
        w.write_bits(1, 0); // ISLAST = 0
        w.write_bits(2, 0); // MNIBBLES = 4
        w.write_bits(16, 1); // MLEN - 1 = 1
        w.write_bits(1, 1); // ISUNCOMPRESSED
        w.jump_to_byte_boundary();
        w.write_bytes(b"AB");
        w.write_bits(2, 3); // ISLAST + ISLASTEMPTY
        w.jump_to_byte_boundary();
        assert_eq!(decode_all(w.full_bytes()).expect("valid"), b"AB");
    }

    #[test]
    fn metadata_block_is_skipped() {
        use crate::encode::bit_writer::BitWriter;
        let mut w = BitWriter::new(0, 1);
        // Metadata block skipping 3 bytes.
        w.write_bits(1, 0); // ISLAST = 0
        w.write_bits(2, 3); // MNIBBLES code 3
        w.write_bits(1, 0); // reserved
        w.write_bits(2, 1); // MSKIPBYTES = 1
        w.write_bits(8, 2); // MSKIPLEN - 1 = 2 → skip 3
        w.jump_to_byte_boundary();
        w.write_bytes(&[0xDE, 0xAD, 0xBE]);
        w.write_bits(2, 3); // last-empty
        w.jump_to_byte_boundary();
        assert_eq!(decode_all(w.full_bytes()).expect("valid"), Vec::<u8>::new());
    }

    #[test]
    fn error_state_is_sticky() {
        let mut dec = BrotliDecoder::new();
        let mut input: &[u8] = &[0b0_001_000_1u8, 0];
        let mut buf = [0u8; 16];
        let mut dst: &mut [u8] = &mut buf;
        let first = dec.decompress_stream(&mut input, &mut dst);
        assert!(matches!(first, BrotliDecoderResult::Error(_)));
        let mut input2: &[u8] = &[0, 0, 0];
        let mut dst2: &mut [u8] = &mut buf;
        let second = dec.decompress_stream(&mut input2, &mut dst2);
        assert_eq!(first, second, "errors must latch");
    }
}
