//! Command-line front end: file-to-file compression and decompression
//! through the streaming engines with bounded buffers.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::decode::stream::{BrotliDecoder, BrotliDecoderResult};
use crate::encode::stream::{BrotliEncoder, BrotliEncoderOperation, BrotliEncoderParameter};

const IO_BUF_SIZE: usize = 1 << 16;

/// Brotli compressor and decompressor.
#[derive(Parser, Debug)]
#[command(name = "brotli", version, about)]
pub struct Args {
    /// File to process.
    pub input: PathBuf,

    /// Decompress instead of compress.
    #[arg(short = 'd', long = "decompress")]
    pub decompress: bool,

    /// Write output to stdout.
    #[arg(short = 'c', long = "stdout")]
    pub stdout: bool,

    /// Output file (default: input plus/minus a `.br` suffix).
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Compression quality, 0-11.
    #[arg(short = 'q', long = "quality", default_value_t = 11)]
    pub quality: u32,

    /// Log2 of the sliding window size, 10-24.
    #[arg(short = 'w', long = "window", default_value_t = 22)]
    pub window: u32,

    /// Suppress progress messages.
    #[arg(long = "quiet")]
    pub quiet: bool,
}

/// Derives the default output path: append `.br` when compressing, strip it
/// when decompressing.
pub fn default_output_path(input: &Path, decompress: bool) -> Result<PathBuf> {
    if decompress {
        match input.extension() {
            Some(ext) if ext == "br" => Ok(input.with_extension("")),
            _ => bail!(
                "cannot determine output name for {}; use --output",
                input.display()
            ),
        }
    } else {
        let mut name = input.as_os_str().to_owned();
        name.push(".br");
        Ok(PathBuf::from(name))
    }
}

fn compress_io(mut src: impl Read, mut dst: impl Write, quality: u32, window: u32) -> Result<u64> {
    let mut enc = BrotliEncoder::new();
    if !enc.set_parameter(BrotliEncoderParameter::Quality(quality))
        || !enc.set_parameter(BrotliEncoderParameter::Lgwin(window))
    {
        bail!("invalid compression parameters (quality {quality}, window {window})");
    }
    let mut in_buf = vec![0u8; IO_BUF_SIZE];
    let mut out_buf = vec![0u8; IO_BUF_SIZE];
    let mut carry: Vec<u8> = Vec::new();
    let mut total_out = 0u64;
    let mut eof = false;
    loop {
        if carry.is_empty() && !eof {
            let n = src.read(&mut in_buf).context("read input")?;
            if n == 0 {
                eof = true;
            } else {
                carry.extend_from_slice(&in_buf[..n]);
            }
        }
        let op = if eof {
            BrotliEncoderOperation::Finish
        } else {
            BrotliEncoderOperation::Process
        };
        let mut input: &[u8] = &carry;
        let mut output: &mut [u8] = &mut out_buf;
        if !enc.compress_stream(op, &mut input, &mut output) {
            bail!("compression failed");
        }
        let consumed = carry.len() - input.len();
        let written = IO_BUF_SIZE - output.len();
        carry.drain(..consumed);
        if written > 0 {
            dst.write_all(&out_buf[..written]).context("write output")?;
            total_out += written as u64;
        }
        if enc.is_finished() {
            dst.flush().context("flush output")?;
            return Ok(total_out);
        }
    }
}

fn decompress_io(mut src: impl Read, mut dst: impl Write) -> Result<u64> {
    let mut dec = BrotliDecoder::new();
    let mut in_buf = vec![0u8; IO_BUF_SIZE];
    let mut out_buf = vec![0u8; IO_BUF_SIZE];
    let mut total_out = 0u64;
    loop {
        let n = src.read(&mut in_buf).context("read input")?;
        let mut input: &[u8] = &in_buf[..n];
        loop {
            let mut output: &mut [u8] = &mut out_buf;
            let res = dec.decompress_stream(&mut input, &mut output);
            let written = IO_BUF_SIZE - output.len();
            if written > 0 {
                dst.write_all(&out_buf[..written]).context("write output")?;
                total_out += written as u64;
            }
            match res {
                BrotliDecoderResult::Success => {
                    dst.flush().context("flush output")?;
                    return Ok(total_out);
                }
                BrotliDecoderResult::NeedsMoreOutput => continue,
                BrotliDecoderResult::NeedsMoreInput => {
                    if n == 0 {
                        bail!("truncated stream");
                    }
                    break;
                }
                BrotliDecoderResult::Error(e) => bail!("corrupt stream: {e}"),
            }
        }
    }
}

/// Entry point used by the binary.
pub fn run(args: &Args) -> Result<()> {
    let src = File::open(&args.input)
        .with_context(|| format!("cannot open {}", args.input.display()))?;
    if args.stdout {
        let stdout = io::stdout();
        if args.decompress {
            decompress_io(src, stdout.lock())?;
        } else {
            compress_io(src, stdout.lock(), args.quality, args.window)?;
        }
        return Ok(());
    }
    let out_path = match &args.output {
        Some(p) => p.clone(),
        None => default_output_path(&args.input, args.decompress)?,
    };
    let dst = File::create(&out_path)
        .with_context(|| format!("cannot create {}", out_path.display()))?;
    let written = if args.decompress {
        decompress_io(src, dst)?
    } else {
        compress_io(src, dst, args.quality, args.window)?
    };
    if !args.quiet {
        eprintln!(
            "{} -> {} ({} bytes)",
            args.input.display(),
            out_path.display(),
            written
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_derivation() {
        assert_eq!(
            default_output_path(Path::new("file.txt"), false).unwrap(),
            PathBuf::from("file.txt.br")
        );
        assert_eq!(
            default_output_path(Path::new("file.txt.br"), true).unwrap(),
            PathBuf::from("file.txt")
        );
        assert!(default_output_path(Path::new("file.txt"), true).is_err());
    }

    #[test]
    fn io_roundtrip_through_cursors() {
        let data: Vec<u8> = b"the cli layer streams through bounded buffers. "
            .iter()
            .copied()
            .cycle()
            .take(200_000)
            .collect();
        let mut compressed = Vec::new();
        compress_io(&data[..], &mut compressed, 5, 18).expect("compress");
        assert!(compressed.len() < data.len());
        let mut plain = Vec::new();
        decompress_io(&compressed[..], &mut plain).expect("decompress");
        assert_eq!(plain, data);
    }
}
