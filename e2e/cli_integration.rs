//! E2E: the `brotli` binary, file to file.

use std::fs;
use std::process::Command;

fn brotli_bin() -> &'static str {
    env!("CARGO_BIN_EXE_brotli")
}

#[test]
fn compress_then_decompress_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input_path = dir.path().join("corpus.txt");
    let data: Vec<u8> = b"command line round trip through real files. "
        .iter()
        .copied()
        .cycle()
        .take(100_000)
        .collect();
    fs::write(&input_path, &data).expect("write input");

    let status = Command::new(brotli_bin())
        .arg(&input_path)
        .args(["-q", "5", "--quiet"])
        .status()
        .expect("run compressor");
    assert!(status.success());
    let br_path = dir.path().join("corpus.txt.br");
    let compressed = fs::read(&br_path).expect("compressed file exists");
    assert!(compressed.len() < data.len());

    fs::remove_file(&input_path).expect("remove original");
    let status = Command::new(brotli_bin())
        .arg(&br_path)
        .args(["-d", "--quiet"])
        .status()
        .expect("run decompressor");
    assert!(status.success());
    let restored = fs::read(&input_path).expect("restored file exists");
    assert_eq!(restored, data);
}

#[test]
fn explicit_output_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input_path = dir.path().join("in.bin");
    let out_path = dir.path().join("custom.out");
    fs::write(&input_path, b"explicit destinations").expect("write input");
    let status = Command::new(brotli_bin())
        .arg(&input_path)
        .arg("-o")
        .arg(&out_path)
        .args(["-q", "2", "--quiet"])
        .status()
        .expect("run");
    assert!(status.success());
    assert!(out_path.exists());
}

#[test]
fn corrupt_input_exits_nonzero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bad_path = dir.path().join("bad.br");
    fs::write(&bad_path, [0x11u8, 0x22, 0x33]).expect("write garbage");
    let status = Command::new(brotli_bin())
        .arg(&bad_path)
        .args(["-d", "--quiet"])
        .status()
        .expect("run");
    assert!(!status.success(), "corrupt input must fail the process");
}

#[test]
fn decompress_without_br_suffix_requires_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("plain.dat");
    fs::write(&path, b"x").expect("write");
    let status = Command::new(brotli_bin())
        .arg(&path)
        .args(["-d", "--quiet"])
        .status()
        .expect("run");
    assert!(!status.success());
}
