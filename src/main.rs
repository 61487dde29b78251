// brotli — command-line front end for the brotlir codec library.

use anyhow::Result;
use clap::Parser;

use brotli::cli::{run, Args};

fn main() -> Result<()> {
    let args = Args::parse();
    run(&args)
}
