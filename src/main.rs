//! lljson CLI
//!
//! Lowers a textual LLVM IR module (.ll) to a JSON document.
//!
//! # Usage
//!
//! ```bash
//! # write module.json next to the input
//! lljson module.ll
//!
//! # explicit destination
//! lljson module.ll -o dump.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "lljson",
    version,
    about = "Lowers an LLVM IR module into a self-describing JSON document",
    long_about = r#"
lljson reads a textual LLVM IR module and emits a JSON document that
captures the type system, global variables, functions with their
control-flow graphs, every instruction variant, and the operand graph.

The destination file must not already exist; lljson never overwrites.

WORKFLOW:
  1. Produce textual IR from source:
     clang -S -emit-llvm program.c -o program.ll

  2. Lower it:
     lljson program.ll -o program.json
"#
)]
struct Args {
    /// Input textual IR file (.ll)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file path (defaults to the input with a .json extension)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let source = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let mut module = lljson::parse(&source)
        .with_context(|| format!("failed to parse {}", args.input.display()))?;
    if module.name().is_empty() {
        module.set_name(args.input.display().to_string());
    }

    let output = args
        .output
        .unwrap_or_else(|| args.input.with_extension("json"));
    lljson::encode_to_file(&module, &output)?;

    log::debug!("wrote {}", output.display());
    Ok(())
}
