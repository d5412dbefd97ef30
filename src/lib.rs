//! lljson: LLVM IR to JSON lowering
//!
//! This crate takes a fully-materialized LLVM IR module and emits a stable,
//! self-describing JSON document capturing the type system, global
//! variables, functions with their control-flow graphs, every instruction
//! variant, and the operand graph.
//!
//! # Architecture
//!
//! ```text
//! textual IR (.ll)
//!        │
//!        ▼ (parser)
//! ┌──────────────┐
//! │   ir::Module │  ← or built programmatically by the host
//! └──────┬───────┘
//!        │ (encode: contexts first, then structs/globals/functions)
//!        ▼
//! ┌──────────────┐
//! │ schema::Module│
//! └──────┬───────┘
//!        │ (serde_json, pretty)
//!        ▼
//! JSON document
//! ```
//!
//! Encoding is single-threaded and deterministic: module children are
//! emitted in IR-declaration order, and per-function indices depend only on
//! IR order. Two runs over the same module produce identical bytes.
//!
//! # Example
//!
//! ```
//! let source = r#"
//! define i32 @add(i32 %a, i32 %b) {
//! entry:
//!   %sum = add i32 %a, %b
//!   ret i32 %sum
//! }
//! "#;
//! let module = lljson::parse(source).unwrap();
//! let json = lljson::encode_to_string(&module).unwrap();
//! assert!(json.contains("\"Binary\""));
//! ```

pub mod encode;
pub mod ir;
pub mod parser;
pub mod schema;

pub use encode::{encode_module, EncodeError};
pub use parser::{parse, ParseError};

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

/// Encode a module to pretty-printed JSON.
pub fn encode_to_string(module: &ir::Module) -> Result<String> {
    let encoded = encode_module(module).context("failed to encode module")?;
    serde_json::to_string_pretty(&encoded).context("failed to render JSON")
}

/// Encode a module and write the JSON document to `path`.
///
/// Refuses to overwrite: the destination must not exist.
pub fn encode_to_file<P: AsRef<Path>>(module: &ir::Module, path: P) -> Result<()> {
    let path = path.as_ref();
    let rendered = encode_to_string(module)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(rendered.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Parse textual IR and encode it in one step.
pub fn parse_and_encode(source: &str) -> Result<String> {
    let module = parse(source).context("failed to parse module")?;
    encode_to_string(&module)
}
