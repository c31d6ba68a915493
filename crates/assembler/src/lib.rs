//! Decet-256 assembler library.

use decet_core as _;
#[cfg(test)]
use tempfile as _;

/// Top-level two-pass assembler pipeline.
pub mod assembler;
/// Command statement decoding into compiled machine words.
pub mod command;
/// `.data`/`.string`/`.struct` body parsing into the data array.
pub mod data;
/// Memory image for the command segment.
pub mod image;
/// Radix-32 rendering of addresses, words, and output file lines.
pub mod output;
/// Statement classification and label handling.
pub mod parser;
/// Macro expansion producing the flat source stream (pass 0).
pub mod preprocessor;
/// Source line model and whitespace normalization.
pub mod source;
/// Symbol table and lifecycle transitions.
pub mod symbols;
