//! Machine definition for the Decet-256 target.
//!
//! The target is a flat 256-word machine with 8 general registers and a fixed
//! 10-bit word. This crate is the single source of truth for everything the
//! assembler must agree on with the machine:
//!
//! - the instruction set (16 opcodes with fixed operand counts),
//! - the operand-type codes and the per-opcode legality tables,
//! - the 10-bit word layout, including the 2-bit ARE relocation tag.
//!
//! It performs no I/O and holds no state; the assembler crate builds on it.

/// Closed instruction set, operand-type codes, and legality tables.
pub mod isa;
pub use isa::{
    is_register_name, is_reserved_word, Opcode, OperandKind, IMMEDIATE_MAX, IMMEDIATE_MIN,
    STRUCT_FIELD_MAX, STRUCT_FIELD_MIN,
};

/// 10-bit machine word construction and field extraction.
pub mod word;
pub use word::{Are, Word, WordRangeError, WORD_BITS};

/// Number of addressable words in target memory.
pub const MEMORY_WORDS: usize = 256;

/// Address where the command segment is loaded (start of the image).
pub const LOAD_ADDRESS: u16 = 100;

/// Number of general registers (`r0`..`r7`).
pub const REGISTER_COUNT: u8 = 8;
