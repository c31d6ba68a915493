//! Command statement decoding into compiled machine words.
//!
//! Decoding runs in fixed stages: split the statement into a command token
//! and up to two operand strings, resolve the mnemonic, classify each operand
//! by its shape, check the per-opcode legality tables, and emit one to five
//! words. Any stage failure abandons the statement; the driver records the
//! error and continues with the next line.

use decet_core::isa::{
    destination_kind_is_legal, source_kind_is_legal, Opcode, OperandKind, IMMEDIATE_MAX,
    IMMEDIATE_MIN, STRUCT_FIELD_MAX, STRUCT_FIELD_MIN,
};
use decet_core::{Are, Word};

use crate::image::Cell;
use crate::source::parse_strict_int;

/// A parsed register operand (`r0`..`r7`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register(pub u8);

impl Register {
    #[allow(clippy::cast_sign_loss, clippy::manual_range_contains)]
    const fn new(n: i16) -> Option<Self> {
        if n >= 0 && n <= 7 {
            Some(Self(n as u8))
        } else {
            None
        }
    }
}

/// A classified operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// `#n` literal value.
    Immediate(i16),
    /// Bare label reference, resolved in pass 2.
    Label(String),
    /// `label.field` struct field access.
    StructField {
        /// The struct's base label.
        label: String,
        /// The accessed field index.
        field: i16,
    },
    /// Register direct.
    Register(Register),
}

impl Operand {
    /// The 2-bit type code this operand contributes to the instruction word.
    #[must_use]
    pub const fn kind(&self) -> OperandKind {
        match self {
            Self::Immediate(_) => OperandKind::Immediate,
            Self::Label(_) => OperandKind::Label,
            Self::StructField { .. } => OperandKind::StructField,
            Self::Register(_) => OperandKind::Register,
        }
    }
}

/// One emitted word with its assigned instruction-counter address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledWord {
    /// Absolute address of this word.
    pub address: u16,
    /// The word, or a deferred label reference.
    pub cell: Cell,
}

/// Command decoding error with its source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    /// Kind of error.
    pub kind: CommandErrorKind,
    /// 1-indexed source line.
    pub line: usize,
}

/// Classification of command decoding errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandErrorKind {
    /// The command token matches no mnemonic.
    UnknownMnemonic(String),
    /// More than two operand strings.
    TooManyOperands,
    /// Operand count does not match the mnemonic's requirement.
    WrongOperandCount {
        /// The mnemonic in question.
        mnemonic: &'static str,
        /// Operands the mnemonic requires.
        expected: u8,
        /// Operands the statement supplied.
        found: u8,
    },
    /// A comma with no operand text beside it.
    EmptyOperand,
    /// Source operand type not permitted for this opcode.
    IllegalSourceOperand {
        /// The offending operand type.
        kind: OperandKind,
        /// The mnemonic in question.
        mnemonic: &'static str,
    },
    /// Destination operand type not permitted for this opcode.
    IllegalDestinationOperand {
        /// The offending operand type.
        kind: OperandKind,
        /// The mnemonic in question.
        mnemonic: &'static str,
    },
    /// Immediate value outside the accepted range.
    ImmediateOutOfRange(i16),
    /// Struct field index other than 1 or 2.
    StructFieldOutOfRange(i16),
    /// `#` followed by something that is not a strict decimal integer.
    InvalidImmediate(String),
    /// Struct field index that is not a strict decimal integer.
    InvalidStructField(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::fmt::Display for CommandErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownMnemonic(name) => write!(f, "unrecognized command '{name}'"),
            Self::TooManyOperands => write!(f, "more than two operands"),
            Self::WrongOperandCount {
                mnemonic,
                expected,
                found,
            } => write!(
                f,
                "'{mnemonic}' takes {expected} operand(s), found {found}"
            ),
            Self::EmptyOperand => write!(f, "empty operand beside a comma"),
            Self::IllegalSourceOperand { kind, mnemonic } => write!(
                f,
                "incompatible source operand of type '{kind}' for '{mnemonic}'"
            ),
            Self::IllegalDestinationOperand { kind, mnemonic } => write!(
                f,
                "incompatible destination operand of type '{kind}' for '{mnemonic}'"
            ),
            Self::ImmediateOutOfRange(value) => write!(
                f,
                "immediate value {value} exceeds bounds [{IMMEDIATE_MIN}, {IMMEDIATE_MAX}]"
            ),
            Self::StructFieldOutOfRange(field) => write!(
                f,
                "struct access can only use field {STRUCT_FIELD_MIN} or {STRUCT_FIELD_MAX}, got {field}"
            ),
            Self::InvalidImmediate(text) => {
                write!(f, "invalid number '{text}' for immediate value")
            }
            Self::InvalidStructField(text) => {
                write!(f, "invalid struct field index '{text}'")
            }
        }
    }
}

impl std::error::Error for CommandError {}

/// Decodes one command statement into its compiled words.
///
/// `ic` is the running instruction counter; each emitted word consumes one
/// slot in emission order: the instruction word, then source operand word(s),
/// then destination operand word(s). When both operands are registers they
/// share a single combined word.
///
/// # Errors
///
/// Returns a [`CommandError`] for unknown mnemonics, malformed or excess
/// operands, operand types the opcode does not admit, and out-of-range
/// immediate values or struct field indices. The counter is untouched on
/// error.
pub fn decode_command_line(
    statement: &str,
    ic: &mut u16,
    line: usize,
) -> Result<Vec<CompiledWord>, CommandError> {
    let (command, operand_text) = split_statement(statement);

    let opcode = Opcode::from_mnemonic(command).ok_or(CommandError {
        kind: CommandErrorKind::UnknownMnemonic(command.to_string()),
        line,
    })?;

    let mut operands = classify_operands(operand_text, line)?;

    let (src, dst) = match operands.len() {
        0 => (None, None),
        // A one-operand command's operand is the destination.
        1 => (None, operands.pop()),
        _ => {
            let dst = operands.pop();
            (operands.pop(), dst)
        }
    };

    check_legality(opcode, src.as_ref(), dst.as_ref(), line)?;

    Ok(emit(opcode, src.as_ref(), dst.as_ref(), ic, line))
}

/// Splits a normalized statement into the command token and its operand text.
fn split_statement(statement: &str) -> (&str, &str) {
    let trimmed = statement.trim();
    trimmed
        .split_once(' ')
        .map_or((trimmed, ""), |(command, rest)| (command, rest))
}

fn classify_operands(operand_text: &str, line: usize) -> Result<Vec<Operand>, CommandError> {
    if operand_text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let tokens: Vec<&str> = operand_text.split(',').collect();
    if tokens.len() > 2 {
        return Err(CommandError {
            kind: CommandErrorKind::TooManyOperands,
            line,
        });
    }
    tokens
        .into_iter()
        .map(|token| classify_operand(token, line))
        .collect()
}

/// Types one operand string by its leading-character/shape rules alone.
///
/// `r` followed by anything that does not read as a register number 0–7
/// falls through, so `r8` or `rx` classify as labels and surface as unknown
/// labels downstream.
fn classify_operand(token: &str, line: usize) -> Result<Operand, CommandError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(CommandError {
            kind: CommandErrorKind::EmptyOperand,
            line,
        });
    }

    if let Some(body) = token.strip_prefix('#') {
        return parse_strict_int(body)
            .map(Operand::Immediate)
            .ok_or(CommandError {
                kind: CommandErrorKind::InvalidImmediate(body.to_string()),
                line,
            });
    }

    if let Some(body) = token.strip_prefix('r') {
        if let Some(register) = parse_strict_int(body).and_then(Register::new) {
            return Ok(Operand::Register(register));
        }
    }

    if let Some((label, field_text)) = token.split_once('.') {
        let field = parse_strict_int(field_text).ok_or(CommandError {
            kind: CommandErrorKind::InvalidStructField(field_text.to_string()),
            line,
        })?;
        return Ok(Operand::StructField {
            label: label.to_string(),
            field,
        });
    }

    Ok(Operand::Label(token.to_string()))
}

fn check_legality(
    opcode: Opcode,
    src: Option<&Operand>,
    dst: Option<&Operand>,
    line: usize,
) -> Result<(), CommandError> {
    let mnemonic = opcode.mnemonic();

    if let Some(operand) = src {
        if !source_kind_is_legal(opcode, operand.kind()) {
            return Err(CommandError {
                kind: CommandErrorKind::IllegalSourceOperand {
                    kind: operand.kind(),
                    mnemonic,
                },
                line,
            });
        }
        check_value_bounds(operand, line)?;
    }

    if let Some(operand) = dst {
        if !destination_kind_is_legal(opcode, operand.kind()) {
            return Err(CommandError {
                kind: CommandErrorKind::IllegalDestinationOperand {
                    kind: operand.kind(),
                    mnemonic,
                },
                line,
            });
        }
        check_value_bounds(operand, line)?;
    }

    let found = u8::from(src.is_some()) + u8::from(dst.is_some());
    let expected = opcode.operand_count();
    if found != expected {
        return Err(CommandError {
            kind: CommandErrorKind::WrongOperandCount {
                mnemonic,
                expected,
                found,
            },
            line,
        });
    }

    Ok(())
}

fn check_value_bounds(operand: &Operand, line: usize) -> Result<(), CommandError> {
    match *operand {
        Operand::Immediate(value) if !(IMMEDIATE_MIN..=IMMEDIATE_MAX).contains(&value) => {
            Err(CommandError {
                kind: CommandErrorKind::ImmediateOutOfRange(value),
                line,
            })
        }
        Operand::StructField { field, .. }
            if !(STRUCT_FIELD_MIN..=STRUCT_FIELD_MAX).contains(&field) =>
        {
            Err(CommandError {
                kind: CommandErrorKind::StructFieldOutOfRange(field),
                line,
            })
        }
        _ => Ok(()),
    }
}

fn emit(
    opcode: Opcode,
    src: Option<&Operand>,
    dst: Option<&Operand>,
    ic: &mut u16,
    line: usize,
) -> Vec<CompiledWord> {
    let mut words = Vec::with_capacity(5);
    let mut push = |words: &mut Vec<CompiledWord>, cell: Cell| {
        words.push(CompiledWord { address: *ic, cell });
        *ic = ic.saturating_add(1);
    };

    let first = Word::instruction(
        opcode,
        src.map(Operand::kind),
        dst.map(Operand::kind),
        Are::Absolute,
    );
    push(&mut words, Cell::Resolved(first));

    // Two register operands share one combined word; every other combination
    // contributes its word(s) independently, source before destination.
    if let (Some(Operand::Register(a)), Some(Operand::Register(b))) = (src, dst) {
        push(&mut words, Cell::Resolved(Word::register_pair(a.0, b.0)));
        return words;
    }

    if let Some(operand) = src {
        emit_operand(operand, true, line, &mut |cell| push(&mut words, cell));
    }
    if let Some(operand) = dst {
        emit_operand(operand, false, line, &mut |cell| push(&mut words, cell));
    }

    words
}

fn emit_operand(operand: &Operand, is_source: bool, line: usize, push: &mut dyn FnMut(Cell)) {
    match operand {
        Operand::Immediate(value) => {
            // Bounds were checked: [-127, 127] always fits the payload.
            if let Ok(word) = Word::operand(*value, Are::Absolute) {
                push(Cell::Resolved(word));
            }
        }
        Operand::Register(register) => {
            let word = if is_source {
                Word::register_pair(register.0, 0)
            } else {
                Word::register_pair(0, register.0)
            };
            push(Cell::Resolved(word));
        }
        Operand::Label(name) => push(Cell::Unresolved {
            label: name.clone(),
            source_line: line,
        }),
        Operand::StructField { label, field } => {
            push(Cell::Unresolved {
                label: label.clone(),
                source_line: line,
            });
            if let Ok(word) = Word::operand(*field, Are::Absolute) {
                push(Cell::Resolved(word));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use decet_core::{Are, Word, LOAD_ADDRESS};

    use super::{decode_command_line, CommandErrorKind, CompiledWord};
    use crate::image::Cell;

    fn decode(statement: &str) -> (Vec<CompiledWord>, u16) {
        let mut ic = LOAD_ADDRESS;
        let words = decode_command_line(statement, &mut ic, 1).unwrap();
        (words, ic)
    }

    fn decode_err(statement: &str) -> CommandErrorKind {
        let mut ic = LOAD_ADDRESS;
        decode_command_line(statement, &mut ic, 1).unwrap_err().kind
    }

    #[test]
    fn mov_register_pair_shares_one_word() {
        let (words, ic) = decode("mov r1,r2");
        assert_eq!(ic, 102);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].address, 100);
        assert_eq!(
            words[0].cell,
            Cell::Resolved(Word::instruction(
                decet_core::Opcode::Mov,
                Some(decet_core::OperandKind::Register),
                Some(decet_core::OperandKind::Register),
                Are::Absolute,
            ))
        );
        assert_eq!(words[1].address, 101);
        assert_eq!(words[1].cell, Cell::Resolved(Word::register_pair(1, 2)));
    }

    #[test]
    fn immediate_source_gets_its_own_word() {
        let (words, ic) = decode("add #-3,r6");
        assert_eq!(ic, 103);
        assert_eq!(words.len(), 3);
        assert_eq!(
            words[1].cell,
            Cell::Resolved(Word::operand(-3, Are::Absolute).unwrap())
        );
        assert_eq!(words[2].cell, Cell::Resolved(Word::register_pair(0, 6)));
    }

    #[test]
    fn label_operand_defers_resolution() {
        let (words, _) = decode("jmp LOOP");
        assert_eq!(words.len(), 2);
        assert_eq!(
            words[1].cell,
            Cell::Unresolved {
                label: "LOOP".to_string(),
                source_line: 1,
            }
        );
    }

    #[test]
    fn struct_operand_emits_label_then_field_index() {
        let (words, ic) = decode("mov S.2,r0");
        assert_eq!(ic, 104);
        assert_eq!(words.len(), 4);
        assert_eq!(
            words[1].cell,
            Cell::Unresolved {
                label: "S".to_string(),
                source_line: 1,
            }
        );
        assert_eq!(
            words[2].cell,
            Cell::Resolved(Word::operand(2, Are::Absolute).unwrap())
        );
        assert_eq!(words[3].cell, Cell::Resolved(Word::register_pair(0, 0)));
    }

    #[test]
    fn one_operand_command_uses_destination_slot() {
        let (words, _) = decode("inc r3");
        assert_eq!(words.len(), 2);
        let Cell::Resolved(first) = &words[0].cell else {
            panic!("expected resolved instruction word");
        };
        assert_eq!(first.source_kind_bits(), 0);
        assert_eq!(first.destination_kind_bits(), 0b11);
        assert_eq!(words[1].cell, Cell::Resolved(Word::register_pair(0, 3)));
    }

    #[test]
    fn zero_operand_command_is_one_word() {
        let (words, ic) = decode("rts");
        assert_eq!(words.len(), 1);
        assert_eq!(ic, 101);
    }

    #[test]
    fn unknown_mnemonic() {
        assert_eq!(
            decode_err("bogus r1"),
            CommandErrorKind::UnknownMnemonic("bogus".to_string())
        );
        // Mnemonic matching is exact: uppercase is not a command.
        assert_eq!(
            decode_err("MOV r1,r2"),
            CommandErrorKind::UnknownMnemonic("MOV".to_string())
        );
    }

    #[test]
    fn operand_count_mismatch() {
        assert_eq!(
            decode_err("mov r1"),
            CommandErrorKind::WrongOperandCount {
                mnemonic: "mov",
                expected: 2,
                found: 1,
            }
        );
        assert_eq!(
            decode_err("hlt r1"),
            CommandErrorKind::IllegalDestinationOperand {
                kind: decet_core::OperandKind::Register,
                mnemonic: "hlt",
            }
        );
    }

    #[test]
    fn too_many_operands() {
        assert_eq!(decode_err("mov r1,r2,r3"), CommandErrorKind::TooManyOperands);
    }

    #[test]
    fn stray_comma_is_rejected() {
        assert_eq!(decode_err("mov ,r1"), CommandErrorKind::EmptyOperand);
        assert_eq!(decode_err("mov r1,"), CommandErrorKind::EmptyOperand);
    }

    #[test]
    fn illegal_operand_types() {
        assert_eq!(
            decode_err("lea #5,r1"),
            CommandErrorKind::IllegalSourceOperand {
                kind: decet_core::OperandKind::Immediate,
                mnemonic: "lea",
            }
        );
        assert_eq!(
            decode_err("mov r1,#5"),
            CommandErrorKind::IllegalDestinationOperand {
                kind: decet_core::OperandKind::Immediate,
                mnemonic: "mov",
            }
        );
    }

    #[test]
    fn immediate_bounds() {
        assert_eq!(
            decode_err("mov #128,r1"),
            CommandErrorKind::ImmediateOutOfRange(128)
        );
        assert_eq!(
            decode_err("mov #-128,r1"),
            CommandErrorKind::ImmediateOutOfRange(-128)
        );
        let (_, ic) = decode("mov #127,r1");
        assert_eq!(ic, 103);
    }

    #[test]
    fn struct_field_bounds() {
        assert_eq!(
            decode_err("mov S.3,r1"),
            CommandErrorKind::StructFieldOutOfRange(3)
        );
        assert_eq!(
            decode_err("mov S.x,r1"),
            CommandErrorKind::InvalidStructField("x".to_string())
        );
    }

    #[test]
    fn malformed_immediate() {
        assert_eq!(
            decode_err("mov #1x,r1"),
            CommandErrorKind::InvalidImmediate("1x".to_string())
        );
    }

    #[test]
    fn register_like_tokens_fall_through_to_labels() {
        let (words, _) = decode("jmp r8");
        assert_eq!(
            words[1].cell,
            Cell::Unresolved {
                label: "r8".to_string(),
                source_line: 1,
            }
        );
    }

    #[test]
    fn counter_is_untouched_on_error() {
        let mut ic = LOAD_ADDRESS;
        assert!(decode_command_line("mov #999,r1", &mut ic, 4).is_err());
        assert_eq!(ic, LOAD_ADDRESS);
    }
}
