//! Top-level two-pass assembler pipeline.
//!
//! The driver walks the states `Pass1 -> Fixup -> Pass2 -> Done`:
//!
//! 1. **Pass 1** scans the macro-expanded source, registers labels, decodes
//!    command statements into the memory image, and collects the data array.
//!    Line-level errors are recorded and the scan continues.
//! 2. **Fixup** relocates data-segment symbols past the command segment,
//!    checks that every `.entry` declaration was defined, and checks that
//!    the whole image fits target memory.
//! 3. **Pass 2** resolves the deferred label references against the symbol
//!    table and serializes the object, entry, and extern streams.
//!
//! A single error anywhere fails the run: the result then carries every
//! collected diagnostic and no artifacts.

use decet_core::{Are, Word, WordRangeError, LOAD_ADDRESS, MEMORY_WORDS};

use crate::command::{decode_command_line, CommandErrorKind};
use crate::data::{store_data, store_string, store_struct, DataErrorKind};
use crate::image::{Cell, MemoryImage};
use crate::output::{object_header, object_line, symbol_line};
use crate::parser::{classify, is_valid_label, split_label, StatementKind};
use crate::source::{normalize, split_source_lines, SourceLine, MAX_LINE_LEN};
use crate::symbols::{Segment, SymbolErrorKind, SymbolKind, SymbolTable};

/// Assembly error with its source line where one is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleError {
    /// Kind of error.
    pub kind: AssembleErrorKind,
    /// 1-indexed line in the expanded source, when attributable.
    pub line: Option<usize>,
}

/// Classification of assembly errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembleErrorKind {
    /// Source line over the accepted length.
    LineTooLong {
        /// The offending length in characters.
        length: usize,
    },
    /// Malformed or reserved label name.
    InvalidLabel(String),
    /// Command decoding failed.
    Command(CommandErrorKind),
    /// Data directive parsing failed.
    Data(DataErrorKind),
    /// Symbol definition or fixup failed.
    Symbol(SymbolErrorKind),
    /// A compiled word landed outside target memory.
    MemoryOverflow {
        /// The offending address.
        address: u16,
    },
    /// Command and data segments together exceed target memory.
    ImageTooLarge {
        /// Total words the image would need.
        total_words: usize,
    },
    /// Pass 2 found no definition for a referenced label.
    UnknownLabel(String),
    /// A resolved value did not fit its word field.
    WordRange(WordRangeError),
    /// No word was assembled at an address inside the command segment.
    MissingImageWord {
        /// The empty address.
        address: u16,
    },
}

impl std::fmt::Display for AssembleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::fmt::Display for AssembleErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LineTooLong { length } => {
                write!(f, "line is {length} characters, over the {MAX_LINE_LEN} limit")
            }
            Self::InvalidLabel(name) => write!(f, "'{name}' is not a valid label name"),
            Self::Command(kind) => write!(f, "{kind}"),
            Self::Data(kind) => write!(f, "{kind}"),
            Self::Symbol(kind) => write!(f, "{kind}"),
            Self::MemoryOverflow { address } => {
                write!(f, "address {address} exceeds the {MEMORY_WORDS}-word memory")
            }
            Self::ImageTooLarge { total_words } => write!(
                f,
                "command and data segments total {total_words} words, over the {MEMORY_WORDS}-word memory"
            ),
            Self::UnknownLabel(name) => write!(f, "unknown label '{name}'"),
            Self::WordRange(e) => write!(f, "{e}"),
            Self::MissingImageWord { address } => {
                write!(f, "no word was assembled at address {address}")
            }
        }
    }
}

impl std::error::Error for AssembleError {}

/// A non-fatal diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleWarning {
    /// Kind of warning.
    pub kind: AssembleWarningKind,
    /// 1-indexed line in the expanded source.
    pub line: usize,
}

/// Classification of assembly warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembleWarningKind {
    /// A label before `.entry`/`.extern` is ignored.
    IgnoredLabel {
        /// The ignored label.
        label: String,
        /// The directive it preceded.
        directive: &'static str,
    },
}

impl std::fmt::Display for AssembleWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            AssembleWarningKind::IgnoredLabel { label, directive } => {
                write!(f, "ignored label '{label}' before {directive} statement")
            }
        }
    }
}

/// The three output streams of a successful run.
///
/// Entry and extern streams are `None` when they would be empty, so no empty
/// file is ever produced from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    /// Object image stream.
    pub object: String,
    /// Entry symbol stream, if any `.entry` symbol exists.
    pub entries: Option<String>,
    /// Extern usage stream, one line per reference site, if any.
    pub externals: Option<String>,
    /// Warnings collected along the way.
    pub warnings: Vec<AssembleWarning>,
}

/// Every diagnostic of a failed run. No artifacts are retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleFailure {
    /// All collected errors, in source order.
    pub errors: Vec<AssembleError>,
    /// Warnings collected before the failure.
    pub warnings: Vec<AssembleWarning>,
}

impl std::fmt::Display for AssembleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "assembly failed with {} error(s)", self.errors.len())
    }
}

impl std::error::Error for AssembleFailure {}

/// Assembles an already macro-expanded source text.
///
/// # Errors
///
/// Returns an [`AssembleFailure`] carrying every collected diagnostic when
/// any line or resolution fails.
pub fn assemble_source(source: &str) -> Result<Artifacts, AssembleFailure> {
    assemble_lines(&split_source_lines(source))
}

/// Assembles a flat sequence of already macro-expanded source lines.
///
/// # Errors
///
/// Returns an [`AssembleFailure`] carrying every collected diagnostic when
/// any line or resolution fails.
pub fn assemble_lines(lines: &[SourceLine]) -> Result<Artifacts, AssembleFailure> {
    let mut pass = FirstPass::new();
    pass.run(lines);

    let FirstPass {
        image,
        data,
        mut symbols,
        ic,
        mut errors,
        warnings,
    } = pass;

    if !errors.is_empty() {
        return Err(AssembleFailure { errors, warnings });
    }

    if let Err(e) = symbols.fixup(ic) {
        errors.push(AssembleError {
            kind: AssembleErrorKind::Symbol(e.kind),
            line: Some(e.line),
        });
    }
    let total_words = usize::from(ic) + data.len();
    if total_words > MEMORY_WORDS {
        errors.push(AssembleError {
            kind: AssembleErrorKind::ImageTooLarge { total_words },
            line: None,
        });
    }
    if !errors.is_empty() {
        return Err(AssembleFailure { errors, warnings });
    }

    second_pass(&image, ic, &data, &symbols, warnings)
}

/// Pass-1 state: the image, data array, and symbol table under construction.
struct FirstPass {
    image: MemoryImage,
    data: Vec<i16>,
    symbols: SymbolTable,
    ic: u16,
    errors: Vec<AssembleError>,
    warnings: Vec<AssembleWarning>,
}

impl FirstPass {
    fn new() -> Self {
        Self {
            image: MemoryImage::new(),
            data: Vec::new(),
            symbols: SymbolTable::new(),
            ic: LOAD_ADDRESS,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn run(&mut self, lines: &[SourceLine]) {
        for line in lines {
            self.scan_line(line);
        }
    }

    fn scan_line(&mut self, line: &SourceLine) {
        let number = line.original_line;

        let length = line.text.chars().count();
        if length > MAX_LINE_LEN {
            self.push_error(AssembleErrorKind::LineTooLong { length }, number);
            return;
        }

        let text = normalize(&line.text);
        if text.is_empty() || text.starts_with(';') {
            return;
        }

        let (label, statement) =
            split_label(&text).map_or((None, text.as_str()), |(name, rest)| (Some(name), rest));

        if let Some(name) = label {
            if !is_valid_label(name) {
                self.push_error(AssembleErrorKind::InvalidLabel(name.to_string()), number);
                return;
            }
        }

        match classify(statement) {
            StatementKind::Entry => {
                self.symbol_directive(label, statement, SymbolKind::Entry, ".entry", number);
            }
            StatementKind::Extern => {
                self.symbol_directive(label, statement, SymbolKind::External, ".extern", number);
            }
            StatementKind::Empty => {
                if let Some(name) = label {
                    self.define_label(name, self.ic, Segment::Command, number);
                }
            }
            StatementKind::Command => self.command_statement(label, statement, number),
            kind @ (StatementKind::Data | StatementKind::String | StatementKind::Struct) => {
                self.data_statement(kind, label, statement, number);
            }
        }
    }

    fn push_error(&mut self, kind: AssembleErrorKind, line: usize) {
        self.errors.push(AssembleError {
            kind,
            line: Some(line),
        });
    }

    fn define_label(&mut self, name: &str, address: u16, segment: Segment, line: usize) {
        if let Err(e) = self
            .symbols
            .store(name, address, SymbolKind::Regular, segment, line)
        {
            self.push_error(AssembleErrorKind::Symbol(e.kind), e.line);
        }
    }

    fn symbol_directive(
        &mut self,
        label: Option<&str>,
        statement: &str,
        kind: SymbolKind,
        directive: &'static str,
        line: usize,
    ) {
        if let Some(name) = label {
            self.warnings.push(AssembleWarning {
                kind: AssembleWarningKind::IgnoredLabel {
                    label: name.to_string(),
                    directive,
                },
                line,
            });
        }

        let name = directive_body(statement);
        if !is_valid_label(name) {
            self.push_error(AssembleErrorKind::InvalidLabel(name.to_string()), line);
            return;
        }
        if let Err(e) = self.symbols.store(name, 0, kind, Segment::Command, line) {
            self.push_error(AssembleErrorKind::Symbol(e.kind), e.line);
        }
    }

    fn command_statement(&mut self, label: Option<&str>, statement: &str, line: usize) {
        if let Some(name) = label {
            self.define_label(name, self.ic, Segment::Command, line);
        }
        match decode_command_line(statement, &mut self.ic, line) {
            Ok(words) => {
                for word in words {
                    if let Err(overflow) = self.image.store(word.address, word.cell) {
                        self.push_error(
                            AssembleErrorKind::MemoryOverflow {
                                address: overflow.address,
                            },
                            line,
                        );
                    }
                }
            }
            Err(e) => self.push_error(AssembleErrorKind::Command(e.kind), e.line),
        }
    }

    fn data_statement(
        &mut self,
        kind: StatementKind,
        label: Option<&str>,
        statement: &str,
        line: usize,
    ) {
        if let Some(name) = label {
            let dc = u16::try_from(self.data.len()).unwrap_or(u16::MAX);
            self.define_label(name, dc, Segment::Data, line);
        }

        let body = directive_body(statement);
        let result = match kind {
            StatementKind::String => store_string(body, &mut self.data, line),
            StatementKind::Struct => store_struct(body, &mut self.data, line),
            _ => store_data(body, &mut self.data, line),
        };
        if let Err(e) = result {
            self.push_error(AssembleErrorKind::Data(e.kind), e.line);
        }
    }
}

/// The statement with its directive token removed.
fn directive_body(statement: &str) -> &str {
    statement
        .trim()
        .split_once(' ')
        .map_or("", |(_, rest)| rest)
}

fn second_pass(
    image: &MemoryImage,
    ic: u16,
    data: &[i16],
    symbols: &SymbolTable,
    warnings: Vec<AssembleWarning>,
) -> Result<Artifacts, AssembleFailure> {
    let mut errors = Vec::new();
    let mut extern_usages: Vec<(String, u16)> = Vec::new();
    let mut object = String::new();

    let instruction_words = ic - LOAD_ADDRESS;
    let data_words = u16::try_from(data.len()).unwrap_or(u16::MAX);
    object.push_str(&object_header(instruction_words, data_words));
    object.push('\n');

    for address in LOAD_ADDRESS..ic {
        let word = match image.get(address) {
            Some(Cell::Resolved(word)) => Some(*word),
            Some(Cell::Unresolved { label, source_line }) => resolve_label(
                symbols,
                label,
                *source_line,
                address,
                &mut extern_usages,
                &mut errors,
            ),
            None => {
                errors.push(AssembleError {
                    kind: AssembleErrorKind::MissingImageWord { address },
                    line: None,
                });
                None
            }
        };
        if let Some(word) = word {
            object.push_str(&object_line(address, word));
            object.push('\n');
        }
    }

    for (offset, value) in data.iter().enumerate() {
        let address = ic.saturating_add(u16::try_from(offset).unwrap_or(u16::MAX));
        match Word::data(*value) {
            Ok(word) => {
                object.push_str(&object_line(address, word));
                object.push('\n');
            }
            Err(e) => errors.push(AssembleError {
                kind: AssembleErrorKind::WordRange(e),
                line: None,
            }),
        }
    }

    if !errors.is_empty() {
        return Err(AssembleFailure { errors, warnings });
    }

    let entries: Vec<String> = symbols
        .entries()
        .map(|symbol| symbol_line(&symbol.name, symbol.address))
        .collect();
    let externals: Vec<String> = extern_usages
        .iter()
        .map(|(name, address)| symbol_line(name, *address))
        .collect();

    Ok(Artifacts {
        object,
        entries: join_lines(&entries),
        externals: join_lines(&externals),
        warnings,
    })
}

fn join_lines(lines: &[String]) -> Option<String> {
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n") + "\n")
    }
}

fn resolve_label(
    symbols: &SymbolTable,
    label: &str,
    source_line: usize,
    address: u16,
    extern_usages: &mut Vec<(String, u16)>,
    errors: &mut Vec<AssembleError>,
) -> Option<Word> {
    let Some(symbol) = symbols.find(label) else {
        errors.push(AssembleError {
            kind: AssembleErrorKind::UnknownLabel(label.to_string()),
            line: Some(source_line),
        });
        return None;
    };

    let (value, are) = if symbol.kind == SymbolKind::External {
        extern_usages.push((symbol.name.clone(), address));
        (0, Are::External)
    } else {
        (
            i16::try_from(symbol.address).unwrap_or(i16::MAX),
            Are::Relocatable,
        )
    };

    match Word::operand(value, are) {
        Ok(word) => Some(word),
        Err(e) => {
            errors.push(AssembleError {
                kind: AssembleErrorKind::WordRange(e),
                line: Some(source_line),
            });
            None
        }
    }
}
