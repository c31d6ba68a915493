//! Symbol table and lifecycle transitions.
//!
//! A name maps to at most one live symbol. Two forward-reference transitions
//! are allowed in place: a `.entry` seen before the label's definition parks
//! the symbol as [`SymbolKind::EntryAwaitingAddress`] until the definition
//! arrives, and a `.entry` after a regular definition upgrades the symbol
//! without touching its address. Every other collision is a definition error.
//!
//! The table preserves insertion order; entry-file output follows it.

use std::collections::HashMap;

/// External status of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A label defined in this file, not exported.
    Regular,
    /// Declared with `.extern`; the address is supplied at link time.
    External,
    /// Defined in this file and exported via `.entry`.
    Entry,
    /// `.entry` seen before the label's own definition.
    EntryAwaitingAddress,
}

/// Which memory region a symbol's address falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// The instruction region, loaded at the load base.
    Command,
    /// The data region, relocated past the command segment after pass 1.
    Data,
}

/// One declared label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// The label name.
    pub name: String,
    /// Assigned address; meaningful once the symbol is defined.
    pub address: u16,
    /// External status.
    pub kind: SymbolKind,
    /// Memory region of the address.
    pub segment: Segment,
    /// Source line of the definition (or of the declaration, while the
    /// symbol awaits its definition).
    pub defined_at: usize,
}

/// Symbol error with its source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolError {
    /// Kind of error.
    pub kind: SymbolErrorKind,
    /// 1-indexed source line.
    pub line: usize,
}

/// Classification of symbol errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolErrorKind {
    /// Name collision outside the two allowed transitions.
    PreviouslyDefined {
        /// The label name.
        name: String,
        /// Line of the earlier definition or declaration.
        first_definition: usize,
    },
    /// `.entry` declared but the label was never defined.
    EntryNeverDefined {
        /// The label name.
        name: String,
    },
}

impl std::fmt::Display for SymbolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::fmt::Display for SymbolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreviouslyDefined {
                name,
                first_definition,
            } => write!(
                f,
                "'{name}' was previously defined (line {first_definition})"
            ),
            Self::EntryNeverDefined { name } => {
                write!(f, "label '{name}' is declared as entry but never defined")
            }
        }
    }
}

impl std::error::Error for SymbolError {}

/// Insertion-ordered mapping from label name to symbol.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    index: HashMap<String, usize>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sighting of `name`: a label definition (`Regular`), a
    /// `.entry` declaration (`Entry`), or a `.extern` declaration
    /// (`External`).
    ///
    /// A `.entry` for an unseen name is parked as `EntryAwaitingAddress`;
    /// the allowed transitions complete or upgrade an existing symbol in
    /// place.
    ///
    /// # Errors
    ///
    /// Returns [`SymbolErrorKind::PreviouslyDefined`] for any other
    /// collision, leaving the existing symbol untouched.
    pub fn store(
        &mut self,
        name: &str,
        address: u16,
        kind: SymbolKind,
        segment: Segment,
        line: usize,
    ) -> Result<(), SymbolError> {
        if let Some(&slot) = self.index.get(name) {
            let existing = &mut self.symbols[slot];
            return match (existing.kind, kind) {
                (SymbolKind::EntryAwaitingAddress, SymbolKind::Regular) => {
                    existing.kind = SymbolKind::Entry;
                    existing.address = address;
                    existing.segment = segment;
                    existing.defined_at = line;
                    Ok(())
                }
                (SymbolKind::Regular, SymbolKind::Entry) => {
                    existing.kind = SymbolKind::Entry;
                    Ok(())
                }
                _ => Err(SymbolError {
                    kind: SymbolErrorKind::PreviouslyDefined {
                        name: name.to_string(),
                        first_definition: existing.defined_at,
                    },
                    line,
                }),
            };
        }

        let kind = if kind == SymbolKind::Entry {
            SymbolKind::EntryAwaitingAddress
        } else {
            kind
        };
        self.index.insert(name.to_string(), self.symbols.len());
        self.symbols.push(Symbol {
            name: name.to_string(),
            address,
            kind,
            segment,
            defined_at: line,
        });
        Ok(())
    }

    /// Exact-match lookup.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&slot| &self.symbols[slot])
    }

    /// Post-pass-1 fixup: offsets every data-segment symbol past the command
    /// segment and verifies no `.entry` declaration is left undefined.
    ///
    /// # Errors
    ///
    /// Returns [`SymbolErrorKind::EntryNeverDefined`] (with the declaring
    /// line) for the first symbol still awaiting its definition.
    pub fn fixup(&mut self, final_ic: u16) -> Result<(), SymbolError> {
        for symbol in &mut self.symbols {
            if symbol.segment == Segment::Data {
                symbol.address = symbol.address.saturating_add(final_ic);
            }
            if symbol.kind == SymbolKind::EntryAwaitingAddress {
                return Err(SymbolError {
                    kind: SymbolErrorKind::EntryNeverDefined {
                        name: symbol.name.clone(),
                    },
                    line: symbol.defined_at,
                });
            }
        }
        Ok(())
    }

    /// Entry symbols, in table (insertion) order.
    pub fn entries(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.symbols
            .iter()
            .filter(|symbol| symbol.kind == SymbolKind::Entry)
    }

    /// Number of live symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
