//! Statement classification and label handling.
//!
//! A normalized line with its label removed is one of six statement kinds,
//! decided purely by the first whitespace-delimited token. Unrecognized
//! leading tokens classify as [`StatementKind::Command`] and are rejected
//! later by the command decoder if illegal — classification itself cannot
//! fail.

use decet_core::isa::is_reserved_word;

/// Longest accepted label name, in characters.
pub const MAX_LABEL_LEN: usize = 31;

/// The head token is compared after truncation to this many characters.
const MAX_HEAD_TOKEN_LEN: usize = 8;

/// The six statement kinds a label-stripped line can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Nothing after the (optional) label.
    Empty,
    /// A machine instruction.
    Command,
    /// `.data` directive.
    Data,
    /// `.string` directive.
    String,
    /// `.struct` directive.
    Struct,
    /// `.entry` directive.
    Entry,
    /// `.extern` directive.
    Extern,
}

/// Classifies a normalized, label-stripped statement.
#[must_use]
pub fn classify(statement: &str) -> StatementKind {
    let trimmed = statement.trim();
    if trimmed.is_empty() {
        return StatementKind::Empty;
    }

    let head: String = trimmed
        .split_whitespace()
        .next()
        .unwrap_or("")
        .chars()
        .take(MAX_HEAD_TOKEN_LEN)
        .collect();

    match head.as_str() {
        ".entry" => StatementKind::Entry,
        ".extern" => StatementKind::Extern,
        ".data" => StatementKind::Data,
        ".string" => StatementKind::String,
        ".struct" => StatementKind::Struct,
        _ => StatementKind::Command,
    }
}

/// Splits a leading `label:` off a normalized line.
///
/// A label candidate runs from the start of the line to the first `:`; the
/// scan gives up at the first whitespace or `.` so that a `:` later in the
/// statement (inside a quoted string, or after a directive) is never taken
/// for a label separator. Returns the label and the remainder after the `:`,
/// or `None` when the line carries no label.
#[must_use]
pub fn split_label(line: &str) -> Option<(&str, &str)> {
    for (idx, c) in line.char_indices() {
        match c {
            ':' => return Some((&line[..idx], &line[idx + 1..])),
            c if c.is_whitespace() || c == '.' => return None,
            _ => {}
        }
    }
    None
}

/// Whether `name` is usable as a label: a letter followed by letters and
/// digits, at most [`MAX_LABEL_LEN`] characters, and not a reserved word.
#[must_use]
pub fn is_valid_label(name: &str) -> bool {
    if name.is_empty() || name.chars().count() > MAX_LABEL_LEN || is_reserved_word(name) {
        return false;
    }
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric())
}
