//! Source line model and whitespace normalization.
//!
//! Statements are line oriented: one statement per line, optional leading
//! `label:`, comment lines starting with `;`. Before any classification the
//! driver normalizes each line with [`normalize`], which reproduces the fixed
//! trimming contract every later stage relies on:
//!
//! - leading and trailing whitespace is removed,
//! - interior whitespace runs collapse to a single space,
//! - whitespace inside a double-quoted region is preserved (tabs become
//!   spaces, runs keep their length),
//! - a whitespace run immediately before `:` is dropped entirely, so
//!   `MAIN :` reads as the label `MAIN:`.

/// Longest accepted source line, in characters.
pub const MAX_LINE_LEN: usize = 80;

/// A line of source with its 1-indexed position in the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// The source text (without trailing newline).
    pub text: String,
    /// 1-indexed line number.
    pub original_line: usize,
}

/// Splits file content into numbered source lines.
#[must_use]
pub fn split_source_lines(content: &str) -> Vec<SourceLine> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| SourceLine {
            text: line.to_string(),
            original_line: idx + 1,
        })
        .collect()
}

/// Normalizes the whitespace of one source line (see the module contract).
#[must_use]
pub fn normalize(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_quotes = false;
    let mut pending_space = false;

    for c in line.chars() {
        if c == '"' {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            in_quotes = !in_quotes;
            out.push(c);
        } else if in_quotes {
            out.push(if c.is_whitespace() { ' ' } else { c });
        } else if c.is_whitespace() {
            // Leading whitespace never produces a separator.
            if !out.is_empty() {
                pending_space = true;
            }
        } else {
            if pending_space {
                if c != ':' {
                    out.push(' ');
                }
                pending_space = false;
            }
            out.push(c);
        }
    }

    out
}

/// Parses a strict signed decimal integer: optional sign, then digits only.
///
/// This is the single numeric grammar shared by immediates, `.data` items,
/// and struct field indices. Anything else (hex, stray characters, empty
/// bodies, values outside `i16`) is rejected.
#[must_use]
pub fn parse_strict_int(text: &str) -> Option<i16> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix(['+', '-'])
        .unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<i16>().ok()
}

#[cfg(test)]
mod tests {
    use super::{normalize, parse_strict_int, split_source_lines};

    #[test]
    fn split_assigns_one_indexed_line_numbers() {
        let lines = split_source_lines("a\nb\n\nc");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].text, "a");
        assert_eq!(lines[0].original_line, 1);
        assert_eq!(lines[3].text, "c");
        assert_eq!(lines[3].original_line, 4);
    }

    #[test]
    fn normalize_trims_and_collapses() {
        assert_eq!(normalize("  mov   r1 ,\tr2  "), "mov r1 , r2");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \t "), "");
    }

    #[test]
    fn normalize_preserves_quoted_whitespace() {
        assert_eq!(
            normalize(".string  \"a  b\t\""),
            ".string \"a  b \""
        );
    }

    #[test]
    fn normalize_drops_space_before_colon() {
        assert_eq!(normalize("MAIN : mov r1,r2"), "MAIN: mov r1,r2");
        assert_eq!(normalize("MAIN  :  mov"), "MAIN: mov");
    }

    #[test]
    fn strict_int_accepts_signed_decimal() {
        assert_eq!(parse_strict_int("42"), Some(42));
        assert_eq!(parse_strict_int("-3"), Some(-3));
        assert_eq!(parse_strict_int("+7"), Some(7));
        assert_eq!(parse_strict_int(" 12 "), Some(12));
        assert_eq!(parse_strict_int("0"), Some(0));
    }

    #[test]
    fn strict_int_rejects_everything_else() {
        assert_eq!(parse_strict_int(""), None);
        assert_eq!(parse_strict_int("-"), None);
        assert_eq!(parse_strict_int("1x"), None);
        assert_eq!(parse_strict_int("0x10"), None);
        assert_eq!(parse_strict_int("1 2"), None);
        assert_eq!(parse_strict_int("99999"), None);
    }
}
