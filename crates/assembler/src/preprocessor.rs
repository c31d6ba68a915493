//! Macro expansion producing the flat source stream (pass 0).
//!
//! The assembler core never sees a macro: this stage textually expands
//! `macro <name> … endmacro` definitions before assembly begins, exactly as
//! the expanded `.am` file records it. A definition is removed from the
//! output; a line whose first token names a macro is replaced by the macro
//! body. Macros do not nest and are not recursive.
//!
//! The expanded stream is renumbered sequentially, so every later diagnostic
//! refers to a line of the expanded file.

use crate::parser::is_valid_label;
use crate::source::SourceLine;

/// Macro expansion error with its source line (of the unexpanded stream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroError {
    /// Kind of error.
    pub kind: MacroErrorKind,
    /// 1-indexed line of the `macro` keyword.
    pub line: usize,
}

/// Classification of macro expansion errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroErrorKind {
    /// Name is missing, malformed, or collides with a reserved word.
    InvalidName(String),
    /// Name already defines a macro.
    DuplicateName(String),
    /// `endmacro` never arrived.
    Unterminated(String),
}

impl std::fmt::Display for MacroError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::fmt::Display for MacroErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "macro name '{name}' is not valid"),
            Self::DuplicateName(name) => write!(f, "macro '{name}' is already defined"),
            Self::Unterminated(name) => {
                write!(f, "macro '{name}' is missing its endmacro")
            }
        }
    }
}

impl std::error::Error for MacroError {}

struct Macro {
    name: String,
    body: Vec<String>,
}

/// Expands macro definitions and invocations into a flat, renumbered stream.
///
/// # Errors
///
/// Returns a [`MacroError`] for an invalid or duplicate macro name, or a
/// definition with no `endmacro`. Preprocessing errors are fatal for the
/// whole file.
pub fn expand_macros(lines: &[SourceLine]) -> Result<Vec<SourceLine>, MacroError> {
    let mut macros: Vec<Macro> = Vec::new();
    let mut expanded: Vec<String> = Vec::new();

    let mut iter = lines.iter();
    while let Some(line) = iter.next() {
        let first = first_token(&line.text);

        if first == Some("macro") {
            let name = second_token(&line.text).unwrap_or_default();
            validate_name(name, &macros, line.original_line)?;

            let mut body = Vec::new();
            loop {
                let Some(body_line) = iter.next() else {
                    return Err(MacroError {
                        kind: MacroErrorKind::Unterminated(name.to_string()),
                        line: line.original_line,
                    });
                };
                if first_token(&body_line.text) == Some("endmacro") {
                    break;
                }
                body.push(body_line.text.clone());
            }
            macros.push(Macro {
                name: name.to_string(),
                body,
            });
            continue;
        }

        match first.and_then(|token| macros.iter().find(|m| m.name == token)) {
            Some(found) => expanded.extend(found.body.iter().cloned()),
            None => expanded.push(line.text.clone()),
        }
    }

    Ok(expanded
        .into_iter()
        .enumerate()
        .map(|(idx, text)| SourceLine {
            text,
            original_line: idx + 1,
        })
        .collect())
}

fn first_token(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

fn second_token(text: &str) -> Option<&str> {
    text.split_whitespace().nth(1)
}

fn validate_name(name: &str, macros: &[Macro], line: usize) -> Result<(), MacroError> {
    // Macro names follow the label grammar, which already excludes reserved
    // words and directive names.
    if !is_valid_label(name) {
        return Err(MacroError {
            kind: MacroErrorKind::InvalidName(name.to_string()),
            line,
        });
    }
    if macros.iter().any(|m| m.name == name) {
        return Err(MacroError {
            kind: MacroErrorKind::DuplicateName(name.to_string()),
            line,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{expand_macros, MacroErrorKind};
    use crate::source::split_source_lines;

    fn expand(source: &str) -> Result<Vec<String>, MacroErrorKind> {
        let lines = split_source_lines(source);
        expand_macros(&lines)
            .map(|out| out.into_iter().map(|line| line.text).collect())
            .map_err(|e| e.kind)
    }

    #[test]
    fn source_without_macros_passes_through() {
        let out = expand("mov r1,r2\nhlt\n").unwrap();
        assert_eq!(out, vec!["mov r1,r2", "hlt"]);
    }

    #[test]
    fn definition_is_removed_and_invocation_replaced() {
        let out = expand(
            "macro setup\nmov r1,r2\nclr r3\nendmacro\nsetup\nhlt\n",
        )
        .unwrap();
        assert_eq!(out, vec!["mov r1,r2", "clr r3", "hlt"]);
    }

    #[test]
    fn expanded_stream_is_renumbered() {
        let lines = split_source_lines("macro m\nhlt\nendmacro\nm\n");
        let out = expand_macros(&lines).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "hlt");
        assert_eq!(out[0].original_line, 1);
    }

    #[test]
    fn macro_may_be_invoked_twice() {
        let out = expand("macro two\ninc r1\nendmacro\ntwo\ntwo\n").unwrap();
        assert_eq!(out, vec!["inc r1", "inc r1"]);
    }

    #[test]
    fn reserved_names_are_rejected() {
        assert_eq!(
            expand("macro mov\nendmacro\n").unwrap_err(),
            MacroErrorKind::InvalidName("mov".to_string())
        );
        assert_eq!(
            expand("macro r3\nendmacro\n").unwrap_err(),
            MacroErrorKind::InvalidName("r3".to_string())
        );
    }

    #[test]
    fn missing_name_is_rejected() {
        assert_eq!(
            expand("macro\nendmacro\n").unwrap_err(),
            MacroErrorKind::InvalidName(String::new())
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        assert_eq!(
            expand("macro m\nendmacro\nmacro m\nendmacro\n").unwrap_err(),
            MacroErrorKind::DuplicateName("m".to_string())
        );
    }

    #[test]
    fn unterminated_definition_is_rejected() {
        assert_eq!(
            expand("macro m\nmov r1,r2\n").unwrap_err(),
            MacroErrorKind::Unterminated("m".to_string())
        );
    }
}
