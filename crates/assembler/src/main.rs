//! CLI entry point for the `decet-asm` binary.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use assembler as _;
use assembler::assembler::{assemble_lines, AssembleError, AssembleWarning};
use assembler::preprocessor::{expand_macros, MacroError};
use assembler::source::{split_source_lines, SourceLine};
use decet_core as _;
#[cfg(test)]
use tempfile as _;

const USAGE_TEXT: &str = "\
Usage: decet-asm <input>...

Assembles Decet-256 source files. For every input `foo.as` (or stem `foo`)
the expanded source is written to `foo.am` and the object image to `foo.ob`.
Entry symbols go to `foo.ent` and extern usages to `foo.ext`; either file is
omitted when it would be empty. A failed file keeps no outputs.

Options:
  -h, --help    Show this help message
";

#[derive(Debug)]
enum ParsedArgs {
    Inputs(Vec<PathBuf>),
    Help,
}

fn parse_args(args: impl Iterator<Item = OsString>) -> Result<ParsedArgs, String> {
    let mut inputs = Vec::new();

    for arg in args {
        if arg == "--help" || arg == "-h" {
            return Ok(ParsedArgs::Help);
        }
        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }
        inputs.push(PathBuf::from(arg));
    }

    if inputs.is_empty() {
        return Err("no input files".to_string());
    }
    Ok(ParsedArgs::Inputs(inputs))
}

/// The per-file output paths, derived from the input stem.
struct OutputPaths {
    expanded: PathBuf,
    object: PathBuf,
    entries: PathBuf,
    externals: PathBuf,
}

fn output_paths(input: &Path) -> (PathBuf, OutputPaths) {
    let stem = if input.extension().is_some_and(|ext| ext == "as") {
        input.with_extension("")
    } else {
        input.to_path_buf()
    };
    let source = stem.with_extension("as");
    let paths = OutputPaths {
        expanded: stem.with_extension("am"),
        object: stem.with_extension("ob"),
        entries: stem.with_extension("ent"),
        externals: stem.with_extension("ext"),
    };
    (source, paths)
}

fn run_file(input: &Path) -> Result<(), i32> {
    let (source_path, paths) = output_paths(input);

    let content = fs::read_to_string(&source_path).map_err(|e| {
        eprintln!("error: couldn't read {}: {e}", source_path.display());
        1
    })?;

    let lines = split_source_lines(&content);
    let expanded = expand_macros(&lines).map_err(|e| {
        report_macro_error(&source_path, &e);
        1
    })?;

    write_expanded(&paths.expanded, &expanded)?;

    match assemble_lines(&expanded) {
        Ok(artifacts) => {
            report_warnings(&paths.expanded, &artifacts.warnings);

            write_output(&paths.object, &artifacts.object)?;
            write_optional(&paths.entries, artifacts.entries.as_deref(), "entry directives")?;
            write_optional(
                &paths.externals,
                artifacts.externals.as_deref(),
                "extern labels",
            )?;

            println!(
                "Assembled {} -> {}",
                source_path.display(),
                paths.object.display()
            );
            Ok(())
        }
        Err(failure) => {
            report_warnings(&paths.expanded, &failure.warnings);
            for error in &failure.errors {
                report_assemble_error(&paths.expanded, error);
            }
            // A failed file keeps no outputs, not even from earlier runs.
            remove_stale(&paths.object);
            remove_stale(&paths.entries);
            remove_stale(&paths.externals);
            Err(1)
        }
    }
}

fn write_expanded(path: &Path, lines: &[SourceLine]) -> Result<(), i32> {
    let mut content = String::new();
    for line in lines {
        content.push_str(&line.text);
        content.push('\n');
    }
    write_output(path, &content)
}

fn write_output(path: &Path, content: &str) -> Result<(), i32> {
    fs::write(path, content).map_err(|e| {
        eprintln!("error: failed to write {}: {e}", path.display());
        1
    })
}

fn write_optional(path: &Path, content: Option<&str>, what: &str) -> Result<(), i32> {
    match content {
        Some(text) => write_output(path, text),
        None => {
            println!("No {what} found, not creating {}", path.display());
            remove_stale(path);
            Ok(())
        }
    }
}

fn remove_stale(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => eprintln!("warning: couldn't remove {}: {e}", path.display()),
    }
}

fn report_macro_error(source: &Path, error: &MacroError) {
    eprintln!("{}:{}: error: {error}", source.display(), error.line);
}

fn report_assemble_error(expanded: &Path, error: &AssembleError) {
    match error.line {
        Some(line) => eprintln!("{}:{line}: error: {error}", expanded.display()),
        None => eprintln!("{}: error: {error}", expanded.display()),
    }
}

fn report_warnings(expanded: &Path, warnings: &[AssembleWarning]) {
    for warning in warnings {
        eprintln!(
            "{}:{}: warning: {warning}",
            expanded.display(),
            warning.line
        );
    }
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParsedArgs::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParsedArgs::Inputs(inputs)) => {
            let mut code = 0;
            for input in &inputs {
                if run_file(input).is_err() {
                    code = 1;
                }
            }
            code
        }
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{USAGE_TEXT}");
            1
        }
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::{output_paths, parse_args, ParsedArgs};
    use std::ffi::OsString;
    use std::path::PathBuf;

    #[test]
    fn parses_input_list() {
        let parsed = parse_args([OsString::from("a.as"), OsString::from("b")].into_iter())
            .expect("inputs should parse");
        let ParsedArgs::Inputs(inputs) = parsed else {
            panic!("expected inputs");
        };
        assert_eq!(inputs, vec![PathBuf::from("a.as"), PathBuf::from("b")]);
    }

    #[test]
    fn parses_help_flag() {
        let parsed =
            parse_args([OsString::from("--help")].into_iter()).expect("help should parse");
        assert!(matches!(parsed, ParsedArgs::Help));
    }

    #[test]
    fn rejects_unknown_option() {
        let error = parse_args([OsString::from("--bogus")].into_iter())
            .expect_err("unknown option should fail");
        assert!(error.contains("unknown option"));
    }

    #[test]
    fn rejects_empty_input_list() {
        let error = parse_args(std::iter::empty()).expect_err("no inputs should fail");
        assert!(error.contains("no input files"));
    }

    #[test]
    fn derives_output_paths_from_extension_or_stem() {
        let (source, paths) = output_paths(&PathBuf::from("prog.as"));
        assert_eq!(source, PathBuf::from("prog.as"));
        assert_eq!(paths.expanded, PathBuf::from("prog.am"));
        assert_eq!(paths.object, PathBuf::from("prog.ob"));
        assert_eq!(paths.entries, PathBuf::from("prog.ent"));
        assert_eq!(paths.externals, PathBuf::from("prog.ext"));

        let (source, paths) = output_paths(&PathBuf::from("dir/prog"));
        assert_eq!(source, PathBuf::from("dir/prog.as"));
        assert_eq!(paths.object, PathBuf::from("dir/prog.ob"));
    }
}
