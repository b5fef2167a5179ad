//! RUN / CHECK / DISABLED directive extraction.
//!
//! A directive is a comment line whose body (after the file's comment marker)
//! reads `RUN: <pipeline>`, `CHECK: <substring>` or `DISABLED`. Comment lines
//! without a colon are ordinary comments. Comment lines with a colon but an
//! unrecognized name are errors, so a typo like `CHEKC:` cannot silently drop
//! a check.

use crate::core::types::TestDirectives;
use crate::error::TestError;

/// Classification of a single source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Run(String),
    Check(String),
    Disabled,
    /// Code, blank lines and plain comments.
    Ignore,
    /// A `NAME: ...` comment with a name that is not a directive.
    Unknown(String),
}

/// Collapse every run of whitespace to a single space and trim both ends.
pub fn normalize_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classify one raw source line.
pub fn recognize(line: &str, marker: &str) -> LineKind {
    let line = normalize_whitespace(line);
    let Some(body) = line.strip_prefix(marker) else {
        return LineKind::Ignore;
    };
    let body = body.trim();

    let Some((cmd, args)) = body.split_once(':') else {
        return if body == "DISABLED" {
            LineKind::Disabled
        } else {
            LineKind::Ignore
        };
    };

    let args = args.trim().to_string();
    match cmd.trim() {
        "RUN" => LineKind::Run(args),
        "CHECK" => LineKind::Check(args),
        "DISABLED" => LineKind::Disabled,
        other => LineKind::Unknown(other.to_string()),
    }
}

/// Extract the directives of a test file.
///
/// A `DISABLED` line anywhere in the file yields `Disabled`, even after a bad
/// line; nothing after it is looked at. Without one, the first error found is
/// returned.
pub fn parse_directives(source: &str, marker: &str) -> Result<TestDirectives, TestError> {
    let mut run: Option<(usize, String)> = None;
    let mut checks = Vec::new();
    // A DISABLED line later in the file still wins over this.
    let mut first_error: Option<TestError> = None;

    for (index, line) in source.lines().enumerate() {
        let line_no = index + 1;
        let error = match recognize(line, marker) {
            LineKind::Ignore => continue,
            LineKind::Disabled => return Ok(TestDirectives::Disabled),
            LineKind::Check(check) => {
                checks.push(check);
                continue;
            }
            LineKind::Run(command) => match run.as_ref().map(|(first, _)| *first) {
                Some(first_line) => TestError::DuplicateRunDirective {
                    first_line,
                    second_line: line_no,
                },
                None => {
                    run = Some((line_no, command));
                    continue;
                }
            },
            LineKind::Unknown(name) => TestError::UnknownDirective {
                name,
                line: line_no,
            },
        };
        first_error.get_or_insert(error);
    }

    if let Some(err) = first_error {
        return Err(err);
    }
    let (_, run) = run.ok_or(TestError::MissingRunDirective)?;
    Ok(TestDirectives::Run { run, checks })
}
