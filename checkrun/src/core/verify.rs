//! Ordered substring matching of CHECK lines against pipeline output.

use crate::core::directive::normalize_whitespace;
use crate::core::types::ExecutionTrace;
use crate::error::TestError;

/// Verify a finished pipeline against the test's CHECK list.
///
/// With no checks, a pipeline that got this far has passed. Otherwise any
/// stderr output fails the test, and each check must match a line strictly
/// after the line the previous check matched.
pub fn verify(checks: &[String], trace: &ExecutionTrace) -> Result<(), TestError> {
    if checks.is_empty() {
        return Ok(());
    }

    let stderr = trace.stderr();
    if !stderr.is_empty() {
        return Err(TestError::NonEmptyStderr {
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        });
    }

    let stdout = String::from_utf8_lossy(&trace.stdout);
    let lines: Vec<String> = stdout.lines().map(normalize_whitespace).collect();
    match_in_order(checks, &lines)
}

/// Advance a cursor through `lines` for each check in turn.
///
/// Stops at the first check that cannot be found; later checks are not
/// tried against an exhausted cursor.
pub fn match_in_order(checks: &[String], lines: &[String]) -> Result<(), TestError> {
    let mut cursor = 0;
    for check in checks {
        let found = lines[cursor..]
            .iter()
            .position(|line| line.contains(check.as_str()));
        match found {
            Some(offset) => cursor += offset + 1,
            None => {
                return Err(TestError::CheckNotFound {
                    check: check.clone(),
                    remaining_lines: lines.len() - cursor,
                });
            }
        }
    }
    Ok(())
}
