//! Failure kinds a single test can end in.
//!
//! Everything up to the per-test boundary returns `Result<_, TestError>`; the
//! aggregator turns the error into a `Fail` outcome, except for
//! [`TestError::ToolNotFound`] which aborts the whole run.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestError {
    #[error("no RUN directive")]
    MissingRunDirective,

    #[error("duplicate RUN directive on line {second_line} (first on line {first_line})")]
    DuplicateRunDirective { first_line: usize, second_line: usize },

    #[error("unknown directive `{name}` on line {line}")]
    UnknownDirective { name: String, line: usize },

    #[error("tool not found for `{token}`: {reason}")]
    ToolNotFound { token: String, reason: String },

    #[error("no comment marker known for {}", .path.display())]
    UnknownFileExtension { path: PathBuf },

    #[error("empty pipeline stage in `{line}`")]
    EmptyStage { line: String },

    #[error("failed to spawn `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}", describe_exit(.exit_code))]
    StageFailed {
        command: String,
        exit_code: Option<i32>,
    },

    #[error("`{command}` timed out after {timeout_secs}s")]
    StageTimedOut { command: String, timeout_secs: u64 },

    #[error("pipeline wrote to stderr:\n{stderr}")]
    NonEmptyStderr { stderr: String },

    #[error("CHECK not found: `{check}` ({remaining_lines} lines left to search)")]
    CheckNotFound { check: String, remaining_lines: usize },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TestError {
    /// Errors that mean the environment is broken rather than the test.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TestError::ToolNotFound { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TestError::Io {
            path: path.into(),
            source,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_failure_names_command_and_code() {
        let err = TestError::StageFailed {
            command: "/usr/bin/opt -".to_string(),
            exit_code: Some(3),
        };
        assert_eq!(err.to_string(), "`/usr/bin/opt -` exited with exit code 3");

        let err = TestError::StageFailed {
            command: "cat".to_string(),
            exit_code: None,
        };
        assert!(err.to_string().ends_with("a signal"));
    }

    #[test]
    fn only_tool_resolution_is_fatal() {
        let missing = TestError::ToolNotFound {
            token: "%opt".to_string(),
            reason: "not on PATH".to_string(),
        };
        assert!(missing.is_fatal());
        assert!(!TestError::MissingRunDirective.is_fatal());
    }
}
