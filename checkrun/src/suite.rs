//! Suite aggregation: preflight, sequential execution and reporting.
//!
//! Tests run one after another, each in its own scratch directory. Progress
//! and failure diagnostics are written to the supplied writer (stdout in the
//! CLI).

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::placeholder::referenced_placeholders;
use crate::core::types::{TestDirectives, TestOutcome, TestSpec};
use crate::error::TestError;
use crate::io::config::HarnessConfig;
use crate::io::pipeline::ExecLimits;
use crate::io::scratch::Scratch;
use crate::io::tools::ToolPaths;
use crate::run::{RunContext, TestRun, load_directives, run_test};

/// What to do after a test fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Run every test and report all failures at the end.
    #[default]
    Continue,
    /// Stop after the first failing test.
    FailFast,
}

impl FailurePolicy {
    pub fn from_flag(fail_fast: bool) -> Self {
        if fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::Continue
        }
    }
}

/// Where a test's scratch directory comes from.
#[derive(Debug, Clone)]
pub enum ScratchMode {
    /// A fresh temporary directory per test, removed unless `keep` is set.
    Temporary { keep: bool },
    /// A caller-supplied directory, created if absent and left in place.
    Fixed(PathBuf),
}

/// Aggregate of one suite run.
#[derive(Debug, Default)]
pub struct SuiteResult {
    pub passed: usize,
    pub skipped: usize,
    pub failures: Vec<(PathBuf, TestError)>,
}

impl SuiteResult {
    pub fn total(&self) -> usize {
        self.passed + self.skipped + self.failures.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_paths(&self) -> impl Iterator<Item = &Path> {
        self.failures.iter().map(|(path, _)| path.as_path())
    }
}

/// Settings for one suite run, derived from config and CLI flags.
#[derive(Debug, Clone)]
pub struct SuiteOptions {
    pub policy: FailurePolicy,
    pub scratch: ScratchMode,
    pub limits: ExecLimits,
}

impl SuiteOptions {
    pub fn from_config(cfg: &HarnessConfig) -> Self {
        Self {
            policy: FailurePolicy::from_flag(cfg.fail_fast),
            scratch: ScratchMode::Temporary {
                keep: cfg.keep_scratch,
            },
            limits: ExecLimits {
                timeout: cfg.stage_timeout(),
                output_limit_bytes: cfg.output_limit_bytes,
            },
        }
    }
}

/// Check that every placeholder any test uses has a resolved tool.
///
/// Runs before the first test so a misconfigured environment is reported
/// once. Files that cannot be read or parsed are left for their own test to
/// report.
#[instrument(skip_all, fields(tests = paths.len()))]
pub fn preflight(
    paths: &[PathBuf],
    markers: &BTreeMap<String, String>,
    tools: &ToolPaths,
) -> Result<(), TestError> {
    for path in paths {
        let Ok(spec) = TestSpec::from_path(path, markers) else {
            continue;
        };
        let Ok(TestDirectives::Run { run, .. }) = load_directives(&spec) else {
            continue;
        };
        if let Some(name) = referenced_placeholders(&run)
            .into_iter()
            .find(|name| !tools.knows_placeholder(name))
        {
            return Err(TestError::ToolNotFound {
                token: format!("%{name}"),
                reason: format!("used by {} but not configured", path.display()),
            });
        }
    }
    Ok(())
}

/// Run `paths` in order and aggregate their outcomes.
///
/// Returns an error only for problems that invalidate the whole run: a fatal
/// test error (unresolvable tool) or a failure to write progress output.
#[instrument(skip_all, fields(tests = paths.len(), policy = ?options.policy))]
pub fn run_suite(
    paths: &[PathBuf],
    cfg: &HarnessConfig,
    tools: &ToolPaths,
    options: &SuiteOptions,
    out: &mut dyn Write,
) -> Result<SuiteResult> {
    preflight(paths, &cfg.markers, tools)?;

    let ctx = RunContext {
        tools,
        limits: options.limits,
    };
    let mut result = SuiteResult::default();

    for path in paths {
        writeln!(out, "{}", path.display()).context("write progress")?;
        let run = run_one(path, cfg, &options.scratch, &ctx);
        match run.outcome {
            TestOutcome::Pass => result.passed += 1,
            TestOutcome::Skipped => result.skipped += 1,
            TestOutcome::Fail(err) if err.is_fatal() => {
                return Err(err).with_context(|| format!("run {}", path.display()));
            }
            TestOutcome::Fail(err) => {
                write_failure(out, &err, run.command.as_deref())?;
                result.failures.push((path.clone(), err));
                if options.policy == FailurePolicy::FailFast {
                    warn!(test = %path.display(), "stopping after first failure");
                    break;
                }
            }
        }
    }

    writeln!(
        out,
        "{} tests: {} passed, {} skipped, {} failed",
        result.total(),
        result.passed,
        result.skipped,
        result.failed()
    )
    .context("write summary")?;
    for failed in result.failed_paths() {
        writeln!(out, "FAILED: {}", failed.display()).context("write summary")?;
    }
    info!(
        passed = result.passed,
        skipped = result.skipped,
        failed = result.failed(),
        "suite finished"
    );
    Ok(result)
}

fn run_one(path: &Path, cfg: &HarnessConfig, mode: &ScratchMode, ctx: &RunContext<'_>) -> TestRun {
    let prepared = absolute(path)
        .and_then(|abs| TestSpec::from_path(&abs, &cfg.markers))
        .and_then(|spec| {
            let scratch = match mode {
                ScratchMode::Temporary { keep } => Scratch::temporary(&spec.path, *keep)?,
                ScratchMode::Fixed(dir) => Scratch::at(dir)?,
            };
            Ok((spec, scratch))
        });
    match prepared {
        Ok((spec, scratch)) => {
            debug!(scratch = %scratch.path().display(), "scratch ready");
            run_test(&spec, &scratch, ctx)
        }
        Err(err) => TestRun {
            outcome: TestOutcome::Fail(err),
            command: None,
        },
    }
}

fn absolute(path: &Path) -> Result<PathBuf, TestError> {
    fs::canonicalize(path).map_err(|err| TestError::io(path, err))
}

fn write_failure(out: &mut dyn Write, err: &TestError, command: Option<&str>) -> Result<()> {
    writeln!(out, "  FAIL: {err}").context("write diagnostic")?;
    if let Some(command) = command {
        writeln!(out, "  RUN: {command}").context("write diagnostic")?;
    }
    Ok(())
}
