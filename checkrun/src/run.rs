//! Running a single test file end to end.
//!
//! Parse directives, substitute placeholders, run the pipeline inside the
//! scratch directory, then verify CHECK lines against its output.

use std::fs;

use tracing::{debug, info, instrument};

use crate::core::directive::parse_directives;
use crate::core::pipeline::ResolvedPipeline;
use crate::core::placeholder::substitute;
use crate::core::types::{TestDirectives, TestOutcome, TestSpec};
use crate::core::verify::verify;
use crate::error::TestError;
use crate::io::pipeline::{ExecLimits, execute};
use crate::io::scratch::Scratch;
use crate::io::tools::ToolPaths;

/// Read-only state shared by every test of a run.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub tools: &'a ToolPaths,
    pub limits: ExecLimits,
}

/// Outcome of one test plus the resolved RUN line, when it got that far.
#[derive(Debug)]
pub struct TestRun {
    pub outcome: TestOutcome,
    pub command: Option<String>,
}

/// Read and parse the directives of `spec`.
pub fn load_directives(spec: &TestSpec) -> Result<TestDirectives, TestError> {
    let source = fs::read(&spec.path).map_err(|err| TestError::io(&spec.path, err))?;
    parse_directives(&String::from_utf8_lossy(&source), &spec.marker)
}

/// Run one test inside `scratch`.
///
/// Every failure, including a fatal `ToolNotFound`, comes back as
/// `TestOutcome::Fail`; the caller decides whether to keep going.
#[instrument(skip_all, fields(test = %spec.path.display()))]
pub fn run_test(spec: &TestSpec, scratch: &Scratch, ctx: &RunContext<'_>) -> TestRun {
    let mut command = None;
    let outcome = match run_inner(spec, scratch, ctx, &mut command) {
        Ok(outcome) => outcome,
        Err(err) => TestOutcome::Fail(err),
    };
    info!(outcome = ?outcome_label(&outcome), "test finished");
    TestRun { outcome, command }
}

fn run_inner(
    spec: &TestSpec,
    scratch: &Scratch,
    ctx: &RunContext<'_>,
    command: &mut Option<String>,
) -> Result<TestOutcome, TestError> {
    let (run, checks) = match load_directives(spec)? {
        TestDirectives::Disabled => {
            debug!("test disabled");
            return Ok(TestOutcome::Skipped);
        }
        TestDirectives::Run { run, checks } => (run, checks),
    };

    let placeholders = ctx.tools.placeholders(&spec.path, scratch.path());
    let resolved = substitute(&run, &placeholders)?;
    *command = Some(resolved.clone());

    let pipeline = ResolvedPipeline::parse(&resolved)?;
    debug!(stages = pipeline.len(), checks = checks.len(), "running pipeline");
    let trace = execute(&pipeline, &spec.path, scratch.path(), ctx.limits)?;
    verify(&checks, &trace)?;
    Ok(TestOutcome::Pass)
}

fn outcome_label(outcome: &TestOutcome) -> &'static str {
    match outcome {
        TestOutcome::Pass => "pass",
        TestOutcome::Skipped => "skipped",
        TestOutcome::Fail(_) => "fail",
    }
}
