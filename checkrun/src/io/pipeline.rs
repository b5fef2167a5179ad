//! Running a resolved pipeline as a chain of child processes.
//!
//! Stage 0 reads the test file on stdin; every later stage reads the previous
//! stage's stdout. Each stage's stderr, and the last stage's stdout, is drained
//! on its own thread while the pipeline runs. Reading them one after another
//! from this thread could deadlock: a stage blocked writing a full stderr pipe
//! never gets to close the stdout pipe being waited on.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::pipeline::{ResolvedPipeline, Stage};
use crate::core::types::{ExecutionTrace, StageTrace};
use crate::error::TestError;

/// Limits applied to one pipeline run.
#[derive(Debug, Clone, Copy)]
pub struct ExecLimits {
    /// Wall-clock budget for the whole pipeline; `None` waits forever.
    pub timeout: Option<Duration>,
    /// Maximum bytes kept per captured stream.
    pub output_limit_bytes: usize,
}

type Drain = JoinHandle<io::Result<Vec<u8>>>;

struct RunningStage<'a> {
    stage: &'a Stage,
    child: Child,
    stderr: Drain,
}

/// Run `pipeline` inside `workdir`, feeding `input` to the first stage.
///
/// Returns the trace when every stage before the last exits zero. Otherwise
/// fails with `StageFailed` for the first of them, in pipeline order, that did
/// not. The last stage's exit code is recorded in the trace but not checked.
#[instrument(skip_all, fields(stages = pipeline.len(), input = %input.display()))]
pub fn execute(
    pipeline: &ResolvedPipeline,
    input: &Path,
    workdir: &Path,
    limits: ExecLimits,
) -> Result<ExecutionTrace, TestError> {
    if pipeline.is_empty() {
        return Err(TestError::EmptyStage {
            line: String::new(),
        });
    }
    let file = File::open(input).map_err(|err| TestError::io(input, err))?;
    let mut next_stdin = Some(Stdio::from(file));
    let mut running: Vec<RunningStage<'_>> = Vec::with_capacity(pipeline.len());
    let mut stdout_drain: Option<Drain> = None;

    for (index, stage) in pipeline.stages.iter().enumerate() {
        let is_last = index + 1 == pipeline.len();
        let mut cmd = Command::new(&stage.program);
        cmd.args(&stage.args)
            .current_dir(workdir)
            .stdin(next_stdin.take().unwrap_or_else(Stdio::null))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(stage = index, command = %stage.command, "spawning stage");
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                error!(stage = index, command = %stage.command, err = %err, "failed to spawn");
                abort(running);
                return Err(TestError::SpawnFailed {
                    command: stage.command.clone(),
                    source: err,
                });
            }
        };
        // `cmd` still owns the previous stage's stdout; dropping it leaves the
        // child as the only reader so EOF propagates.
        drop(cmd);

        let stderr = spawn_capture(
            child.stderr.take(),
            Capture::stderr(&stage.command, limits.output_limit_bytes),
        );
        let stdout = child.stdout.take();
        if is_last {
            stdout_drain = Some(spawn_capture(
                stdout,
                Capture::stdout(&stage.command, limits.output_limit_bytes),
            ));
        } else {
            next_stdin = stdout.map(Stdio::from);
        }
        running.push(RunningStage {
            stage,
            child,
            stderr,
        });
    }

    let deadline = limits
        .timeout
        .map(|timeout| Deadline {
            at: Instant::now() + timeout,
            timeout,
        });
    let statuses = match wait_all(&mut running, deadline) {
        Ok(statuses) => statuses,
        Err(err) => {
            abort(running);
            if let Some(handle) = stdout_drain {
                let _ = join_drain(handle);
            }
            return Err(err);
        }
    };

    let mut stages = Vec::with_capacity(running.len());
    for (run, status) in running.into_iter().zip(statuses) {
        let stderr = join_drain(run.stderr).map_err(|err| TestError::io(workdir, err))?;
        debug!(command = %run.stage.command, exit_code = ?status.code(), "stage finished");
        stages.push(StageTrace {
            command: run.stage.command.clone(),
            exit_code: status.code(),
            stderr,
        });
    }

    let stdout = match stdout_drain {
        Some(handle) => join_drain(handle).map_err(|err| TestError::io(workdir, err))?,
        None => Vec::new(),
    };

    let upstream = stages.split_last().map_or(&[][..], |(_, rest)| rest);
    if let Some(failed) = upstream.iter().find(|stage| stage.exit_code != Some(0)) {
        return Err(TestError::StageFailed {
            command: failed.command.clone(),
            exit_code: failed.exit_code,
        });
    }

    Ok(ExecutionTrace { stages, stdout })
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    timeout: Duration,
}

/// Wait for the last stage, then every earlier one in order.
fn wait_all(
    running: &mut [RunningStage<'_>],
    deadline: Option<Deadline>,
) -> Result<Vec<ExitStatus>, TestError> {
    let mut statuses: Vec<Option<ExitStatus>> = vec![None; running.len()];
    let last = running.len().saturating_sub(1);
    let order = std::iter::once(last).chain(0..last);
    for index in order {
        statuses[index] = Some(wait_stage(&mut running[index], deadline)?);
    }
    Ok(statuses.into_iter().flatten().collect())
}

fn wait_stage(
    run: &mut RunningStage<'_>,
    deadline: Option<Deadline>,
) -> Result<ExitStatus, TestError> {
    let Some(deadline) = deadline else {
        return run
            .child
            .wait()
            .map_err(|err| TestError::io(&run.stage.program, err));
    };
    let remaining = deadline.at.saturating_duration_since(Instant::now());
    match run
        .child
        .wait_timeout(remaining)
        .map_err(|err| TestError::io(&run.stage.program, err))?
    {
        Some(status) => Ok(status),
        None => {
            warn!(command = %run.stage.command, "stage timed out, killing pipeline");
            Err(TestError::StageTimedOut {
                command: run.stage.command.clone(),
                timeout_secs: deadline.timeout.as_secs(),
            })
        }
    }
}

/// Kill and reap every started stage, discarding their output.
fn abort(running: Vec<RunningStage<'_>>) {
    for mut run in running {
        let _ = run.child.kill();
        let _ = run.child.wait();
        let _ = join_drain(run.stderr);
    }
}

/// Where a captured stream came from and how much of it to keep.
#[derive(Debug, Clone)]
struct Capture {
    stream: &'static str,
    command: String,
    limit: usize,
}

impl Capture {
    fn stderr(command: &str, limit: usize) -> Self {
        Self {
            stream: "stderr",
            command: command.to_string(),
            limit,
        }
    }

    fn stdout(command: &str, limit: usize) -> Self {
        Self {
            stream: "stdout",
            command: command.to_string(),
            limit,
        }
    }

    /// Read `reader` to EOF, keeping the first `limit` bytes.
    ///
    /// The rest is still consumed so the writer never blocks on a full pipe.
    fn collect<R: Read>(&self, mut reader: R) -> io::Result<Vec<u8>> {
        let mut kept = Vec::new();
        reader
            .by_ref()
            .take(self.limit as u64)
            .read_to_end(&mut kept)?;
        let discarded = io::copy(&mut reader, &mut io::sink())?;
        if discarded > 0 {
            warn!(
                stream = self.stream,
                command = %self.command,
                kept = kept.len(),
                discarded,
                "captured output truncated"
            );
        }
        Ok(kept)
    }
}

fn spawn_capture<R>(stream: Option<R>, capture: Capture) -> Drain
where
    R: Read + Send + 'static,
{
    thread::spawn(move || match stream {
        Some(stream) => capture.collect(stream),
        None => Ok(Vec::new()),
    })
}

fn join_drain(handle: Drain) -> io::Result<Vec<u8>> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(io::Error::other("output reader thread panicked")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn limits() -> ExecLimits {
        ExecLimits {
            timeout: Some(Duration::from_secs(30)),
            output_limit_bytes: 1 << 20,
        }
    }

    fn input(dir: &Path, contents: &str) -> std::path::PathBuf {
        let path = dir.join("input.txt");
        fs::write(&path, contents).expect("write input");
        path
    }

    #[test]
    fn first_stage_reads_test_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = input(temp.path(), "one\ntwo\n");
        let pipeline = ResolvedPipeline::parse("cat").expect("parse");
        let trace = execute(&pipeline, &path, temp.path(), limits()).expect("execute");
        assert_eq!(trace.stdout, b"one\ntwo\n".to_vec());
        assert_eq!(trace.stages.len(), 1);
        assert!(trace.stderr().is_empty());
    }

    #[test]
    fn stages_are_chained_in_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = input(temp.path(), "b\na\nc\na\n");
        let pipeline = ResolvedPipeline::parse("sort | uniq | tr a-z A-Z").expect("parse");
        let trace = execute(&pipeline, &path, temp.path(), limits()).expect("execute");
        assert_eq!(String::from_utf8_lossy(&trace.stdout), "A\nB\nC\n");
        assert_eq!(trace.stages.len(), 3);
        assert!(trace.stages.iter().all(|stage| stage.exit_code == Some(0)));
    }

    #[test]
    fn stages_run_in_workdir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let work = temp.path().join("work");
        fs::create_dir_all(&work).expect("mkdir");
        fs::write(work.join("marker"), "").expect("write");
        let path = input(temp.path(), "");
        let pipeline = ResolvedPipeline::parse("ls").expect("parse");
        let trace = execute(&pipeline, &path, &work, limits()).expect("execute");
        assert_eq!(String::from_utf8_lossy(&trace.stdout), "marker\n");
    }

    #[test]
    fn first_failing_stage_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = input(temp.path(), "x\n");
        let pipeline = ResolvedPipeline::parse("cat | false | cat").expect("parse");
        let err = execute(&pipeline, &path, temp.path(), limits()).expect_err("fails");
        match err {
            TestError::StageFailed { command, exit_code } => {
                assert_eq!(command, "false");
                assert_eq!(exit_code, Some(1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn final_stage_exit_code_is_recorded_not_checked() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = temp.path().join("last.sh");
        fs::write(&script, "cat\nexit 1\n").expect("write script");
        let path = input(temp.path(), "alpha\n");
        let line = format!("cat | sh {}", script.display());
        let pipeline = ResolvedPipeline::parse(&line).expect("parse");
        let trace = execute(&pipeline, &path, temp.path(), limits()).expect("execute");
        assert_eq!(trace.stdout, b"alpha\n".to_vec());
        assert_eq!(trace.stages[0].exit_code, Some(0));
        assert_eq!(trace.stages[1].exit_code, Some(1));
    }

    #[test]
    fn single_failing_stage_is_the_final_stage() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = input(temp.path(), "");
        let pipeline = ResolvedPipeline::parse("false").expect("parse");
        let trace = execute(&pipeline, &path, temp.path(), limits()).expect("execute");
        assert_eq!(trace.stages[0].exit_code, Some(1));
    }

    #[test]
    fn large_stderr_does_not_deadlock() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = temp.path().join("noisy.sh");
        fs::write(
            &script,
            "head -c 1000000 /dev/zero >&2\nhead -c 1000000 /dev/zero\n",
        )
        .expect("write script");
        let path = input(temp.path(), "");
        let line = format!("sh {} | wc -c", script.display());
        let pipeline = ResolvedPipeline::parse(&line).expect("parse");
        let trace = execute(&pipeline, &path, temp.path(), limits()).expect("execute");
        assert_eq!(String::from_utf8_lossy(&trace.stdout).trim(), "1000000");
        assert_eq!(trace.stages[0].stderr.len(), 1_000_000);
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = input(temp.path(), "");
        let pipeline =
            ResolvedPipeline::parse("cat | /definitely/not/here/tool -").expect("parse");
        let err = execute(&pipeline, &path, temp.path(), limits()).expect_err("spawn");
        assert!(matches!(err, TestError::SpawnFailed { ref command, .. } if command == "/definitely/not/here/tool -"));
    }

    #[test]
    fn timeout_kills_pipeline() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = input(temp.path(), "");
        let pipeline = ResolvedPipeline::parse("sleep 10").expect("parse");
        let limits = ExecLimits {
            timeout: Some(Duration::from_millis(200)),
            output_limit_bytes: 1024,
        };
        let start = Instant::now();
        let err = execute(&pipeline, &path, temp.path(), limits).expect_err("timeout");
        assert!(matches!(err, TestError::StageTimedOut { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn output_beyond_limit_is_discarded() {
        let data = vec![b'a'; 10_000];
        let mut reader = &data[..];
        let kept = Capture::stdout("cat", 4096)
            .collect(&mut reader)
            .expect("read");
        assert_eq!(kept.len(), 4096);
        assert!(reader.is_empty(), "remaining bytes should be consumed");
    }

    #[test]
    fn truncated_pipeline_output_still_finishes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = input(temp.path(), "");
        let pipeline = ResolvedPipeline::parse("head -c 100000 /dev/zero").expect("parse");
        let limits = ExecLimits {
            timeout: Some(Duration::from_secs(30)),
            output_limit_bytes: 512,
        };
        let trace = execute(&pipeline, &path, temp.path(), limits).expect("execute");
        assert_eq!(trace.stdout.len(), 512);
    }
}
