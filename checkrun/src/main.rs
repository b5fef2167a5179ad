//! `checkrun`: run directive-annotated tool tests.
//!
//! With no arguments every test under the configured root runs; with a test
//! file and an output directory only that test runs, inside that directory.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use checkrun::exit_codes;
use checkrun::io::config::{CONFIG_FILE, HarnessConfig, load_config};
use checkrun::io::discovery::discover_tests;
use checkrun::io::tools::ToolPaths;
use checkrun::logging;
use checkrun::suite::{ScratchMode, SuiteOptions, run_suite};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "checkrun",
    version,
    about = "Run RUN/CHECK directive tests against compiler tools"
)]
struct Cli {
    /// Test file and scratch directory; omit both to run the whole suite.
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Config file (default: `checkrun.toml` in the working directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the test root searched in suite mode.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Stop after the first failing test.
    #[arg(long)]
    fail_fast: bool,

    /// Keep per-test scratch directories.
    #[arg(long)]
    keep_scratch: bool,
}

/// What the positional arguments asked for.
#[derive(Debug, PartialEq, Eq)]
enum Mode {
    Suite,
    Single { test: PathBuf, output_dir: PathBuf },
}

impl Cli {
    fn mode(&self) -> Option<Mode> {
        match self.paths.as_slice() {
            [] => Some(Mode::Suite),
            [test, output_dir] => Some(Mode::Single {
                test: test.clone(),
                output_dir: output_dir.clone(),
            }),
            _ => None,
        }
    }

    fn apply(&self, mut cfg: HarnessConfig) -> HarnessConfig {
        if let Some(root) = &self.root {
            cfg.test_root = root.clone();
        }
        cfg.fail_fast |= self.fail_fast;
        cfg.keep_scratch |= self.keep_scratch;
        cfg
    }
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let Some(mode) = cli.mode() else {
        Cli::command()
            .error(
                ErrorKind::WrongNumberOfValues,
                "expected no arguments (suite) or exactly TEST and OUTPUT_DIR",
            )
            .exit();
    };

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let cfg = cli.apply(load_config(&config_path).context("load config")?);
    debug!(config = %config_path.display(), ?mode, "starting");

    let tools = ToolPaths::resolve(&cfg.tools).context("resolve tools")?;

    let mut options = SuiteOptions::from_config(&cfg);
    let paths = match mode {
        Mode::Suite => discover_tests(&cfg.test_root, &cfg)?,
        Mode::Single { test, output_dir } => {
            options.scratch = ScratchMode::Fixed(output_dir);
            vec![test]
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = run_suite(&paths, &cfg, &tools, &options, &mut out)?;
    out.flush().context("flush stdout")?;

    Ok(exit_code(result.success()))
}

fn exit_code(success: bool) -> i32 {
    if success {
        exit_codes::OK
    } else {
        exit_codes::FAILED
    }
}
