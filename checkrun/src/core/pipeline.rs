//! Splitting a resolved RUN line into pipeline stages.

use crate::error::TestError;

/// One process of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub program: String,
    pub args: Vec<String>,
    /// The stage's command line as written, for diagnostics.
    pub command: String,
}

/// Ordered stages of a RUN line; stage `i` feeds stage `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPipeline {
    pub stages: Vec<Stage>,
}

impl ResolvedPipeline {
    /// Split on `|`, then each stage on single spaces.
    ///
    /// There is no quoting: an argument can never contain a space or a pipe.
    pub fn parse(line: &str) -> Result<Self, TestError> {
        let mut stages = Vec::new();
        for part in line.split('|') {
            let command = part.trim();
            let mut words = command.split(' ').filter(|word| !word.is_empty());
            let Some(program) = words.next() else {
                return Err(TestError::EmptyStage {
                    line: line.to_string(),
                });
            };
            stages.push(Stage {
                program: program.to_string(),
                args: words.map(str::to_string).collect(),
                command: command.to_string(),
            });
        }
        Ok(Self { stages })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
