pub mod mock;
pub mod script;

use async_trait::async_trait;
use std::ffi::OsString;
use std::time::{Duration, Instant};

use crate::bridge::Question;
use crate::error::EngineError;

/// One launch of the answer engine. Lives only as long as its request.
#[derive(Debug, Clone)]
pub struct ProcessInvocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub started: Instant,
    pub timeout: Duration,
}

/// What came back from one engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessResult {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// The answer text: stdout with trailing whitespace removed.
    pub fn answer(&self) -> &str {
        self.stdout.trim_end()
    }
}

/// Something that can answer a question. The bridge only knows this trait.
#[async_trait]
pub trait AnswerEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Run the engine once for `question`. Dropping the future must release
    /// any process it started.
    async fn run(&self, question: &Question) -> Result<ProcessResult, EngineError>;
}
