use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{AnswerEngine, ProcessResult};
use crate::bridge::Question;
use crate::error::EngineError;

/// What a [`MockEngine`] does when asked.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Exit 0 and print `"{prefix}{question}"`.
    Echo { prefix: String },
    /// Exit with the given code and output.
    Exit {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// Behave as if the engine ran past its timeout.
    Timeout,
}

/// A scripted engine for tests. Records every question it receives and
/// the highest number of runs it saw in flight at once.
pub struct MockEngine {
    reply: MockReply,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockEngine {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn echo(prefix: &str) -> Self {
        Self::new(MockReply::Echo {
            prefix: prefix.to_string(),
        })
    }

    /// Sleep this long inside every run.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Questions received so far, in arrival order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AnswerEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(&self, question: &Question) -> Result<ProcessResult, EngineError> {
        self.calls.lock().unwrap().push(question.as_str().to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.reply {
            MockReply::Echo { prefix } => Ok(ProcessResult {
                exit_code: Some(0),
                stdout: format!("{}{}\n", prefix, question.as_str()),
                stderr: String::new(),
                duration: self.delay,
            }),
            MockReply::Exit {
                code,
                stdout,
                stderr,
            } => Ok(ProcessResult {
                exit_code: *code,
                stdout: stdout.clone(),
                stderr: stderr.clone(),
                duration: self.delay,
            }),
            MockReply::Timeout => Err(EngineError::Timeout(self.delay)),
        }
    }
}
