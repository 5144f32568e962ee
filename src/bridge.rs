//! The bridge: validate a question, run the answer engine under the
//! concurrency limit, and turn the outcome into an [`Answer`] or a
//! classified [`BridgeError`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::consts::{MAX_LOG_OUTPUT_BYTES, MSG_NO_QUESTION, MSG_NUL_IN_QUESTION, truncate_output};
use crate::engine::AnswerEngine;
use crate::error::BridgeError;
use crate::limiter::ConcurrencyLimiter;

/// A question that passed validation. Holds the text exactly as sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question(String);

impl Question {
    /// Accept any text that is non-blank after trimming and can be passed
    /// as a process argument.
    pub fn parse(raw: Option<&str>) -> Result<Self, BridgeError> {
        let text = raw.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(BridgeError::InvalidInput(MSG_NO_QUESTION));
        }
        if text.contains('\0') {
            return Err(BridgeError::InvalidInput(MSG_NUL_IN_QUESTION));
        }
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// A successful round trip through the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub question: String,
    pub response: String,
    pub duration: Duration,
}

pub struct Bridge {
    engine: Arc<dyn AnswerEngine>,
    limiter: ConcurrencyLimiter,
}

impl Bridge {
    pub fn new(engine: Arc<dyn AnswerEngine>, limiter: ConcurrencyLimiter) -> Self {
        Self { engine, limiter }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Answer one question.
    ///
    /// Validation happens before a limiter slot is taken, so a bad request
    /// never starts or waits for a process. The slot is held until the
    /// engine run finishes or this future is dropped.
    pub async fn ask(&self, raw: Option<&str>) -> Result<Answer, BridgeError> {
        let question = Question::parse(raw)?;

        let _permit = self.limiter.acquire().await.inspect_err(|_| {
            warn!(
                capacity = self.limiter.capacity(),
                "engine at capacity, rejecting question"
            );
        })?;

        let result = self.engine.run(&question).await.inspect_err(|e| {
            warn!(engine = self.engine.name(), error = %e, "engine run failed");
        })?;

        if !result.success() {
            warn!(
                engine = self.engine.name(),
                exit_code = ?result.exit_code,
                duration_ms = result.duration.as_millis() as u64,
                stderr = %truncate_output(&result.stderr, MAX_LOG_OUTPUT_BYTES),
                "engine exited unsuccessfully"
            );
            return Err(BridgeError::ExecutionFailed {
                exit_code: result.exit_code,
                stderr: result.stderr,
            });
        }

        if !result.stderr.trim().is_empty() {
            debug!(
                stderr = %truncate_output(&result.stderr, MAX_LOG_OUTPUT_BYTES),
                "engine wrote to stderr"
            );
        }
        info!(
            engine = self.engine.name(),
            duration_ms = result.duration.as_millis() as u64,
            answer_bytes = result.answer().len(),
            "engine answered"
        );

        Ok(Answer {
            response: result.answer().to_string(),
            duration: result.duration,
            question: question.into_inner(),
        })
    }
}
