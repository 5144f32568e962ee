use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

use super::{AnswerEngine, ProcessInvocation, ProcessResult};
use crate::bridge::Question;
use crate::config::BridgeConfig;
use crate::consts::{DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SCRIPT_PATH};
use crate::error::EngineError;

/// Configuration for the script engine.
#[derive(Debug, Clone)]
pub struct ScriptConfig {
    pub script_path: PathBuf,
    /// When set, the engine runs as `<interpreter> <script_path> <question>`.
    pub interpreter: Option<String>,
    pub timeout: Duration,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            script_path: PathBuf::from(DEFAULT_SCRIPT_PATH),
            interpreter: None,
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl From<&BridgeConfig> for ScriptConfig {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            script_path: config.script_path.clone(),
            interpreter: config.script_interpreter.clone(),
            timeout: config.request_timeout(),
        }
    }
}

/// Runs an external program with the question as its single argument.
///
/// The program is started directly from an argument vector, never through a
/// shell, in its own process group. The whole group is killed when the run
/// ends, whether it finished, timed out, or its future was dropped.
pub struct ScriptEngine {
    config: ScriptConfig,
    name: String,
}

impl ScriptEngine {
    pub fn new(config: ScriptConfig) -> Self {
        let name = match config.script_path.file_name() {
            Some(file) => format!("script:{}", file.to_string_lossy()),
            None => "script".to_string(),
        };
        Self { config, name }
    }

    /// Build the argument vector for one run. The question is always the
    /// last argument and is never split or quoted.
    pub fn invocation(&self, question: &Question) -> ProcessInvocation {
        let (program, mut args) = match &self.config.interpreter {
            Some(interpreter) => (
                OsString::from(interpreter),
                vec![self.config.script_path.clone().into_os_string()],
            ),
            None => (self.config.script_path.clone().into_os_string(), Vec::new()),
        };
        args.push(OsString::from(question.as_str()));

        ProcessInvocation {
            program,
            args,
            started: Instant::now(),
            timeout: self.config.timeout,
        }
    }

    fn command(invocation: &ProcessInvocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own group so children forked by the engine die with it.
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }
}

#[async_trait]
impl AnswerEngine for ScriptEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, question: &Question) -> Result<ProcessResult, EngineError> {
        let invocation = self.invocation(question);

        let child = Self::command(&invocation)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: invocation.program.to_string_lossy().into_owned(),
                source,
            })?;

        let pid = child.id();
        debug!(pid, program = ?invocation.program, "engine spawned");
        let mut group = GroupKill::new(pid);

        let output = match tokio::time::timeout(invocation.timeout, child.wait_with_output()).await
        {
            Ok(output) => output?,
            Err(_) => {
                warn!(
                    pid,
                    timeout_ms = invocation.timeout.as_millis() as u64,
                    "engine timed out, killing process group"
                );
                group.kill();
                return Err(EngineError::Timeout(invocation.timeout));
            }
        };
        // Sweep anything the engine left running in the background.
        group.kill();

        Ok(ProcessResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: invocation.started.elapsed(),
        })
    }
}

/// Kills the engine's process group once. If it is dropped before that
/// (request cancelled mid-run), the drop does the kill.
struct GroupKill {
    pid: Option<u32>,
    armed: bool,
}

impl GroupKill {
    fn new(pid: Option<u32>) -> Self {
        Self { pid, armed: true }
    }

    fn kill(&mut self) {
        self.armed = false;
        if let Some(pid) = self.pid {
            kill_group(pid);
        }
    }
}

impl Drop for GroupKill {
    fn drop(&mut self) {
        if self.armed {
            debug!(pid = self.pid, "engine run dropped, killing process group");
            self.kill();
        }
    }
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        // Group already gone.
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pid, error = ?e, "killpg SIGKILL failed"),
    }
}

// Without process groups, kill_on_drop on the child is all we have.
#[cfg(not(unix))]
fn kill_group(_pid: u32) {}
