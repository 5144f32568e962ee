#![allow(dead_code)]

use std::path::Path;
use std::time::{Duration, Instant};

use chatbridge::engine::script::{ScriptConfig, ScriptEngine};
use tempfile::TempDir;

/// Write `body` as a shell script and return an engine that runs it via `sh`.
pub fn stub_engine(dir: &TempDir, body: &str, timeout: Duration) -> ScriptEngine {
    let path = dir.path().join("engine.sh");
    std::fs::write(&path, body).unwrap();
    ScriptEngine::new(ScriptConfig {
        script_path: path,
        interpreter: Some("sh".to_string()),
        timeout,
    })
}

/// Stub that forks a long sleep, records "<shell pid> <sleep pid>" into the
/// file named by its argument, then waits.
pub const SLEEPER: &str = "sleep 30 &\necho \"$$ $!\" > \"$1\"\nwait\n";

/// Poll for the pid file a [`SLEEPER`] writes.
pub async fn read_pids(path: &Path) -> Vec<i32> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(text) = std::fs::read_to_string(path) {
            let pids: Vec<i32> = text
                .split_whitespace()
                .filter_map(|p| p.parse().ok())
                .collect();
            if pids.len() == 2 {
                return pids;
            }
        }
        assert!(Instant::now() < deadline, "engine never wrote its pids");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// True while the process exists and is not a zombie.
pub fn is_alive(pid: i32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
        return false;
    };
    // Format: "pid (comm) S ..."; comm may contain spaces.
    match stat.rfind(')') {
        Some(i) => !stat[i + 1..].trim_start().starts_with('Z'),
        None => false,
    }
}

/// Wait until none of `pids` is alive, panicking after a few seconds.
pub async fn assert_all_dead(pids: &[i32]) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while pids.iter().any(|&pid| is_alive(pid)) {
        assert!(
            Instant::now() < deadline,
            "engine processes still running: {:?}",
            pids.iter().filter(|&&p| is_alive(p)).collect::<Vec<_>>()
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
