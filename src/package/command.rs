//! Bounded-time invocation of package manager binaries.

use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{Error, Result};

/// Keeps a console window from flashing up for every invocation on Windows.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

fn build_command(program: &str, args: &[&str]) -> Command {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(windows)]
    command.creation_flags(CREATE_NO_WINDOW);

    command
}

/// Run `program args...` and return its stdout.
///
/// A non-zero exit status or an expired timeout is an error. On timeout the
/// child is killed.
pub async fn run_captured(program: &str, args: &[&str], limit: Duration) -> Result<String> {
    let started = Instant::now();
    let output = timeout(limit, build_command(program, args).output())
        .await
        .map_err(|_| Error::Timeout {
            program: program.to_string(),
            secs: limit.as_secs(),
        })?
        .map_err(|source| Error::Spawn {
            program: program.to_string(),
            source,
        })?;

    debug!(
        program,
        ?args,
        status = ?output.status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "command finished"
    );

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::from_exit_status(program, output.status, &stderr));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run `program args...` for its exit status only.
pub async fn run_status(program: &str, args: &[&str], limit: Duration) -> Result<()> {
    run_captured(program, args, limit).await.map(|_| ())
}

/// Check that `program` is on PATH and answers `--version` within `limit`.
///
/// Never fails: any problem counts as "not available".
pub async fn probe(program: &str, limit: Duration) -> bool {
    if which::which(program).is_err() {
        debug!(program, "not found on PATH");
        return false;
    }

    match run_status(program, &["--version"], limit).await {
        Ok(()) => true,
        Err(err) => {
            debug!(program, error = %err, "availability probe failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let result = run_captured(
            "appshelf-definitely-missing-binary",
            &[],
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(result, Err(Error::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_probe_missing_binary_is_false() {
        assert!(!probe("appshelf-definitely-missing-binary", Duration::from_secs(1)).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout() {
        let out = run_captured("sh", &["-c", "echo 'git|2.43.0'"], Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.trim(), "git|2.43.0");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_error() {
        let result = run_captured("sh", &["-c", "echo oops >&2; exit 3"], Duration::from_secs(5)).await;
        match result {
            Err(Error::CommandFailed { detail, .. }) => {
                assert!(detail.contains("exit code 3"));
                assert!(detail.contains("oops"));
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_is_error() {
        let result = run_status("sleep", &["5"], Duration::from_millis(100)).await;
        assert!(matches!(result, Err(Error::Timeout { .. })));
    }
}
