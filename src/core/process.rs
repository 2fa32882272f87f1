use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Run `command[0]` with the remaining elements as arguments, returning stdout.
///
/// A non-zero exit is only an error when stderr carries something other than
/// warnings; ccusage prints `WARN` lines to stderr and may still exit non-zero.
pub async fn run_command(command: &[String], timeout: Duration) -> Result<String> {
    let (program, args) = command
        .split_first()
        .context("No command configured")?;
    debug!(program = %program, ?args, "running command");

    let output = tokio::time::timeout(
        timeout,
        tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output(),
    )
    .await
    .context(format!("Command `{}` timed out", program))?
    .context(format!("Failed to execute `{}`", program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() && !stderr.contains("WARN") {
            anyhow::bail!("`{}` exited with {}: {}", program, output.status, stderr);
        }
        debug!(status = %output.status, "ignoring non-zero exit with warnings only");
    }

    let stdout = String::from_utf8(output.stdout)
        .context(format!("Non-UTF8 output from `{}`", program))?;
    Ok(stdout.trim().to_string())
}

/// Check if a binary exists in PATH. Returns the full path if found.
pub fn which(binary: &str) -> Option<PathBuf> {
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(binary))
            .find(|p| p.is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn which_finds_existing_binary() {
        assert!(which("sh").is_some());
    }

    #[test]
    fn which_returns_none_for_nonexistent() {
        assert!(which("totally_nonexistent_binary_xyz").is_none());
    }

    #[tokio::test]
    async fn run_command_echo() {
        let result = run_command(&cmd(&["echo", "hello"]), Duration::from_secs(5)).await;
        assert_eq!(result.unwrap(), "hello");
    }

    #[tokio::test]
    async fn run_command_failure_with_stderr() {
        let result = run_command(
            &cmd(&["sh", "-c", "echo boom >&2; exit 3"]),
            Duration::from_secs(5),
        )
        .await;
        assert!(result.unwrap_err().to_string().contains("boom"));
    }

    #[tokio::test]
    async fn run_command_ignores_warnings_on_failure() {
        let result = run_command(
            &cmd(&["sh", "-c", "echo '[]'; echo 'WARN stale pricing' >&2; exit 1"]),
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(result.unwrap(), "[]");
    }

    #[tokio::test]
    async fn run_command_empty_is_error() {
        assert!(run_command(&[], Duration::from_secs(5)).await.is_err());
    }

    #[tokio::test]
    async fn run_command_times_out() {
        let result = run_command(&cmd(&["sleep", "5"]), Duration::from_millis(50)).await;
        assert!(result.unwrap_err().to_string().contains("timed out"));
    }
}
