//! Remote script execution for allow-listed Discord users.
//!
//! The script is written to a fresh temporary file, run once with output
//! captured and a timeout enforced, and the file is removed afterwards
//! whatever the outcome.

use crate::error::RpcError;
use serde::Deserialize;
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Longest message Discord accepts, in characters.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Characters a fenced section adds around its body: "\n```\n" and "\n```".
const FENCE_OVERHEAD: usize = 9;

const ELLIPSIS: char = '…';

/// Who may run scripts, and how.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RpcPolicy {
    /// Off unless explicitly enabled.
    pub enabled: bool,
    /// Leading word that marks a message as a script.
    pub prefix: String,
    /// Discord user ids allowed to run scripts.
    pub allowed_users: Vec<u64>,
    pub timeout_secs: u64,
    /// Interpreter for scripts without a `#!` line.
    pub shell: String,
}

impl Default for RpcPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            prefix: "!rpc".to_string(),
            allowed_users: Vec::new(),
            timeout_secs: 60,
            shell: "sh".to_string(),
        }
    }
}

impl RpcPolicy {
    pub fn is_allowed(&self, user_id: u64) -> bool {
        self.enabled && self.allowed_users.contains(&user_id)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Script text of an RPC message: the prefix removed, and a surrounding
    /// code fence unwrapped if present.
    pub fn parse_script(&self, body: &str) -> Result<String, RpcError> {
        let rest = body.strip_prefix(self.prefix.as_str()).unwrap_or(body).trim();
        let script = strip_code_fence(rest);
        if script.trim().is_empty() {
            return Err(RpcError::Empty);
        }
        Ok(script.to_string())
    }
}

/// Unwrap ```` ```lang\n...\n``` ```` or `` `...` ``.
fn strip_code_fence(text: &str) -> &str {
    if text.len() >= 6 && text.starts_with("```") && text.ends_with("```") {
        let inner = &text[3..text.len() - 3];
        return match inner.split_once('\n') {
            // A first line without whitespace is a language tag.
            Some((tag, rest)) if !tag.contains(char::is_whitespace) => rest,
            _ => inner,
        };
    }
    if text.len() >= 2 && text.starts_with('`') && text.ends_with('`') {
        return &text[1..text.len() - 1];
    }
    text
}

/// A finished script run.
#[derive(Debug, Clone)]
pub struct RpcJob {
    pub script: String,
    /// Where the script was written; removed by the time the job is returned.
    pub script_path: PathBuf,
    /// `-1` when the process was killed by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RpcJob {
    /// Reply text: the exit code, then fenced stdout and stderr when present,
    /// truncated to fit one Discord message.
    pub fn transcript(&self) -> String {
        let header = format!("exit code: {}", self.exit_code);
        let stdout = self.stdout.trim_end_matches(['\r', '\n']);
        let stderr = self.stderr.trim_end_matches(['\r', '\n']);

        let sections: Vec<&str> = [stdout, stderr]
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect();
        if sections.is_empty() {
            return header;
        }

        let available = DISCORD_MESSAGE_LIMIT
            .saturating_sub(header.chars().count() + sections.len() * FENCE_OVERHEAD);
        let limits = share_budget(&sections, available);

        let mut out = header;
        for (section, limit) in sections.iter().zip(limits) {
            out.push_str("\n```\n");
            out.push_str(&truncate(section, limit));
            out.push_str("\n```");
        }
        out
    }
}

/// Split `available` characters between sections; a section shorter than
/// its even share leaves the rest to the others.
fn share_budget(sections: &[&str], available: usize) -> Vec<usize> {
    let lengths: Vec<usize> = sections.iter().map(|s| s.chars().count()).collect();
    let mut limits = vec![0; lengths.len()];
    let mut order: Vec<usize> = (0..lengths.len()).collect();
    order.sort_by_key(|&i| lengths[i]);

    let mut remaining = available;
    for (pos, &i) in order.iter().enumerate() {
        let share = remaining / (order.len() - pos);
        limits[i] = lengths[i].min(share);
        remaining -= limits[i];
    }
    limits
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(limit - 1).collect();
    out.push(ELLIPSIS);
    out
}

/// Run `script` once under `policy`.
///
/// A non-zero exit code is a successful run; only failing to start the
/// script, or running past the timeout, is an error.
pub async fn run_script(script: &str, policy: &RpcPolicy) -> Result<RpcJob, RpcError> {
    let mut file = tempfile::Builder::new()
        .prefix("ith-rpc-")
        .suffix(".sh")
        .tempfile()
        .map_err(RpcError::Prepare)?;
    file.write_all(script.as_bytes()).map_err(RpcError::Prepare)?;
    if !script.ends_with('\n') {
        file.write_all(b"\n").map_err(RpcError::Prepare)?;
    }
    file.flush().map_err(RpcError::Prepare)?;

    // Closing the handle first: a file still open for writing cannot be exec'd.
    let path = file.into_temp_path();
    make_executable(&path)?;

    let mut command = if script.starts_with("#!") {
        Command::new(&*path)
    } else {
        let mut command = Command::new(&policy.shell);
        command.arg(&*path);
        command
    };
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(path = %path.display(), "Running RPC script");
    let child = command.spawn().map_err(RpcError::Spawn)?;
    let timeout = policy.timeout();
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| RpcError::Timeout(timeout))?
        .map_err(RpcError::Spawn)?;

    let script_path = path.to_path_buf();
    if let Err(e) = path.close() {
        warn!(path = %script_path.display(), error = %e, "Failed to remove RPC script");
    }

    let job = RpcJob {
        script: script.to_string(),
        script_path,
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    debug!(
        exit_code = job.exit_code,
        stdout_len = job.stdout.len(),
        stderr_len = job.stderr.len(),
        "RPC script finished"
    );
    Ok(job)
}

#[cfg(unix)]
fn make_executable(path: &std::path::Path) -> Result<(), RpcError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).map_err(RpcError::Prepare)
}

#[cfg(not(unix))]
fn make_executable(_path: &std::path::Path) -> Result<(), RpcError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RpcPolicy {
        RpcPolicy {
            enabled: true,
            allowed_users: vec![42],
            timeout_secs: 5,
            ..RpcPolicy::default()
        }
    }

    #[test]
    fn test_policy_defaults_disabled() {
        let policy = RpcPolicy::default();
        assert!(!policy.enabled);
        assert_eq!(policy.prefix, "!rpc");
        assert!(!policy.is_allowed(42));
    }

    #[test]
    fn test_allow_list() {
        let policy = policy();
        assert!(policy.is_allowed(42));
        assert!(!policy.is_allowed(7));
    }

    #[test]
    fn test_parse_script() {
        let policy = policy();
        assert_eq!(policy.parse_script("!rpc echo hi").unwrap(), "echo hi");
        assert_eq!(
            policy.parse_script("!rpc\n```sh\necho hi\nls\n```").unwrap(),
            "echo hi\nls\n"
        );
        assert_eq!(policy.parse_script("!rpc ```\nuptime\n```").unwrap(), "uptime\n");
        assert_eq!(policy.parse_script("!rpc `date`").unwrap(), "date");
        assert!(matches!(policy.parse_script("!rpc"), Err(RpcError::Empty)));
        assert!(matches!(policy.parse_script("!rpc ``` ```"), Err(RpcError::Empty)));
    }

    #[test]
    fn test_transcript_sections() {
        let job = RpcJob {
            script: String::new(),
            script_path: PathBuf::new(),
            exit_code: 2,
            stdout: "out\n".into(),
            stderr: "err\n".into(),
        };
        assert_eq!(job.transcript(), "exit code: 2\n```\nout\n```\n```\nerr\n```");

        let quiet = RpcJob {
            stdout: String::new(),
            stderr: String::new(),
            ..job
        };
        assert_eq!(quiet.transcript(), "exit code: 2");
    }

    #[test]
    fn test_transcript_fits_discord_limit() {
        let job = RpcJob {
            script: String::new(),
            script_path: PathBuf::new(),
            exit_code: 0,
            stdout: "x".repeat(5000),
            stderr: "short".into(),
        };
        let transcript = job.transcript();
        assert_eq!(transcript.chars().count(), DISCORD_MESSAGE_LIMIT);
        assert!(transcript.contains("```\nshort\n```"));
        assert!(transcript.contains(ELLIPSIS));
    }

    #[tokio::test]
    async fn test_run_echo() {
        let job = run_script("echo hi", &policy()).await.unwrap();
        assert_eq!(job.exit_code, 0);
        assert_eq!(job.stdout, "hi\n");

        let transcript = job.transcript();
        assert!(transcript.contains("exit code: 0"));
        assert!(transcript.contains("```\nhi\n```"));
        assert!(!job.script_path.exists());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let job = run_script("echo oops >&2\nexit 3", &policy()).await.unwrap();
        assert_eq!(job.exit_code, 3);
        assert_eq!(job.stderr, "oops\n");
        assert!(job.transcript().starts_with("exit code: 3\n```\noops\n```"));
        assert!(!job.script_path.exists());
    }

    #[tokio::test]
    async fn test_script_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("runs");
        let script = format!("echo run >> '{}'", counter.display());

        run_script(&script, &policy()).await.unwrap();

        let runs = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(runs.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_removes_script() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("path");
        let script = format!("echo \"$0\" > '{}'\nsleep 10", marker.display());
        let policy = RpcPolicy {
            timeout_secs: 1,
            ..policy()
        };

        let err = run_script(&script, &policy).await.unwrap_err();
        assert!(matches!(err, RpcError::Timeout(_)));

        let script_path = std::fs::read_to_string(&marker).unwrap();
        assert!(!std::path::Path::new(script_path.trim()).exists());
    }

    #[tokio::test]
    async fn test_missing_shell_is_spawn_error() {
        let policy = RpcPolicy {
            shell: "/nonexistent/shell".into(),
            ..policy()
        };
        let err = run_script("echo hi", &policy).await.unwrap_err();
        assert!(matches!(err, RpcError::Spawn(_)));
    }
}
