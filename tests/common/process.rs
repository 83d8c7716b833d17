//! Running the `ith` binary.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::timeout;

/// A spawned `ith` process, killed if dropped while still running.
pub struct IthProcess {
    child: Child,
}

impl IthProcess {
    /// Spawn `ith` with `args`, from `workdir` so no stray `.env` is picked up.
    pub fn spawn(workdir: &Path, args: &[&str]) -> anyhow::Result<Self> {
        let child = Command::new(env!("CARGO_BIN_EXE_ith"))
            .args(args)
            .current_dir(workdir)
            .env_remove("DISCORD_BOT_TOKEN")
            .env_remove("MY_DISCORD_ID")
            .env("RUST_LOG", "debug")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        Ok(Self { child })
    }

    /// Wait for the process to exit.
    pub async fn wait(&mut self) -> anyhow::Result<ExitStatus> {
        Ok(timeout(Duration::from_secs(15), self.child.wait()).await??)
    }
}
