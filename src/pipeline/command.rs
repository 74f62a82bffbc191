// src/pipeline/command.rs

//! External command filters used by `lint`, `compile` and `minify` steps.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::RunContext;

/// Feed `input` to `command` on stdin and return its stdout.
///
/// The command runs through the platform shell in the project root, with the
/// run context exported (`ASSETDAG_ENV`, `ASSETDAG_COMPRESS`,
/// `ASSETDAG_ASSETS`) plus `ASSETDAG_FILE` naming the file being processed.
/// A non-zero exit is an error carrying the command's stderr.
pub async fn run_filter(
    command: &str,
    input: &[u8],
    source: &Path,
    ctx: &RunContext,
) -> Result<Vec<u8>> {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };

    cmd.current_dir(ctx.project_root())
        .envs(ctx.command_env())
        .env("ASSETDAG_FILE", source)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(cmd = %command, file = ?source, "running filter command");

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning `{command}`"))?;

    // Feed stdin from a separate task so a command that writes before it has
    // read everything cannot deadlock us.
    if let Some(mut stdin) = child.stdin.take() {
        let input = input.to_vec();
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&input).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    warn!(error = %e, "failed to write filter stdin");
                }
            }
        });
    }

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for `{command}`"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output.status.code().unwrap_or(-1);
        bail!("`{command}` exited with status {code}: {}", stderr.trim());
    }

    Ok(output.stdout)
}
