// src/pipeline/transform/exec.rs

//! Pipe each file through an external shell command.
//!
//! The file contents go to the command's stdin and its stdout replaces them.
//! A non-zero exit fails the stage with the command's stderr as the message.

use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::errors::TransformError;
use crate::pipeline::fileset::FileSet;

use super::{Transform, TransformContext, TransformFuture};

const STAGE: &str = "exec";

#[derive(Debug, Clone)]
pub struct Exec {
    cmd: String,
    extension: Option<String>,
}

impl Exec {
    pub fn new(cmd: &str, extension: Option<String>) -> Self {
        Self {
            cmd: cmd.to_string(),
            extension,
        }
    }

    fn command(&self) -> Command {
        // Build a shell command appropriate for the platform.
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        }
    }

    async fn run_one(
        &self,
        input: Vec<u8>,
        file: &Path,
        ctx: &TransformContext,
    ) -> Result<Vec<u8>, TransformError> {
        let fail = |msg: String| TransformError::new(STAGE, file, msg);

        let mut cmd = self.command();
        cmd.current_dir(&ctx.root)
            .env("ASSETFLOW_FILE", file)
            .env("ASSETFLOW_TASK", &ctx.task)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| fail(format!("spawning `{}`: {e}", self.cmd)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| fail("child stdin unavailable".into()))?;
        // Feed stdin concurrently so a command that writes before reading
        // all input cannot deadlock on a full pipe.
        let writer = tokio::spawn(async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| fail(format!("waiting for `{}`: {e}", self.cmd)))?;

        if let Ok(Err(e)) = writer.await {
            debug!(cmd = %self.cmd, error = %e, "stdin closed early");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output.status.code().unwrap_or(-1);
            return Err(fail(format!(
                "`{}` exited with code {code}: {}",
                self.cmd,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl Transform for Exec {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply<'a>(&'a self, files: FileSet, ctx: &'a TransformContext) -> TransformFuture<'a> {
        Box::pin(async move {
            let mut out = FileSet::new();
            for mut entry in files {
                let input = std::mem::take(&mut entry.contents);
                entry.contents = self.run_one(input, &entry.origin, ctx).await?;
                if let Some(ext) = &self.extension {
                    entry.relative.set_extension(ext.trim_start_matches('.'));
                }
                out.push(entry);
            }
            Ok(out)
        })
    }
}
