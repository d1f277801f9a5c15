//! Starting a downloaded artifact as an independent process.

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use crate::error::DownloadError;

/// Invoked once with the launched process' exit status.
pub type ExitCallback = Box<dyn FnOnce(io::Result<ExitStatus>) + Send + 'static>;

pub trait Launcher: Send + Sync {
    /// Start `artifact` with `args`. Returns once the process is spawned; if
    /// `on_exit` is given it fires from a helper thread when the process exits.
    fn launch(
        &self,
        artifact: &Path,
        packaging: &str,
        args: &[String],
        on_exit: Option<ExitCallback>,
    ) -> Result<(), DownloadError>;
}

/// Spawns `java -jar <artifact>` for jars and the artifact itself otherwise.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    pub java_command: String,
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self {
            java_command: "java".to_string(),
        }
    }
}

impl ProcessLauncher {
    pub fn new(java_command: impl Into<String>) -> Self {
        Self {
            java_command: java_command.into(),
        }
    }

    pub fn command(&self, artifact: &Path, packaging: &str, args: &[String]) -> Command {
        let mut cmd = if packaging.eq_ignore_ascii_case("jar") {
            let mut c = Command::new(&self.java_command);
            c.arg("-jar").arg(artifact);
            c
        } else {
            Command::new(artifact)
        };
        cmd.args(args);
        if let Some(dir) = artifact.parent() {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd
    }
}

impl Launcher for ProcessLauncher {
    fn launch(
        &self,
        artifact: &Path,
        packaging: &str,
        args: &[String],
        on_exit: Option<ExitCallback>,
    ) -> Result<(), DownloadError> {
        let mut child = self
            .command(artifact, packaging, args)
            .spawn()
            .map_err(|e| DownloadError::io(artifact, e))?;
        tracing::info!(path = %artifact.display(), pid = child.id(), "launched");

        // Reap the child; the exit callback runs on the same thread.
        std::thread::Builder::new()
            .name(format!("launch-wait-{}", child.id()))
            .spawn(move || {
                let status = child.wait();
                if let Ok(s) = &status {
                    tracing::debug!(status = %s, "launched process exited");
                }
                if let Some(cb) = on_exit {
                    cb(status);
                }
            })
            .map_err(|e| DownloadError::io(artifact, e))?;
        Ok(())
    }
}
