//! Thin shell-out shim backing `/api/dev/tmux/{status,start,stop}`.
//!
//! Tmux session orchestration itself is an external collaborator the core
//! does not reimplement; this just invokes the `tmux` binary and maps its
//! exit status and stdout into the taxonomy the rest of the service uses.

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmuxStatus {
    pub running: bool,
    pub sessions: Vec<String>,
}

#[async_trait::async_trait]
pub trait TmuxController: Send + Sync {
    async fn status(&self) -> Result<TmuxStatus>;
    async fn start(&self, session: &str) -> Result<()>;
    async fn stop(&self, session: &str) -> Result<()>;
}

pub struct DefaultTmuxController;

#[async_trait::async_trait]
impl TmuxController for DefaultTmuxController {
    async fn status(&self) -> Result<TmuxStatus> {
        let output = Command::new("tmux").arg("list-sessions").output().await;

        match output {
            Ok(output) if output.status.success() => {
                let sessions = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .filter_map(|line| line.split(':').next())
                    .map(str::to_string)
                    .collect();
                Ok(TmuxStatus { running: true, sessions })
            }
            Ok(_) => Ok(TmuxStatus {
                running: false,
                sessions: Vec::new(),
            }),
            Err(e) => Err(Error::service_unavailable(format!("tmux is not available: {e}"), 5)),
        }
    }

    async fn start(&self, session: &str) -> Result<()> {
        let status = Command::new("tmux")
            .args(["new-session", "-d", "-s", session])
            .status()
            .await
            .map_err(|e| Error::service_unavailable(format!("tmux is not available: {e}"), 5))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::internal(format!("tmux new-session exited with {status}")))
        }
    }

    async fn stop(&self, session: &str) -> Result<()> {
        let status = Command::new("tmux")
            .args(["kill-session", "-t", session])
            .status()
            .await
            .map_err(|e| Error::service_unavailable(format!("tmux is not available: {e}"), 5))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::not_found(format!("tmux session `{session}` is not running")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn status_does_not_panic_without_tmux() {
        let controller = DefaultTmuxController;
        let _ = controller.status().await;
    }
}
