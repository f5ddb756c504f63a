//! The static-site server subprocess.
//!
//! The checker does not serve files itself; it launches the project's
//! `serve.js` with the project directory as working directory, waits for the
//! script to announce readiness (a log line containing `Serving`), and kills
//! it when the run ends.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context as _};
use log::{debug, info};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);
const READY_MARKER: &str = "Serving";

pub struct StaticServer {
    child: tokio::process::Child,
}

impl StaticServer {
    /// Spawn `script` with CWD `projdir` and wait until it reports ready.
    pub async fn launch(script: &Path, projdir: &Path) -> anyhow::Result<Self> {
        let mut child = Command::new(script)
            .current_dir(projdir)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to launch {}", script.display()))?;

        let stdout = child
            .stdout
            .take()
            .context("server subprocess has no stdout")?;
        let mut lines = BufReader::new(stdout).lines();

        let ready = tokio::time::timeout(STARTUP_TIMEOUT, async {
            while let Some(line) = lines.next_line().await? {
                debug!(target: "sitecheck::server", "{line}");
                if line.contains(READY_MARKER) {
                    return Ok::<bool, std::io::Error>(true);
                }
            }
            Ok(false)
        })
        .await;

        match ready {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => bail!("server exited before reporting '{READY_MARKER}'"),
            Ok(Err(e)) => return Err(e).context("failed reading server output"),
            Err(_) => bail!(
                "server did not report '{READY_MARKER}' within {}s",
                STARTUP_TIMEOUT.as_secs()
            ),
        }
        info!(target: "sitecheck::server", "static server is up");

        // Keep draining so the subprocess never blocks on a full pipe.
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "sitecheck::server", "{line}");
            }
        });

        Ok(Self { child })
    }

    pub async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            debug!(target: "sitecheck::server", "kill failed (already gone?): {e}");
        }
    }
}
