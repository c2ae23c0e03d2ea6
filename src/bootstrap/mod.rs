/// k3s cluster runtime installation
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::InstallerConfig;
use crate::utils::command::{check_tool_installed, CommandBuilder};

/// Runs the remote k3s installer through the local shell
pub struct ClusterBootstrap {
    installer: InstallerConfig,
}

impl ClusterBootstrap {
    pub fn new(installer: InstallerConfig) -> Self {
        Self { installer }
    }

    /// Shell pipeline that downloads the installer and runs it
    pub fn pipeline(&self) -> String {
        format!("curl -sfL {} | sh -", self.installer.url)
    }

    /// Check that the shell and curl are available
    pub async fn check_prerequisites(&self) -> Result<()> {
        check_tool_installed(
            "curl",
            &["--version"],
            "Install curl with your package manager.",
        )
        .await?;
        check_tool_installed(
            &self.installer.shell,
            &["-c", "exit 0"],
            "Set installer.shell to an available shell.",
        )
        .await
    }

    /// Install the cluster runtime. The installer's output is streamed to the
    /// console; a non-zero exit is an error.
    pub async fn install(&self) -> Result<String> {
        info!("Installing k3s from {}", self.installer.url);

        let dir = executable_dir()?;
        let output = run_pipeline(&self.installer.shell, &self.pipeline(), &dir).await?;

        info!("✓ k3s installed");
        Ok(output)
    }
}

/// Directory containing the running executable
pub fn executable_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to resolve the running executable")?;
    exe.parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("Executable {} has no parent directory", exe.display()))
}

async fn run_pipeline(shell: &str, script: &str, dir: &Path) -> Result<String> {
    CommandBuilder::new(shell)
        .arg("-c")
        .arg(script)
        .current_dir(dir)
        .context(format!("Failed to start {}", shell))
        .tee()
        .await?
        .into_result()
        .with_context(|| format!("Installer pipeline failed: {}", script))
}
