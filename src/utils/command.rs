/// External command execution
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Result from command execution with captured output
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    /// Create from tokio Command output
    fn from_output(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }
    }
}

/// Output of a command whose streams were echoed to the console while running.
///
/// `combined` holds stdout and stderr interleaved in the order the chunks
/// arrived.
pub struct TeeOutput {
    pub combined: String,
    pub status: ExitStatus,
}

impl TeeOutput {
    /// Return the captured output if the process exited cleanly
    pub fn into_result(self) -> Result<String> {
        if self.status.success() {
            Ok(self.combined)
        } else {
            anyhow::bail!("process exited with {}", self.status)
        }
    }
}

/// Builder for executing external commands with common patterns
pub struct CommandBuilder {
    command: Command,
    context_msg: Option<String>,
}

impl CommandBuilder {
    /// Create a new command builder
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        let mut command = Command::new(program);
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        Self {
            command,
            context_msg: None,
        }
    }

    /// Add a single argument
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.command.arg(arg);
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command.args(args);
        self
    }

    /// Set the working directory of the child
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.command.current_dir(dir);
        self
    }

    /// Set context message for error reporting
    pub fn context<S: Into<String>>(mut self, msg: S) -> Self {
        self.context_msg = Some(msg.into());
        self
    }

    /// Execute and return raw output
    pub async fn output(mut self) -> Result<CommandOutput> {
        let output = if let Some(ctx) = &self.context_msg {
            self.command.output().await.context(ctx.clone())?
        } else {
            self.command.output().await?
        };
        Ok(CommandOutput::from_output(output))
    }

    /// Execute while echoing stdout and stderr to our stdout, keeping a copy
    /// of everything in memory. Waits for the child to exit.
    pub async fn tee(self) -> Result<TeeOutput> {
        self.tee_into(tokio::io::stdout(), tokio::io::stdout()).await
    }

    /// [`tee`](Self::tee) with explicit console writers for each stream.
    ///
    /// If relaying either stream fails the child is killed and reaped before
    /// the error is returned.
    async fn tee_into<O, E>(mut self, out_console: O, err_console: E) -> Result<TeeOutput>
    where
        O: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        let mut child = if let Some(ctx) = &self.context_msg {
            self.command.spawn().context(ctx.clone())?
        } else {
            self.command.spawn()?
        };

        let stdout = child.stdout.take().context("child stdout was not piped")?;
        let stderr = child.stderr.take().context("child stderr was not piped")?;

        let buffer = Mutex::new(Vec::new());
        let relayed = tokio::try_join!(
            pump(stdout, out_console, &buffer),
            pump(stderr, err_console, &buffer),
        );

        if let Err(e) = relayed {
            if let Err(kill_err) = child.kill().await {
                warn!("Failed to stop child after output error: {}", kill_err);
            }
            return Err(e).context("Failed to relay child output");
        }

        let status = child.wait().await.context("Failed to wait for child")?;
        let combined = String::from_utf8_lossy(&buffer.into_inner()).to_string();

        Ok(TeeOutput { combined, status })
    }
}

/// Copy `reader` into `console` chunk by chunk, appending each chunk to `buffer`
async fn pump<R, W>(
    mut reader: R,
    mut console: W,
    buffer: &Mutex<Vec<u8>>,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut chunk = [0u8; 4096];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        console.write_all(&chunk[..n]).await?;
        console.flush().await?;
        buffer.lock().await.extend_from_slice(&chunk[..n]);
    }
}

/// Check if a command-line tool is installed
pub async fn check_tool_installed(
    tool_name: &str,
    version_args: &[&str],
    install_hint: &str,
) -> Result<()> {
    let output = CommandBuilder::new(tool_name)
        .args(version_args)
        .output()
        .await;

    match output {
        Ok(out) if out.success => {
            debug!("{}: {}", tool_name, out.stdout.lines().next().unwrap_or_default());
            Ok(())
        }
        Ok(out) => anyhow::bail!(
            "{} is installed but failed to run: {}. {}",
            tool_name,
            out.stderr.trim(),
            install_hint
        ),
        Err(_) => anyhow::bail!(
            "{} is not installed or not in PATH. {}",
            tool_name,
            install_hint
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context as TaskContext, Poll};

    /// Console whose every write fails, like a closed pipe
    struct ClosedConsole;

    impl AsyncWrite for ClosedConsole {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(
            self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_command_builder_basic() {
        let result = CommandBuilder::new("echo")
            .arg("test")
            .context("Testing echo command")
            .output()
            .await;

        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.success);
        assert!(output.stdout.contains("test"));
    }

    #[tokio::test]
    async fn test_tee_captures_both_streams() {
        let output = CommandBuilder::new("sh")
            .args(["-c", "echo to-stdout; echo to-stderr 1>&2"])
            .tee()
            .await
            .unwrap();

        assert!(output.status.success());
        assert!(output.combined.contains("to-stdout"));
        assert!(output.combined.contains("to-stderr"));
    }

    #[tokio::test]
    async fn test_tee_nonzero_exit_is_error() {
        let output = CommandBuilder::new("sh")
            .args(["-c", "echo partial; exit 3"])
            .tee()
            .await
            .unwrap();

        assert!(output.combined.contains("partial"));
        let err = output.into_result().unwrap_err();
        assert!(err.to_string().contains("exited"));
    }

    #[tokio::test]
    async fn test_tee_console_failure_stops_child() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");

        let result = CommandBuilder::new("sh")
            .args(["-c", "echo started; sleep 2; touch finished"])
            .current_dir(dir.path())
            .tee_into(ClosedConsole, tokio::io::sink())
            .await;

        let err = result.err().unwrap();
        assert!(format!("{:#}", err).contains("Failed to relay child output"));

        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        assert!(!marker.exists(), "child kept running after the console failed");
    }

    #[tokio::test]
    async fn test_current_dir_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let output = CommandBuilder::new("pwd")
            .current_dir(dir.path())
            .output()
            .await
            .unwrap();

        let reported = std::path::PathBuf::from(output.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let result =
            check_tool_installed("definitely-not-a-real-tool-xyz", &["--version"], "Install it.")
                .await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("definitely-not-a-real-tool-xyz"));
    }
}
