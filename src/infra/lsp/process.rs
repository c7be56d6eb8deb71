//! Backend process ownership
//!
//! A [`ProcessHost`] owns one child process (or, in tests, one in-memory pipe
//! pair) and hands its stdio to the router exactly once.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::time::timeout;

use crate::error::LspError;

pub type BoxedReader = Box<dyn AsyncBufRead + Unpin + Send>;
pub type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Resolved command line for a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

impl LaunchSpec {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: cwd.into(),
            env: Vec::new(),
        }
    }

    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// The byte streams of a running backend
pub struct ProcessIo {
    pub reader: BoxedReader,
    pub writer: BoxedWriter,
}

/// Launches backend processes
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self, spec: &LaunchSpec) -> Result<ProcessHost, LspError>;
}

/// Spawns real child processes with piped stdio
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioLauncher;

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> Result<ProcessHost, LspError> {
        ProcessHost::spawn(spec)
    }
}

pub struct ProcessHost {
    label: String,
    child: Option<Child>,
    io: Option<ProcessIo>,
}

impl ProcessHost {
    pub fn spawn(spec: &LaunchSpec) -> Result<Self, LspError> {
        tracing::info!("Spawning {} in {}", spec.display(), spec.cwd.display());

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&spec.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LspError::ServerStart(format!("{}: {}", spec.display(), e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LspError::ServerStart("Failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LspError::ServerStart("Failed to get stdout".to_string()))?;

        let label = spec
            .program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| spec.display());

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(label.clone(), stderr));
        }

        Ok(Self {
            label,
            child: Some(child),
            io: Some(ProcessIo {
                reader: Box::new(BufReader::new(stdout)),
                writer: Box::new(stdin),
            }),
        })
    }

    /// A host without a child process, backed by arbitrary streams
    pub fn detached<R, W>(label: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            label: label.into(),
            child: None,
            io: Some(ProcessIo {
                reader: Box::new(reader),
                writer: Box::new(writer),
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Hand over stdio; returns `None` on the second call
    pub fn take_io(&mut self) -> Option<ProcessIo> {
        self.io.take()
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Exit status if the process already exited
    pub fn try_status(&mut self) -> Option<ExitStatus> {
        self.child.as_mut().and_then(|c| c.try_wait().ok().flatten())
    }

    /// Wait up to `grace` for a voluntary exit, then kill
    pub async fn terminate(&mut self, grace: Duration) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        match timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!("{} exited: {:?}", self.label, status);
            }
            Ok(Err(e)) => {
                tracing::warn!("{} wait error: {}", self.label, e);
            }
            Err(_) => {
                tracing::warn!(
                    "{} did not exit within {:?}, forcing kill",
                    self.label,
                    grace
                );
                let _ = child.kill().await;
            }
        }
    }

    /// Non-blocking kill for drop paths
    pub fn start_kill(&mut self) {
        if let Some(child) = self.child.as_mut()
            && child.start_kill().is_ok()
        {
            tracing::debug!("{} killed", self.label);
        }
    }
}

async fn drain_stderr(label: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!("{} stderr: {}", label, line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_spec_display() {
        let spec = LaunchSpec::new(
            "julia",
            vec!["--startup-file=no".into(), "-e".into(), "run()".into()],
            "/tmp",
        );
        assert_eq!(spec.display(), "julia --startup-file=no -e run()");
    }

    #[tokio::test]
    async fn test_detached_host_hands_io_once() {
        let (a, _b) = tokio::io::duplex(64);
        let (r, w) = tokio::io::split(a);
        let mut host = ProcessHost::detached("fake", BufReader::new(r), w);
        assert!(host.take_io().is_some());
        assert!(host.take_io().is_none());
        assert_eq!(host.pid(), None);
        host.terminate(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn test_spawn_missing_program_is_server_start_error() {
        let spec = LaunchSpec::new("/nonexistent/polylsp-backend", vec![], std::env::temp_dir());
        assert!(matches!(
            ProcessHost::spawn(&spec),
            Err(LspError::ServerStart(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_kills_after_grace() {
        let spec = LaunchSpec::new("sleep", vec!["30".into()], std::env::temp_dir());
        let mut host = ProcessHost::spawn(&spec).unwrap();
        assert!(host.pid().is_some());
        let started = std::time::Instant::now();
        host.terminate(Duration::from_millis(100)).await;
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(host.try_status().is_none());
    }
}
