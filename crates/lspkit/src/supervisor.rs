//! Server Supervisor: selects a runtime (local / container /
//! socket), spawns it, and implements the fallback chain and teardown.

use crate::transport::{DynReader, DynWriter};
use async_trait::async_trait;
use lspkit_core::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Child;

/// Set to a truthy value to forbid local runtimes from auto-installing a
/// missing server binary.
pub const NO_AUTO_INSTALL_ENV: &str = "LSPKIT_NO_AUTO_INSTALL";

pub fn auto_install_allowed() -> bool {
    match std::env::var(NO_AUTO_INSTALL_ENV) {
        Ok(v) => !matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"),
        Err(_) => true,
    }
}

/// What backs a spawned server, for teardown purposes. Socket runtimes have
/// nothing to reap beyond closing the connection.
enum Backing {
    Process(Child),
    None,
}

/// A live connection to a server: the Transport's raw I/O plus whatever is
/// needed to tear the server down on scope exit.
pub struct RunningServer {
    pub reader: DynReader,
    pub writer: DynWriter,
    backing: Backing,
    stderr_drain: Option<tokio::task::JoinHandle<()>>,
}

impl RunningServer {
    fn from_child(mut child: Child) -> Result<Self> {
        let stdin = child.stdin.take().ok_or_else(|| Error::ServerRuntime("no stdin pipe".into()))?;
        let stdout = child.stdout.take().ok_or_else(|| Error::ServerRuntime("no stdout pipe".into()))?;
        let stderr = child.stderr.take();

        // Drain stderr concurrently so a chatty server never deadlocks on a
        // full pipe.
        let stderr_drain = stderr.map(|stderr| {
            tokio::spawn(async move {
                use tokio::io::{AsyncBufReadExt, BufReader};
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "lspkit::server_stderr", "{line}");
                }
            })
        });

        Ok(Self {
            reader: Box::pin(stdout),
            writer: Box::pin(stdin),
            backing: Backing::Process(child),
            stderr_drain,
        })
    }

    /// Wrap an already-connected duplex pair (a socket, or anything else
    /// `AsyncRead + AsyncWrite`) with nothing to reap beyond closing it.
    /// Public so a custom [`ServerRuntime`] backed by its own connection
    /// type can produce a `RunningServer` without reimplementing
    /// `Backing::None` teardown.
    pub fn from_socket<R, W>(reader: R, writer: W) -> Self
    where
        R: tokio::io::AsyncRead + Send + Unpin + 'static,
        W: tokio::io::AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::pin(reader),
            writer: Box::pin(writer),
            backing: Backing::None,
            stderr_drain: None,
        }
    }

    /// Two-phase teardown: close the writer to signal the server, wait up
    /// to `grace`, then terminate, then a second grace period before kill.
    pub async fn teardown(mut self, grace: Duration) -> Result<()> {
        let _ = self.writer.shutdown().await;
        if let Some(handle) = self.stderr_drain.take() {
            handle.abort();
        }
        match self.backing {
            Backing::None => Ok(()),
            Backing::Process(mut child) => {
                match tokio::time::timeout(grace, child.wait()).await {
                    Ok(_) => Ok(()),
                    Err(_) => {
                        let _ = child.start_kill();
                        match tokio::time::timeout(grace, child.wait()).await {
                            Ok(_) => Ok(()),
                            Err(_) => {
                                let _ = child.kill().await;
                                Ok(())
                            }
                        }
                    }
                }
            }
        }
    }
}

/// A candidate way to obtain a server connection. Built-in implementations
/// cover local process, container, and socket runtimes; a collaborator
/// may also supply its own.
#[async_trait]
pub trait ServerRuntime: Send + Sync {
    fn name(&self) -> String;

    /// Cheap availability check; used to order candidates, not required
    /// before `spawn`.
    async fn probe(&self) -> bool {
        true
    }

    async fn spawn(&self) -> Result<RunningServer>;
}

fn command_exists(program: &str) -> bool {
    let path = std::path::Path::new(program);
    if path.is_absolute() {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| dir.join(program).is_file())
        })
        .unwrap_or(false)
}

/// Hook invoked when a local runtime's binary is missing and auto-install
/// is allowed.
pub type InstallHook = std::sync::Arc<dyn Fn() -> futures::future::BoxFuture<'static, Result<()>> + Send + Sync>;

/// Spawn the server as a local child process with piped stdio.
pub struct LocalRuntime {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub ensure_installed: Option<InstallHook>,
    pub auto_install: bool,
}

impl LocalRuntime {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: None,
            ensure_installed: None,
            auto_install: auto_install_allowed(),
        }
    }
}

#[async_trait]
impl ServerRuntime for LocalRuntime {
    fn name(&self) -> String {
        format!("local:{}", self.program)
    }

    async fn probe(&self) -> bool {
        command_exists(&self.program)
    }

    async fn spawn(&self) -> Result<RunningServer> {
        if !self.probe().await {
            if !self.auto_install {
                return Err(Error::ServerRuntime(format!(
                    "{} not found on PATH and auto-install is disabled",
                    self.program
                )));
            }
            match &self.ensure_installed {
                Some(hook) => hook().await.map_err(|e| Error::ServerInstallation(e.to_string()))?,
                None => {
                    return Err(Error::ServerInstallation(format!(
                        "{} not found and no install hook was provided",
                        self.program
                    )))
                }
            }
        }

        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        let child = command
            .spawn()
            .map_err(|e| Error::ServerRuntime(format!("failed to spawn {}: {e}", self.program)))?;
        RunningServer::from_child(child)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerBackend {
    Docker,
    Podman,
}

impl ContainerBackend {
    fn program(self) -> &'static str {
        match self {
            ContainerBackend::Docker => "docker",
            ContainerBackend::Podman => "podman",
        }
    }
}

/// Run the server inside a container image, mounting workspace paths.
pub struct ContainerRuntime {
    pub backend: ContainerBackend,
    pub image: String,
    pub mounts: Vec<(PathBuf, String)>,
    pub command: Vec<String>,
}

#[async_trait]
impl ServerRuntime for ContainerRuntime {
    fn name(&self) -> String {
        format!("container:{}:{}", self.backend.program(), self.image)
    }

    async fn probe(&self) -> bool {
        command_exists(self.backend.program())
    }

    async fn spawn(&self) -> Result<RunningServer> {
        if !self.probe().await {
            return Err(Error::ServerRuntime(format!(
                "{} is not installed",
                self.backend.program()
            )));
        }
        let mut args: Vec<String> = vec!["run".into(), "--rm".into(), "-i".into()];
        for (host, container) in &self.mounts {
            args.push("-v".into());
            args.push(format!("{}:{}", host.display(), container));
        }
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());

        let child = tokio::process::Command::new(self.backend.program())
            .args(&args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| Error::ServerRuntime(format!("failed to run container: {e}")))?;
        RunningServer::from_child(child)
    }
}

#[derive(Debug, Clone)]
pub enum SocketAddress {
    Tcp(std::net::SocketAddr),
    #[cfg(unix)]
    Unix(PathBuf),
}

/// Connect to a server already listening on a TCP or Unix socket, retrying
/// with exponential backoff up to `deadline`.
pub struct SocketRuntime {
    pub address: SocketAddress,
    pub initial_backoff: Duration,
    pub deadline: Duration,
}

#[async_trait]
impl ServerRuntime for SocketRuntime {
    fn name(&self) -> String {
        match &self.address {
            SocketAddress::Tcp(addr) => format!("socket:tcp:{addr}"),
            #[cfg(unix)]
            SocketAddress::Unix(path) => format!("socket:unix:{}", path.display()),
        }
    }

    async fn spawn(&self) -> Result<RunningServer> {
        let start = tokio::time::Instant::now();
        let mut backoff = self.initial_backoff;
        loop {
            let attempt = match &self.address {
                SocketAddress::Tcp(addr) => tokio::net::TcpStream::connect(addr)
                    .await
                    .map(|s| {
                        let (r, w) = s.into_split();
                        RunningServer::from_socket(r, w)
                    }),
                #[cfg(unix)]
                SocketAddress::Unix(path) => tokio::net::UnixStream::connect(path)
                    .await
                    .map(|s| {
                        let (r, w) = s.into_split();
                        RunningServer::from_socket(r, w)
                    }),
            };
            match attempt {
                Ok(server) => return Ok(server),
                Err(e) => {
                    if start.elapsed() + backoff > self.deadline {
                        return Err(Error::ServerRuntime(format!(
                            "could not connect to {}: {e}",
                            self.name()
                        )));
                    }
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }
}

/// Ordered list of candidates, tried until one spawns successfully.
pub struct FallbackChain {
    candidates: Vec<Box<dyn ServerRuntime>>,
}

impl FallbackChain {
    pub fn new(candidates: Vec<Box<dyn ServerRuntime>>) -> Self {
        Self { candidates }
    }

    /// Default order: user-supplied server, then local-with-probe, then
    /// container, then local-with-auto-install.
    pub fn with_defaults(
        user_supplied: Option<Box<dyn ServerRuntime>>,
        local: LocalRuntime,
        container: Option<ContainerRuntime>,
    ) -> Self {
        let mut candidates: Vec<Box<dyn ServerRuntime>> = Vec::new();
        if let Some(user) = user_supplied {
            candidates.push(user);
        }
        let mut probing_local = LocalRuntime {
            program: local.program.clone(),
            args: local.args.clone(),
            cwd: local.cwd.clone(),
            ensure_installed: None,
            auto_install: false,
        };
        probing_local.auto_install = false;
        candidates.push(Box::new(probing_local));
        if let Some(container) = container {
            candidates.push(Box::new(container));
        }
        candidates.push(Box::new(local));
        Self::new(candidates)
    }

    /// Try each candidate in order; the first whose `spawn` succeeds wins
    /// and the rest are never instantiated. If all fail, return an
    /// aggregate error naming every attempt's cause.
    pub async fn spawn_first_available(&self) -> Result<RunningServer> {
        let mut causes = Vec::new();
        for candidate in &self.candidates {
            match candidate.spawn().await {
                Ok(server) => return Ok(server),
                Err(e) => {
                    tracing::debug!("lspkit: candidate {} failed: {e}", candidate.name());
                    causes.push(format!("{}: {e}", candidate.name()));
                }
            }
        }
        Err(Error::AllCandidatesFailed(causes.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFails;
    #[async_trait]
    impl ServerRuntime for AlwaysFails {
        fn name(&self) -> String {
            "always-fails".into()
        }
        async fn spawn(&self) -> Result<RunningServer> {
            Err(Error::ServerRuntime("nope".into()))
        }
    }

    struct AlwaysSucceeds;
    #[async_trait]
    impl ServerRuntime for AlwaysSucceeds {
        fn name(&self) -> String {
            "always-succeeds".into()
        }
        async fn spawn(&self) -> Result<RunningServer> {
            let (a, b) = tokio::io::duplex(64);
            let (r, w) = tokio::io::split(a);
            drop(b);
            Ok(RunningServer::from_socket(r, w))
        }
    }

    #[tokio::test]
    async fn fallback_chain_skips_failing_candidates() {
        let chain = FallbackChain::new(vec![Box::new(AlwaysFails), Box::new(AlwaysSucceeds)]);
        let server = chain.spawn_first_available().await.unwrap();
        server.teardown(Duration::from_millis(50)).await.unwrap();
    }

    #[tokio::test]
    async fn fallback_chain_reports_aggregate_when_all_fail() {
        let chain = FallbackChain::new(vec![Box::new(AlwaysFails), Box::new(AlwaysFails)]);
        let err = chain.spawn_first_available().await.unwrap_err();
        match err {
            Error::AllCandidatesFailed(msg) => assert_eq!(msg.matches("nope").count(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn command_exists_finds_a_real_binary() {
        assert!(command_exists("sh") || command_exists("cmd.exe"));
        assert!(!command_exists("definitely-not-a-real-binary-xyz"));
    }
}
