//! Kindling provision: the provisioning engine behind [`Provisioner`].
//!
//! [`KindCli`] drives the `kind` binary. Tests substitute their own
//! implementation of the trait.

#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use kindling_config::ClusterSpec;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Everything `create` needs for one attempt.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub name: String,
    pub node_image: String,
    pub kubeconfig_path: Option<PathBuf>,
    /// Block until the control plane is ready, up to this long.
    pub wait: Option<Duration>,
    pub config: Option<ClusterSpec>,
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("command failed: {command} - {message}")]
    CommandFailed { command: String, message: String },

    #[error("failed to render cluster config: {0}")]
    Render(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
pub trait Provisioner: Send + Sync {
    async fn create(&self, opts: &CreateOptions) -> Result<(), ProvisionError>;
    async fn delete(&self, name: &str, kubeconfig_path: Option<&Path>) -> Result<(), ProvisionError>;
    /// Raw kubeconfig document for the cluster.
    async fn kubeconfig(&self, name: &str, internal: bool) -> Result<String, ProvisionError>;
    async fn export_kubeconfig(&self, name: &str, path: &Path) -> Result<(), ProvisionError>;
    async fn list(&self) -> Result<Vec<String>, ProvisionError>;
}

/// The `kind` command line tool.
#[derive(Debug, Clone)]
pub struct KindCli {
    binary: String,
}

impl Default for KindCli {
    fn default() -> Self { Self::new("kind") }
}

impl KindCli {
    pub fn new(binary: impl Into<String>) -> Self { Self { binary: binary.into() } }

    /// Binary from `KINDLING_KIND_BIN`, falling back to `kind` on `PATH`.
    pub fn from_env() -> Self {
        std::env::var("KINDLING_KIND_BIN").ok().filter(|s| !s.is_empty()).map(Self::new).unwrap_or_default()
    }

    pub fn binary(&self) -> &str { &self.binary }

    async fn run(&self, args: &[String], stdin: Option<&str>) -> Result<String, ProvisionError> {
        let command = format!("{} {}", self.binary, args.join(" "));
        debug!(command = %command, "running");
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await?;
            // close so the child sees EOF
            drop(pipe);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(ProvisionError::CommandFailed {
                command,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

fn path_arg(p: &Path) -> String { p.to_string_lossy().into_owned() }

pub fn create_args(opts: &CreateOptions) -> Vec<String> {
    let mut args = vec!["create".to_string(), "cluster".into(), "--name".into(), opts.name.clone()];
    if !opts.node_image.is_empty() {
        args.extend(["--image".into(), opts.node_image.clone()]);
    }
    if let Some(p) = &opts.kubeconfig_path {
        args.extend(["--kubeconfig".into(), path_arg(p)]);
    }
    if let Some(w) = opts.wait {
        args.extend(["--wait".into(), format!("{}s", w.as_secs())]);
    }
    if opts.config.is_some() {
        args.extend(["--config".into(), "-".into()]);
    }
    args
}

pub fn delete_args(name: &str, kubeconfig_path: Option<&Path>) -> Vec<String> {
    let mut args = vec!["delete".to_string(), "cluster".into(), "--name".into(), name.to_string()];
    if let Some(p) = kubeconfig_path {
        args.extend(["--kubeconfig".into(), path_arg(p)]);
    }
    args
}

pub fn kubeconfig_args(name: &str, internal: bool) -> Vec<String> {
    let mut args = vec!["get".to_string(), "kubeconfig".into(), "--name".into(), name.to_string()];
    if internal {
        args.push("--internal".into());
    }
    args
}

pub fn export_args(name: &str, path: &Path) -> Vec<String> {
    vec!["export".to_string(), "kubeconfig".into(), "--name".into(), name.to_string(), "--kubeconfig".into(), path_arg(path)]
}

/// `kind get clusters` prints one name per line.
pub fn parse_cluster_list(stdout: &str) -> Vec<String> {
    stdout.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect()
}

#[async_trait::async_trait]
impl Provisioner for KindCli {
    async fn create(&self, opts: &CreateOptions) -> Result<(), ProvisionError> {
        let config = opts.config.as_ref().map(ClusterSpec::to_yaml).transpose()?;
        self.run(&create_args(opts), config.as_deref()).await.map(|_| ())
    }

    async fn delete(&self, name: &str, kubeconfig_path: Option<&Path>) -> Result<(), ProvisionError> {
        self.run(&delete_args(name, kubeconfig_path), None).await.map(|_| ())
    }

    async fn kubeconfig(&self, name: &str, internal: bool) -> Result<String, ProvisionError> {
        self.run(&kubeconfig_args(name, internal), None).await
    }

    async fn export_kubeconfig(&self, name: &str, path: &Path) -> Result<(), ProvisionError> {
        self.run(&export_args(name, path), None).await.map(|_| ())
    }

    async fn list(&self) -> Result<Vec<String>, ProvisionError> {
        Ok(parse_cluster_list(&self.run(&["get".to_string(), "clusters".into()], None).await?))
    }
}
