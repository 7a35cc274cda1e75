//! [`ContainerRuntime`] driving the `podman` command line.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, warn};

use super::{
    ArchiveReader, ContainerInspection, ContainerRuntime, ContainerSpec, CopyOperation,
    MountKind, MountOption, MountSpec,
};
use crate::lib::errors::RuntimeError;

pub const DEFAULT_PODMAN_PROGRAM: &str = "podman";

/// Exit status podman uses for its own failures, as opposed to the container's.
const PODMAN_OWN_FAILURE: i32 = 125;

#[derive(Debug, Clone)]
pub struct PodmanCli {
    program: PathBuf,
    url: Option<String>,
}

impl Default for PodmanCli {
    fn default() -> Self {
        Self::new(DEFAULT_PODMAN_PROGRAM, None)
    }
}

impl PodmanCli {
    /// `url` is passed as `--url` so a remote or rootless socket can be targeted.
    pub fn new(program: impl Into<PathBuf>, url: Option<String>) -> Self {
        Self {
            program: program.into(),
            url: url.filter(|url| !url.is_empty()),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, subcommand: &str) -> Command {
        let mut command = Command::new(&self.program);
        if let Some(url) = &self.url {
            command.arg("--url").arg(url);
        }
        command.arg(subcommand);
        command
    }

    fn describe(&self, subcommand: &str) -> String {
        format!("{} {subcommand}", self.program.display())
    }

    async fn run(&self, subcommand: &str, mut command: Command) -> Result<String, RuntimeError> {
        command.stdin(Stdio::null()).kill_on_drop(true);
        let output = command.output().await.map_err(|source| RuntimeError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command: self.describe(subcommand),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Arguments of `podman create` for `spec`, subcommand included.
///
/// Environment entries are passed by name only; their values reach podman
/// through the child environment (see [`create_env`]) and never appear in argv.
pub fn create_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = vec!["create".to_string()];
    let flags = [
        (spec.stdin, "--interactive"),
        (spec.terminal, "--tty"),
        (spec.remove, "--rm"),
        (spec.privileged, "--privileged"),
        (spec.publish_exposed_ports, "--publish-all"),
    ];
    args.extend(
        flags
            .iter()
            .filter(|(enabled, _)| *enabled)
            .map(|(_, flag)| flag.to_string()),
    );
    for key in spec.env.keys() {
        args.push("--env".to_string());
        args.push(key.clone());
    }
    for mount in &spec.mounts {
        args.push("--mount".to_string());
        args.push(render_mount(mount));
    }
    args.push(spec.image.clone());
    args
}

/// Environment the `podman create` child needs so that `--env KEY` resolves.
pub fn create_env(spec: &ContainerSpec) -> impl Iterator<Item = (&str, &str)> {
    spec.env
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
}

/// Render a mount in `--mount` syntax.
pub fn render_mount(mount: &MountSpec) -> String {
    let mut rendered = format!("type={}", mount.kind.as_str());
    if let (MountKind::Bind, Some(source)) = (mount.kind, mount.source_path()) {
        rendered.push(',');
        rendered.push_str(&mount_field("source", &source.display().to_string()));
    }
    rendered.push(',');
    rendered.push_str(&mount_field("destination", &mount.destination));
    for option in &mount.options {
        match option {
            MountOption::ReadOnly => rendered.push_str(",ro=true"),
            MountOption::ReadWrite => rendered.push_str(",ro=false"),
        }
    }
    rendered
}

/// `--mount` is read as one CSV record, so fields holding `,` or `"` are quoted.
fn mount_field(key: &str, value: &str) -> String {
    let field = format!("{key}={value}");
    if field.contains(&[',', '"'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field
    }
}

#[async_trait]
impl ContainerRuntime for PodmanCli {
    async fn create(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let args = create_args(spec);
        let mut command = self.command("create");
        command.args(&args[1..]).envs(create_env(spec));
        debug!(
            target: "occ::runtime",
            program = %self.program.display(),
            image = %spec.image,
            mounts = spec.mounts.len(),
            "Creating container"
        );
        let id = self.run("create", command).await?;
        let id = id.lines().last().unwrap_or_default().trim().to_string();
        if id.is_empty() {
            return Err(RuntimeError::Failed {
                operation: "create",
                message: "podman did not report a container id".into(),
            });
        }
        Ok(id)
    }

    async fn start(&self, container_id: &str) -> Result<(), RuntimeError> {
        let mut command = self.command("start");
        command.arg(container_id);
        self.run("start", command).await.map(|_| ())
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerInspection, RuntimeError> {
        let mut command = self.command("container");
        command
            .arg("inspect")
            .arg("--format")
            .arg("json")
            .arg(container_id);
        let stdout = self.run("container inspect", command).await?;
        let inspections: Vec<ContainerInspection> =
            serde_json::from_str(&stdout).map_err(|source| RuntimeError::Decode {
                command: self.describe("container inspect"),
                source,
            })?;
        inspections
            .into_iter()
            .next()
            .ok_or_else(|| RuntimeError::Failed {
                operation: "inspect",
                message: format!("no container named {container_id}"),
            })
    }

    async fn copy_from_archive(
        &self,
        container_id: &str,
        path: &str,
        mut reader: ArchiveReader,
    ) -> Result<CopyOperation, RuntimeError> {
        let mut command = self.command("cp");
        command
            .arg("-")
            .arg(format!("{container_id}:{path}"))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let mut child = command.spawn().map_err(|source| RuntimeError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;
        let mut stdin = child.stdin.take().ok_or_else(|| RuntimeError::Failed {
            operation: "copy",
            message: "podman cp stdin was not captured".into(),
        })?;
        let description = self.describe("cp");

        Ok(Box::pin(async move {
            let streamed = async {
                tokio::io::copy(&mut reader, &mut stdin).await?;
                stdin.shutdown().await
            }
            .await;
            drop(stdin);
            drop(reader);

            let output = child
                .wait_with_output()
                .await
                .map_err(|source| RuntimeError::Io {
                    context: "waiting for podman cp",
                    source,
                })?;
            if !output.status.success() {
                return Err(RuntimeError::CommandFailed {
                    command: description,
                    exit_code: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
            streamed.map_err(|source| RuntimeError::Io {
                context: "streaming archive into podman cp",
                source,
            })
        }))
    }

    async fn attach(&self, container_id: &str) -> Result<(), RuntimeError> {
        let mut command = self.command("attach");
        command
            .arg(container_id)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        let status = command.status().await.map_err(|source| RuntimeError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        match status.code() {
            Some(0) => Ok(()),
            Some(PODMAN_OWN_FAILURE) => Err(RuntimeError::CommandFailed {
                command: self.describe("attach"),
                exit_code: Some(PODMAN_OWN_FAILURE),
                stderr: String::new(),
            }),
            code => {
                warn!(
                    target: "occ::runtime",
                    container_id,
                    exit_code = ?code,
                    "Container session exited with a non-zero status"
                );
                Ok(())
            }
        }
    }
}
