//! Container runtime seam: the launch flow only talks to [`ContainerRuntime`].
mod memory;
mod podman;
mod spec;

use std::{future::Future, pin::Pin};

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::lib::errors::RuntimeError;

pub use memory::{CopiedArchive, InMemoryRuntime, RuntimeOperation};
pub use podman::{create_args, create_env, render_mount, PodmanCli, DEFAULT_PODMAN_PROGRAM};
pub use spec::{
    ContainerInspection, ContainerSpec, EnvMap, MountKind, MountOption, MountSpec,
    NetworkSettings, PortBinding,
};

/// Read side of an archive streamed into a container.
pub type ArchiveReader = Box<dyn AsyncRead + Send + Unpin>;

/// Accepted copy request; awaiting it streams the archive into the container.
pub type CopyOperation = Pin<Box<dyn Future<Output = Result<(), RuntimeError>> + Send>>;

/// Operations the session launcher needs from a container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create a container and return its id.
    async fn create(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    async fn start(&self, container_id: &str) -> Result<(), RuntimeError>;

    async fn inspect(&self, container_id: &str) -> Result<ContainerInspection, RuntimeError>;

    /// Request an archive extraction at `path` inside the container.
    ///
    /// An error here means the request was refused and nothing was read from
    /// `reader`. The returned operation owns `reader` and drops it once done.
    async fn copy_from_archive(
        &self,
        container_id: &str,
        path: &str,
        reader: ArchiveReader,
    ) -> Result<CopyOperation, RuntimeError>;

    /// Attach the current terminal to the container until it exits.
    async fn attach(&self, container_id: &str) -> Result<(), RuntimeError>;
}
