//! Session launcher: assembles the container spec, runs the container and
//! hands the terminal over to it.
pub mod agent;
pub mod env;
pub mod mounts;
pub mod relay;

use std::{
    env as std_env,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{info, Instrument};

use crate::{
    config::OccConfig,
    lib::{
        archive::HostArchiver,
        errors::LaunchError,
        fs::{FileSystemRead, FileSystemWrite},
        paths::resolve_home_dir,
        platform::Platform,
        telemetry::{self, SessionLaunchTelemetry, SessionSpan},
    },
    runtime::{ContainerRuntime, ContainerSpec},
};

pub use agent::{locate_agent, LAUNCHD_AGENT_MARKER};
pub use env::build_env;
pub use mounts::{build_mounts, MountInputs, MAC_PRIVATE_TEMP_DIR};
pub use relay::{copy_portmap, write_portmap, RelayOutcome};

/// Repository of the session image; the tag is chosen per launch.
pub const IMAGE_REPOSITORY: &str = "localhost/ocm-container";

pub fn image_reference(tag: &str) -> String {
    format!("{IMAGE_REPOSITORY}:{tag}")
}

/// What the user asked for on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub config_path: PathBuf,
    /// Positional arguments; the first one names the cluster to log into.
    pub args: Vec<String>,
    pub tag: String,
    pub disable_console_port: bool,
}

/// Facts about the host taken from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    pub home_dir: Option<PathBuf>,
    /// Host `SSH_AUTH_SOCK`, empty when unset.
    pub ssh_auth_sock: PathBuf,
    pub platform: Platform,
    pub platform_temp_dir: PathBuf,
}

impl HostContext {
    pub fn from_env() -> Self {
        Self {
            home_dir: resolve_home_dir(),
            ssh_auth_sock: std_env::var_os("SSH_AUTH_SOCK")
                .map(PathBuf::from)
                .unwrap_or_default(),
            platform: Platform::current(),
            platform_temp_dir: PathBuf::from(MAC_PRIVATE_TEMP_DIR),
        }
    }
}

pub struct SessionLauncher<R, FR, FW> {
    runtime: R,
    fs_read: FR,
    fs_write: FW,
    archiver: Arc<dyn HostArchiver>,
    host: HostContext,
}

impl<R, FR, FW> SessionLauncher<R, FR, FW>
where
    R: ContainerRuntime,
    FR: FileSystemRead,
    FW: FileSystemWrite,
{
    pub fn new(
        runtime: R,
        fs_read: FR,
        fs_write: FW,
        archiver: Arc<dyn HostArchiver>,
        host: HostContext,
    ) -> Self {
        Self {
            runtime,
            fs_read,
            fs_write,
            archiver,
            host,
        }
    }

    /// Resolve everything the container needs without touching the runtime.
    pub fn container_spec(
        &self,
        request: &LaunchRequest,
        config: &OccConfig,
    ) -> Result<ContainerSpec, LaunchError> {
        if !self.config_exists(&request.config_path) {
            return Err(LaunchError::MissingConfig {
                path: request.config_path.clone(),
            });
        }
        let home_dir = self
            .host
            .home_dir
            .as_deref()
            .ok_or(LaunchError::HomeUnavailable)?;

        let inputs = MountInputs {
            config_path: &request.config_path,
            home_dir,
            platform_temp_dir: &self.host.platform_temp_dir,
            platform: self.host.platform,
            ssh_auth_sock: &self.host.ssh_auth_sock,
        };
        let mounts = build_mounts(&self.fs_read, config, &inputs)?;
        let env = build_env(config, &request.args, self.host.platform);

        Ok(ContainerSpec {
            image: image_reference(&request.tag),
            stdin: true,
            terminal: true,
            privileged: true,
            remove: true,
            env,
            mounts,
            publish_exposed_ports: !request.disable_console_port,
        })
    }

    /// Create, start and attach to the session container. Returns its id.
    pub async fn launch(
        &self,
        request: &LaunchRequest,
        config: &OccConfig,
    ) -> Result<String, LaunchError> {
        let spec = self.container_spec(request, config)?;
        telemetry::emit_session_launch(&SessionLaunchTelemetry {
            image: &spec.image,
            platform: self.host.platform.as_str(),
            mount_count: spec.mounts.len(),
            env_keys: spec.env.keys().map(String::as_str).collect(),
            publish_console_port: spec.publish_exposed_ports,
        });

        let session = SessionSpan::start(&spec.image);
        let span = session.span().clone();
        let result = self.run(&spec).instrument(span).await;
        session.finish(if result.is_ok() { "exited" } else { "failed" });
        result
    }

    async fn run(&self, spec: &ContainerSpec) -> Result<String, LaunchError> {
        let container_id = self
            .runtime
            .create(spec)
            .await
            .map_err(|source| LaunchError::Create { source })?;
        info!(target: "occ::session", container_id = %container_id, "Container created");

        self.runtime
            .start(&container_id)
            .await
            .map_err(|source| LaunchError::Start {
                container_id: container_id.clone(),
                source,
            })?;

        if spec.publish_exposed_ports {
            copy_portmap(
                &self.fs_write,
                &self.runtime,
                Arc::clone(&self.archiver),
                &container_id,
            )
            .await
            .map_err(|source| LaunchError::Relay { source })?;
        }

        self.runtime
            .attach(&container_id)
            .await
            .map_err(|source| LaunchError::Attach {
                container_id: container_id.clone(),
                source,
            })?;
        Ok(container_id)
    }

    fn config_exists(&self, path: &Path) -> bool {
        self.fs_read.exists(path).unwrap_or(false)
    }
}
