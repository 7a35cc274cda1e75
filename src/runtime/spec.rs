use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::Deserialize;

/// Environment passed into the container, ordered by variable name.
pub type EnvMap = BTreeMap<String, String>;

/// Kind of filesystem exposed at a mount destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    Bind,
    Tmpfs,
}

impl MountKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MountKind::Bind => "bind",
            MountKind::Tmpfs => "tmpfs",
        }
    }
}

/// Access mode of a bind mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOption {
    ReadOnly,
    ReadWrite,
}

impl MountOption {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MountOption::ReadOnly => "ro",
            MountOption::ReadWrite => "rw",
        }
    }
}

/// One mount declaration handed to the runtime.
///
/// Tmpfs mounts never carry a source; bind mounts always do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub source: Option<PathBuf>,
    pub destination: String,
    pub options: Vec<MountOption>,
    pub kind: MountKind,
}

impl MountSpec {
    pub fn tmpfs(destination: impl Into<String>) -> Self {
        Self {
            source: None,
            destination: destination.into(),
            options: Vec::new(),
            kind: MountKind::Tmpfs,
        }
    }

    pub fn bind(
        source: impl Into<PathBuf>,
        destination: impl Into<String>,
        option: MountOption,
    ) -> Self {
        Self {
            source: Some(source.into()),
            destination: destination.into(),
            options: vec![option],
            kind: MountKind::Bind,
        }
    }

    pub fn read_only(source: impl Into<PathBuf>, destination: impl Into<String>) -> Self {
        Self::bind(source, destination, MountOption::ReadOnly)
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Options rendered as the runtime spells them.
    pub fn option_names(&self) -> Vec<&'static str> {
        self.options.iter().map(MountOption::as_str).collect()
    }
}

/// Declarative description of the session container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub stdin: bool,
    pub terminal: bool,
    pub privileged: bool,
    pub remove: bool,
    pub env: EnvMap,
    pub mounts: Vec<MountSpec>,
    pub publish_exposed_ports: bool,
}

impl ContainerSpec {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            stdin: false,
            terminal: false,
            privileged: false,
            remove: false,
            env: EnvMap::new(),
            mounts: Vec::new(),
            publish_exposed_ports: false,
        }
    }

    pub fn mount_at(&self, destination: &str) -> Option<&MountSpec> {
        self.mounts
            .iter()
            .find(|mount| mount.destination == destination)
    }
}

/// Host side of one published container port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PortBinding {
    #[serde(rename = "HostIp", default)]
    pub host_ip: String,
    #[serde(rename = "HostPort", default)]
    pub host_port: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NetworkSettings {
    #[serde(rename = "Ports", default)]
    pub ports: Option<BTreeMap<String, Option<Vec<PortBinding>>>>,
}

/// Subset of a container inspection needed by the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContainerInspection {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "NetworkSettings", default)]
    pub network_settings: NetworkSettings,
}

impl ContainerInspection {
    /// Host ports published for `container_port` (for example `9999/tcp`), in runtime order.
    pub fn host_ports(&self, container_port: &str) -> Vec<String> {
        self.network_settings
            .ports
            .as_ref()
            .and_then(|ports| ports.get(container_port))
            .and_then(Option::as_ref)
            .map(|bindings| {
                bindings
                    .iter()
                    .map(|binding| binding.host_port.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}
