use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use super::{
    ArchiveReader, ContainerInspection, ContainerRuntime, ContainerSpec, CopyOperation,
    NetworkSettings, PortBinding,
};
use crate::lib::errors::RuntimeError;

/// Operations of [`InMemoryRuntime`] that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuntimeOperation {
    Create,
    Start,
    Inspect,
    /// Refuse the copy request before any byte is read.
    CopyRequest,
    /// Fail the copy after the whole archive has been drained.
    CopyStream,
    Attach,
}

impl RuntimeOperation {
    const fn name(&self) -> &'static str {
        match self {
            RuntimeOperation::Create => "create",
            RuntimeOperation::Start => "start",
            RuntimeOperation::Inspect => "inspect",
            RuntimeOperation::CopyRequest => "copy request",
            RuntimeOperation::CopyStream => "copy",
            RuntimeOperation::Attach => "attach",
        }
    }
}

/// Archive bytes received by one copy operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedArchive {
    pub container_id: String,
    pub path: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct RuntimeState {
    created: Vec<ContainerSpec>,
    started: Vec<String>,
    attached: Vec<String>,
    copies: Vec<CopiedArchive>,
    calls: Vec<RuntimeOperation>,
    published: BTreeMap<String, Vec<String>>,
    failures: BTreeSet<RuntimeOperation>,
}

/// Runtime double that records every call instead of running containers.
///
/// Container ids are `container-1`, `container-2`, ... in creation order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuntime {
    state: Arc<Mutex<RuntimeState>>,
}

impl InMemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `host_ports` for `container_port` in every inspection.
    pub fn with_published_ports<I, S>(self, container_port: &str, host_ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().published.insert(
            container_port.to_string(),
            host_ports.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn with_failure(self, operation: RuntimeOperation) -> Self {
        self.lock().failures.insert(operation);
        self
    }

    pub fn created(&self) -> Vec<ContainerSpec> {
        self.lock().created.clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.lock().started.clone()
    }

    pub fn attached(&self) -> Vec<String> {
        self.lock().attached.clone()
    }

    pub fn copies(&self) -> Vec<CopiedArchive> {
        self.lock().copies.clone()
    }

    /// Every call in the order it was made, failed calls included.
    pub fn calls(&self) -> Vec<RuntimeOperation> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, operation: RuntimeOperation) -> Result<(), RuntimeError> {
        let mut state = self.lock();
        state.calls.push(operation);
        if state.failures.contains(&operation) {
            return Err(injected(operation));
        }
        Ok(())
    }
}

fn injected(operation: RuntimeOperation) -> RuntimeError {
    RuntimeError::Failed {
        operation: operation.name(),
        message: "injected failure".into(),
    }
}

#[async_trait]
impl ContainerRuntime for InMemoryRuntime {
    async fn create(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        self.record(RuntimeOperation::Create)?;
        let mut state = self.lock();
        state.created.push(spec.clone());
        Ok(format!("container-{}", state.created.len()))
    }

    async fn start(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.record(RuntimeOperation::Start)?;
        self.lock().started.push(container_id.to_string());
        Ok(())
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerInspection, RuntimeError> {
        self.record(RuntimeOperation::Inspect)?;
        let state = self.lock();
        let ports = state
            .published
            .iter()
            .map(|(port, host_ports)| {
                let bindings = host_ports
                    .iter()
                    .map(|host_port| PortBinding {
                        host_ip: "0.0.0.0".into(),
                        host_port: host_port.clone(),
                    })
                    .collect();
                (port.clone(), Some(bindings))
            })
            .collect();
        Ok(ContainerInspection {
            id: container_id.to_string(),
            network_settings: NetworkSettings { ports: Some(ports) },
        })
    }

    async fn copy_from_archive(
        &self,
        container_id: &str,
        path: &str,
        mut reader: ArchiveReader,
    ) -> Result<CopyOperation, RuntimeError> {
        self.record(RuntimeOperation::CopyRequest)?;
        let runtime = self.clone();
        let container_id = container_id.to_string();
        let path = path.to_string();

        Ok(Box::pin(async move {
            let mut bytes = Vec::new();
            let read = reader.read_to_end(&mut bytes).await;
            drop(reader);
            read.map_err(|source| RuntimeError::Io {
                context: "reading archive stream",
                source,
            })?;
            runtime.record(RuntimeOperation::CopyStream)?;
            runtime.lock().copies.push(CopiedArchive {
                container_id,
                path,
                bytes,
            });
            Ok(())
        }))
    }

    async fn attach(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.record(RuntimeOperation::Attach)?;
        self.lock().attached.push(container_id.to_string());
        Ok(())
    }
}
