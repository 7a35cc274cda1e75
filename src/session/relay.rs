//! Delivery of the console port map into a running container.
//!
//! The host side archives the generated file on a blocking task while the
//! calling task streams that archive into the container. Both sides always run
//! to completion and their failures are reported together.

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::{io::DuplexStream, task::JoinHandle};
use tokio_util::io::SyncIoBridge;
use tracing::debug;

use crate::{
    lib::{
        archive::{GetOptions, HostArchiver},
        errors::{AggregatedRelayError, ArchiveError, RelayError},
        fs::{FileSystemWrite, TempDirGuard},
    },
    runtime::{ArchiveReader, ContainerRuntime},
};

/// Container port whose published host ports are relayed.
pub const CONSOLE_CONTAINER_PORT: &str = "9999/tcp";
pub const PORTMAP_TEMP_PREFIX: &str = "occ_portmaps";
pub const PORTMAP_FILE_NAME: &str = "portmap";
/// Directory the port map is extracted into inside the container.
pub const CONTAINER_DESTINATION: &str = "/tmp";
const PIPE_CAPACITY: usize = 64 * 1024;

/// Results of both relay sides, joined into one.
#[derive(Debug)]
pub struct RelayOutcome {
    consumer: Result<(), RelayError>,
    producer: Result<(), RelayError>,
}

impl RelayOutcome {
    pub fn new(consumer: Result<(), RelayError>, producer: Result<(), RelayError>) -> Self {
        Self { consumer, producer }
    }

    /// Success when both sides succeeded; otherwise every failure, consumer first.
    pub fn into_result(self) -> Result<(), RelayError> {
        let errors: Vec<RelayError> = [self.consumer.err(), self.producer.err()]
            .into_iter()
            .flatten()
            .collect();
        if errors.is_empty() {
            return Ok(());
        }
        Err(AggregatedRelayError::new(errors).into())
    }
}

/// Write the published console ports of `container_id` to a host file and copy
/// it into the container's `/tmp`.
pub async fn copy_portmap<W, R>(
    fs: &W,
    runtime: &R,
    archiver: Arc<dyn HostArchiver>,
    container_id: &str,
) -> Result<(), RelayError>
where
    W: FileSystemWrite + ?Sized,
    R: ContainerRuntime + ?Sized,
{
    let temp_dir = TempDirGuard::create(fs, PORTMAP_TEMP_PREFIX)
        .map_err(|source| RelayError::TempDir { source })?;

    let inspection =
        runtime
            .inspect(container_id)
            .await
            .map_err(|source| RelayError::InspectFailed {
                container_id: container_id.to_string(),
                source,
            })?;
    let host_ports = inspection.host_ports(CONSOLE_CONTAINER_PORT);

    let portmap_path = temp_dir.path().join(PORTMAP_FILE_NAME);
    write_portmap(fs, &portmap_path, &host_ports)?;
    debug!(
        target: "occ::relay",
        container_id,
        path = %portmap_path.display(),
        host_ports = ?host_ports,
        "Portmap file written"
    );

    let (reader, writer) = tokio::io::duplex(PIPE_CAPACITY);
    let producer = spawn_host_copy(archiver, portmap_path, writer);
    let consumer = container_copy(runtime, container_id, Box::new(reader)).await;
    let producer = join_producer(producer).await;

    debug!(
        target: "occ::relay",
        container_id,
        consumer_ok = consumer.is_ok(),
        producer_ok = producer.is_ok(),
        "Portmap relay joined"
    );
    RelayOutcome::new(consumer, producer).into_result()
}

/// Write one host port per line.
pub fn write_portmap<W: FileSystemWrite + ?Sized>(
    fs: &W,
    path: &Path,
    host_ports: &[String],
) -> Result<(), RelayError> {
    let mut file = fs.create(path).map_err(|source| RelayError::FileCreate {
        path: path.to_path_buf(),
        source,
    })?;
    let write_error = |source: std::io::Error| RelayError::Write {
        path: path.to_path_buf(),
        source,
    };
    for port in host_ports {
        writeln!(file, "{port}").map_err(write_error)?;
    }
    file.flush().map_err(write_error)
}

/// Archive `portmap_path` into `writer` on a blocking task. The writer is
/// closed when the task ends, whatever the outcome.
fn spawn_host_copy(
    archiver: Arc<dyn HostArchiver>,
    portmap_path: PathBuf,
    writer: DuplexStream,
) -> JoinHandle<Result<(), RelayError>> {
    let mut bridge = SyncIoBridge::new(writer);
    tokio::task::spawn_blocking(move || {
        let globs = [portmap_path.to_string_lossy().into_owned()];
        let result = archiver.get(
            Path::new("/"),
            None,
            GetOptions {
                keep_directory_names: true,
            },
            &globs,
            &mut bridge,
        );
        drop(bridge);
        result.map_err(|source| RelayError::ArchiveRead { source })
    })
}

async fn container_copy<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    container_id: &str,
    reader: ArchiveReader,
) -> Result<(), RelayError> {
    let operation = runtime
        .copy_from_archive(container_id, CONTAINER_DESTINATION, reader)
        .await
        .map_err(|source| RelayError::CopyRequest {
            container_id: container_id.to_string(),
            path: CONTAINER_DESTINATION,
            source,
        })?;
    operation.await.map_err(|source| RelayError::CopyStream {
        container_id: container_id.to_string(),
        source,
    })
}

async fn join_producer(handle: JoinHandle<Result<(), RelayError>>) -> Result<(), RelayError> {
    match handle.await {
        Ok(result) => result,
        Err(err) => Err(RelayError::ArchiveRead {
            source: ArchiveError::Interrupted {
                message: err.to_string(),
            },
        }),
    }
}
