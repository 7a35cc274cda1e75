use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use occ::{
    lib::{
        archive::TarArchiver,
        errors::RelayError,
        fs::{FileSystemWrite, OsFileSystem},
    },
    runtime::{InMemoryRuntime, RuntimeOperation},
    session::{copy_portmap, relay::CONSOLE_CONTAINER_PORT},
};

use crate::common::tar_entries;

/// Real filesystem that remembers the temporary directories it created.
#[derive(Default)]
struct TrackingFs {
    temp_dirs: Mutex<Vec<PathBuf>>,
}

impl TrackingFs {
    fn temp_dirs(&self) -> Vec<PathBuf> {
        self.temp_dirs.lock().expect("lock").clone()
    }
}

impl FileSystemWrite for TrackingFs {
    fn make_temp_dir(&self, prefix: &str) -> io::Result<PathBuf> {
        let path = OsFileSystem.make_temp_dir(prefix)?;
        self.temp_dirs.lock().expect("lock").push(path.clone());
        Ok(path)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        OsFileSystem.remove_all(path)
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        OsFileSystem.create(path)
    }
}

#[tokio::test]
async fn portmap_is_archived_from_host_and_temp_dir_removed() {
    let fs = TrackingFs::default();
    let runtime =
        InMemoryRuntime::new().with_published_ports(CONSOLE_CONTAINER_PORT, ["40001", "40002"]);

    copy_portmap(&fs, &runtime, Arc::new(TarArchiver), "container-1")
        .await
        .expect("relay should succeed");

    let copies = runtime.copies();
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].path, "/tmp");
    assert_eq!(
        tar_entries(&copies[0].bytes),
        vec![("portmap".to_string(), "40001\n40002\n".to_string())]
    );

    let temp_dirs = fs.temp_dirs();
    assert_eq!(temp_dirs.len(), 1);
    let name = temp_dirs[0]
        .file_name()
        .expect("temp dir has a name")
        .to_string_lossy()
        .into_owned();
    assert!(name.starts_with("occ_portmaps"), "{name}");
    assert!(!temp_dirs[0].exists());
}

#[tokio::test]
async fn consumer_failure_is_joined_with_a_completed_producer() {
    let fs = TrackingFs::default();
    let runtime = InMemoryRuntime::new()
        .with_published_ports(CONSOLE_CONTAINER_PORT, ["40001"])
        .with_failure(RuntimeOperation::CopyStream);

    let err = copy_portmap(&fs, &runtime, Arc::new(TarArchiver), "container-1")
        .await
        .expect_err("relay should fail");

    let rendered = err.to_string();
    assert!(rendered.contains("1 error occurred"), "{rendered}");
    match err {
        RelayError::Aggregated(aggregated) => {
            assert!(matches!(
                aggregated.errors(),
                [RelayError::CopyStream { .. }]
            ));
        }
        other => panic!("Unexpected error: {other:?}"),
    }
    assert!(fs.temp_dirs().iter().all(|dir| !dir.exists()));
}
