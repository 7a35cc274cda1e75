use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
    sync::Arc,
};

use occ::{
    lib::{archive::TarArchiver, fs::OsFileSystem, platform::Platform},
    runtime::InMemoryRuntime,
    session::{HostContext, LaunchRequest, SessionLauncher, MAC_PRIVATE_TEMP_DIR},
};
use tempfile::TempDir;

pub const BINARY_PATH: &str = env!("CARGO_BIN_EXE_occ");

pub fn fixture(relative: &str) -> String {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    root.join(relative).display().to_string()
}

/// Temporary home directory populated like a workstation.
pub struct HomeFixture {
    dir: TempDir,
}

impl HomeFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("can create temporary home");
        fs::create_dir_all(dir.path().join(".ssh")).expect("can create .ssh");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join(".config/occ/config.yaml")
    }

    pub fn with_config(self, contents: &str) -> Self {
        self.with_file(".config/occ/config.yaml", contents)
    }

    pub fn with_file(self, relative: &str, contents: &str) -> Self {
        let path = self.path().join(relative);
        fs::create_dir_all(path.parent().expect("fixture files have a parent"))
            .expect("can create fixture parent");
        fs::write(&path, contents).expect("can write fixture file");
        self
    }

    pub fn host(&self) -> HostContext {
        HostContext {
            home_dir: Some(self.path().to_path_buf()),
            ssh_auth_sock: "/run/user/1000/agent.sock".into(),
            platform: Platform::Other,
            platform_temp_dir: PathBuf::from(MAC_PRIVATE_TEMP_DIR),
        }
    }

    pub fn request(&self, disable_console_port: bool) -> LaunchRequest {
        LaunchRequest {
            config_path: self.config_path(),
            args: vec!["cluster-a".into()],
            tag: "latest".into(),
            disable_console_port,
        }
    }

    pub fn launcher(
        &self,
        runtime: InMemoryRuntime,
    ) -> SessionLauncher<InMemoryRuntime, OsFileSystem, OsFileSystem> {
        SessionLauncher::new(
            runtime,
            OsFileSystem,
            OsFileSystem,
            Arc::new(TarArchiver),
            self.host(),
        )
    }
}

/// Unpack a tar stream into `(path, contents)` pairs.
pub fn tar_entries(bytes: &[u8]) -> Vec<(String, String)> {
    let mut archive = tar::Archive::new(bytes);
    archive
        .entries()
        .expect("archive should be readable")
        .map(|entry| {
            let mut entry = entry.expect("entry should be readable");
            let path = entry
                .path()
                .expect("entry has a path")
                .to_string_lossy()
                .into_owned();
            let mut contents = String::new();
            entry
                .read_to_string(&mut contents)
                .expect("entry is utf-8");
            (path, contents)
        })
        .collect()
}
