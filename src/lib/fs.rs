//! Host filesystem capabilities used by the mount engine and the portmap relay.
//!
//! Both capabilities come in two flavours: [`OsFileSystem`] talks to the real
//! filesystem and [`MemoryFileSystem`] keeps everything in memory so launch
//! logic can run against a fabricated home directory.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::warn;

/// Read-only probes against the host filesystem.
pub trait FileSystemRead {
    /// Returns `Ok(false)` when nothing exists at `path`; any other failure is an error.
    fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Names of the entries directly under `path`, sorted by name.
    fn read_dir_names(&self, path: &Path) -> io::Result<Vec<String>>;
}

/// Mutating operations needed to stage files on the host.
pub trait FileSystemWrite: Send + Sync {
    /// Create a fresh directory whose name starts with `prefix` and return its path.
    fn make_temp_dir(&self, prefix: &str) -> io::Result<PathBuf>;
    fn remove_all(&self, path: &Path) -> io::Result<()>;
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;
}

/// Filesystem backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystemRead for OsFileSystem {
    /// Follows symlinks, so a dangling link reports `false`.
    fn exists(&self, path: &Path) -> io::Result<bool> {
        match fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn read_dir_names(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

impl FileSystemWrite for OsFileSystem {
    fn make_temp_dir(&self, prefix: &str) -> io::Result<PathBuf> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        Ok(dir.keep())
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        match fs::remove_dir_all(path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(File::create(path)?))
    }
}

/// Directory that is removed through its filesystem when the guard goes out of scope.
pub struct TempDirGuard<'a, F: FileSystemWrite + ?Sized> {
    fs: &'a F,
    path: PathBuf,
}

impl<'a, F: FileSystemWrite + ?Sized> TempDirGuard<'a, F> {
    pub fn create(fs: &'a F, prefix: &str) -> io::Result<Self> {
        let path = fs.make_temp_dir(prefix)?;
        Ok(Self { fs, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<F: FileSystemWrite + ?Sized> Drop for TempDirGuard<'_, F> {
    fn drop(&mut self) {
        if let Err(err) = self.fs.remove_all(&self.path) {
            warn!(
                target: "occ::fs",
                path = %self.path.display(),
                reason = %err,
                "Failed to remove temporary directory"
            );
        }
    }
}

/// Operations of [`MemoryFileSystem`] that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FsOperation {
    ReadDir,
    MakeTempDir,
    Create,
    Write,
}

#[derive(Debug, Clone)]
enum MemoryEntry {
    Dir,
    File(Vec<u8>),
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: BTreeMap<PathBuf, MemoryEntry>,
    denied: BTreeSet<PathBuf>,
    failures: BTreeSet<FsOperation>,
    temp_counter: u32,
}

/// In-memory filesystem double.
///
/// Parent directories of every inserted entry are implied, so inserting
/// `/home/u/.aws/config` also makes `/home/u/.aws` exist.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
        self.lock().entries.insert(path.into(), MemoryEntry::Dir);
        self
    }

    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.lock()
            .entries
            .insert(path.into(), MemoryEntry::File(contents.into()));
        self
    }

    /// Make probes of `path` fail with `PermissionDenied`.
    pub fn with_denied(self, path: impl Into<PathBuf>) -> Self {
        self.lock().denied.insert(path.into());
        self
    }

    pub fn with_failure(self, operation: FsOperation) -> Self {
        self.lock().failures.insert(operation);
        self
    }

    pub fn file_contents(&self, path: &Path) -> Option<Vec<u8>> {
        match self.lock().entries.get(path) {
            Some(MemoryEntry::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        let state = self.lock();
        state
            .entries
            .keys()
            .any(|entry| entry == path || entry.starts_with(path))
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, operation: FsOperation) -> io::Result<()> {
        if self.lock().failures.contains(&operation) {
            return Err(io::Error::other(format!("injected {operation:?} failure")));
        }
        Ok(())
    }
}

impl FileSystemRead for MemoryFileSystem {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        if self.lock().denied.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            ));
        }
        Ok(self.contains(path))
    }

    fn read_dir_names(&self, path: &Path) -> io::Result<Vec<String>> {
        self.check(FsOperation::ReadDir)?;
        if !self.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", path.display()),
            ));
        }
        let state = self.lock();
        let names: BTreeSet<String> = state
            .entries
            .keys()
            .filter_map(|entry| entry.strip_prefix(path).ok())
            .filter_map(|relative| relative.components().next())
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();
        Ok(names.into_iter().collect())
    }
}

impl FileSystemWrite for MemoryFileSystem {
    fn make_temp_dir(&self, prefix: &str) -> io::Result<PathBuf> {
        self.check(FsOperation::MakeTempDir)?;
        let mut state = self.lock();
        state.temp_counter += 1;
        let path = PathBuf::from(format!("/tmp/{prefix}{}", state.temp_counter));
        state.entries.insert(path.clone(), MemoryEntry::Dir);
        Ok(path)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        self.lock()
            .entries
            .retain(|entry, _| !(entry == path || entry.starts_with(path)));
        Ok(())
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        self.check(FsOperation::Create)?;
        self.lock()
            .entries
            .insert(path.to_path_buf(), MemoryEntry::File(Vec::new()));
        Ok(Box::new(MemoryFile {
            fs: self.clone(),
            path: path.to_path_buf(),
        }))
    }
}

struct MemoryFile {
    fs: MemoryFileSystem,
    path: PathBuf,
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.fs.check(FsOperation::Write)?;
        match self.fs.lock().entries.get_mut(&self.path) {
            Some(MemoryEntry::File(bytes)) => {
                bytes.extend_from_slice(buf);
                Ok(buf.len())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("file was removed: {}", self.path.display()),
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fs_implies_parent_directories() {
        let fs = MemoryFileSystem::new().with_file("/home/u/.aws/config", "x");
        assert!(fs.exists(Path::new("/home/u/.aws")).unwrap());
        assert!(fs.exists(Path::new("/home/u")).unwrap());
        assert!(!fs.exists(Path::new("/home/u/.ssh")).unwrap());
    }

    #[test]
    fn memory_fs_lists_direct_children_once() {
        let fs = MemoryFileSystem::new()
            .with_dir("/private/tmp/com.apple.launchd.abc")
            .with_file("/private/tmp/com.apple.launchd.abc/Listeners", "")
            .with_dir("/private/tmp/other");
        let names = fs.read_dir_names(Path::new("/private/tmp")).unwrap();
        assert_eq!(names, vec!["com.apple.launchd.abc", "other"]);
    }

    #[test]
    fn denied_probe_is_an_error_not_a_negative() {
        let fs = MemoryFileSystem::new().with_denied("/home/u/.aws");
        let err = fs.exists(Path::new("/home/u/.aws")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn temp_dir_guard_removes_directory_on_drop() {
        let fs = MemoryFileSystem::new();
        let path = {
            let guard = TempDirGuard::create(&fs, "occ_test").unwrap();
            let mut file = fs.create(&guard.path().join("data")).unwrap();
            file.write_all(b"1\n").unwrap();
            assert!(fs.contains(guard.path()));
            guard.path().to_path_buf()
        };
        assert!(!fs.contains(&path));
    }

    #[test]
    fn os_fs_probe_reports_missing_path_as_false() {
        let dir = tempfile::tempdir().unwrap();
        assert!(OsFileSystem.exists(dir.path()).unwrap());
        assert!(!OsFileSystem.exists(&dir.path().join("missing")).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn os_fs_probe_treats_dangling_symlink_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join(".aws");
        std::os::unix::fs::symlink(dir.path().join("dotfiles/aws"), &link).unwrap();

        assert!(!OsFileSystem.exists(&link).unwrap());

        fs::create_dir_all(dir.path().join("dotfiles/aws")).unwrap();
        assert!(OsFileSystem.exists(&link).unwrap());
    }

    #[test]
    fn os_fs_temp_dir_is_removed_by_guard() {
        let path = {
            let guard = TempDirGuard::create(&OsFileSystem, "occ_guard").unwrap();
            let mut file = OsFileSystem.create(&guard.path().join("portmap")).unwrap();
            writeln!(file, "1234").unwrap();
            guard.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
