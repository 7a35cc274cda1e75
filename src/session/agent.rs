use std::path::Path;

use tracing::debug;

use crate::lib::{errors::AgentLocateError, fs::FileSystemRead};

/// Substring identifying the launchd-managed SSH agent directory on macOS.
pub const LAUNCHD_AGENT_MARKER: &str = "com.apple.launchd";

/// Find the launchd SSH agent directory directly under `temp_dir`.
///
/// Returns the first matching entry name in listing order.
pub fn locate_agent<F: FileSystemRead + ?Sized>(
    fs: &F,
    temp_dir: &Path,
) -> Result<String, AgentLocateError> {
    let names = fs
        .read_dir_names(temp_dir)
        .map_err(|source| AgentLocateError::ReadDir {
            path: temp_dir.to_path_buf(),
            source,
        })?;

    if names.is_empty() {
        return Err(AgentLocateError::NotFound {
            path: temp_dir.to_path_buf(),
            reason: "no dirs found".into(),
        });
    }

    let mut matches = names
        .into_iter()
        .filter(|name| name.contains(LAUNCHD_AGENT_MARKER));
    let Some(found) = matches.next() else {
        return Err(AgentLocateError::NotFound {
            path: temp_dir.to_path_buf(),
            reason: format!("no dir containing {LAUNCHD_AGENT_MARKER}"),
        });
    };

    let ignored: Vec<String> = matches.collect();
    if !ignored.is_empty() {
        debug!(
            target: "occ::session",
            temp_dir = %temp_dir.display(),
            selected = %found,
            ignored = ?ignored,
            "Multiple SSH agent directories found; using the first"
        );
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib::fs::{FsOperation, MemoryFileSystem};

    const TEMP: &str = "/private/tmp";

    #[test]
    fn empty_listing_is_not_found() {
        let fs = MemoryFileSystem::new().with_dir(TEMP);
        let err = locate_agent(&fs, Path::new(TEMP)).unwrap_err();
        assert!(
            matches!(&err, AgentLocateError::NotFound { reason, .. } if reason == "no dirs found")
        );
        assert!(err.to_string().contains(TEMP));
    }

    #[test]
    fn unrelated_entries_are_not_found() {
        let fs = MemoryFileSystem::new().with_dir("/private/tmp/com.foo");
        let err = locate_agent(&fs, Path::new(TEMP)).unwrap_err();
        assert!(err.to_string().contains("com.apple.launchd"));
    }

    #[test]
    fn launchd_directory_is_returned() {
        let fs = MemoryFileSystem::new()
            .with_dir("/private/tmp/com.foo")
            .with_dir("/private/tmp/com.apple.launchd.12345");
        assert_eq!(
            locate_agent(&fs, Path::new(TEMP)).unwrap(),
            "com.apple.launchd.12345"
        );
    }

    #[test]
    fn first_match_wins() {
        let fs = MemoryFileSystem::new()
            .with_dir("/private/tmp/com.apple.launchd.AAA")
            .with_dir("/private/tmp/com.apple.launchd.BBB");
        assert_eq!(
            locate_agent(&fs, Path::new(TEMP)).unwrap(),
            "com.apple.launchd.AAA"
        );
    }

    #[test]
    fn listing_failure_is_distinct_from_not_found() {
        let fs = MemoryFileSystem::new()
            .with_dir(TEMP)
            .with_failure(FsOperation::ReadDir);
        let err = locate_agent(&fs, Path::new(TEMP)).unwrap_err();
        assert!(matches!(err, AgentLocateError::ReadDir { path, .. } if path == Path::new(TEMP)));
    }
}
