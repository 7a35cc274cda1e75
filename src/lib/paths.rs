//! Shared path helpers (home directory resolution, path validation).

use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};

/// Environment variable name for the user home directory.
const HOME_ENV: &str = "HOME";

/// Returns true if the path is non-empty and absolute.
pub fn is_nonempty_absolute(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.is_absolute()
}

/// Resolve the user home directory from `HOME`.
pub fn resolve_home_dir() -> Option<PathBuf> {
    resolve_home_dir_from(env::var_os(HOME_ENV))
}

fn resolve_home_dir_from(home: Option<OsString>) -> Option<PathBuf> {
    home.filter(|value| !value.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_home_is_treated_as_unset() {
        assert_eq!(resolve_home_dir_from(Some(OsString::new())), None);
        assert_eq!(resolve_home_dir_from(None), None);
        assert_eq!(
            resolve_home_dir_from(Some(OsString::from("/home/sre"))),
            Some(PathBuf::from("/home/sre"))
        );
    }
}
