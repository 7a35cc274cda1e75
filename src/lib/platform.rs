//! Host platform distinctions that change how the SSH agent is shared.

use std::fmt;

/// Host platform as far as session assembly is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// macOS: the agent socket lives in a launchd-managed directory.
    Mac,
    Other,
}

impl Platform {
    /// Platform this binary was compiled for.
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::Mac
        } else {
            Platform::Other
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Platform::Mac => "mac",
            Platform::Other => "other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
