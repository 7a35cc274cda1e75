//! Host-side archive reader that streams matched paths as a tar archive.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tar::Builder;

use crate::lib::errors::ArchiveError;

/// Options for [`HostArchiver::get`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Archive a matched directory under its own name instead of flattening its contents.
    pub keep_directory_names: bool,
}

/// Streams host paths into an archive writer.
pub trait HostArchiver: Send + Sync {
    /// Write an archive of every path under `root` (or `root/directory`) matching `globs`.
    ///
    /// Globs are interpreted relative to that base, a leading `/` included.
    fn get(
        &self,
        root: &Path,
        directory: Option<&Path>,
        options: GetOptions,
        globs: &[String],
        writer: &mut dyn Write,
    ) -> Result<(), ArchiveError>;
}

/// [`HostArchiver`] producing a tar stream with the `tar` crate.
///
/// A matched file is stored under its file name. A matched directory is stored
/// recursively, under its own name when `keep_directory_names` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarArchiver;

impl HostArchiver for TarArchiver {
    fn get(
        &self,
        root: &Path,
        directory: Option<&Path>,
        options: GetOptions,
        globs: &[String],
        writer: &mut dyn Write,
    ) -> Result<(), ArchiveError> {
        let base = match directory {
            Some(directory) => join_relative(root, directory),
            None => root.to_path_buf(),
        };

        let mut builder = Builder::new(writer);
        builder.follow_symlinks(false);

        for requested in globs {
            let pattern = join_relative(&base, Path::new(requested));
            let pattern = pattern
                .to_str()
                .ok_or_else(|| ArchiveError::NonUtf8 {
                    path: pattern.clone(),
                })?
                .to_string();
            let matches = glob::glob(&pattern).map_err(|source| ArchiveError::Pattern {
                glob: requested.clone(),
                source,
            })?;

            let mut matched = false;
            for entry in matches {
                let path = entry.map_err(|source| ArchiveError::Walk { source })?;
                append_match(&mut builder, &path, options)?;
                matched = true;
            }
            if !matched {
                return Err(ArchiveError::NoMatch {
                    glob: requested.clone(),
                });
            }
        }

        let writer = builder.into_inner().map_err(|source| ArchiveError::Io {
            path: base.clone(),
            source,
        })?;
        writer
            .flush()
            .map_err(|source| ArchiveError::Io { path: base, source })
    }
}

fn join_relative(base: &Path, path: &Path) -> PathBuf {
    base.join(path.strip_prefix("/").unwrap_or(path))
}

fn append_match<W: Write>(
    builder: &mut Builder<W>,
    path: &Path,
    options: GetOptions,
) -> Result<(), ArchiveError> {
    let io_error = |source: std::io::Error| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    };
    let name = path.file_name().ok_or_else(|| ArchiveError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
    })?;

    if !path.is_dir() {
        return builder.append_path_with_name(path, name).map_err(io_error);
    }
    if options.keep_directory_names {
        return builder.append_dir_all(name, path).map_err(io_error);
    }

    for entry in fs::read_dir(path).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let child = entry.path();
        let child_name = entry.file_name();
        if child.is_dir() {
            builder
                .append_dir_all(&child_name, &child)
                .map_err(io_error)?;
        } else {
            builder
                .append_path_with_name(&child, &child_name)
                .map_err(io_error)?;
        }
    }
    Ok(())
}
