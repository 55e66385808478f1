//! Validation of caller-supplied working directories.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("path is required")]
    Empty,
    #[error("path must be absolute")]
    Relative,
    #[error("root path is not allowed")]
    Root,
    #[error("path does not exist")]
    NotExist,
    #[error("path is not a directory")]
    NotDirectory,
    #[error("resolve path {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Resolve `path` to a canonical directory.
///
/// The path must be absolute, exist, be a directory, and not be the
/// filesystem root either as written or after symlinks are resolved.
pub fn resolve_dir(path: impl AsRef<Path>) -> Result<PathBuf, PathError> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(PathError::Empty);
    }
    if !path.is_absolute() {
        return Err(PathError::Relative);
    }
    if is_root(path) {
        return Err(PathError::Root);
    }

    let resolved = match path.canonicalize() {
        Ok(resolved) => resolved,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(PathError::NotExist),
        Err(source) => {
            return Err(PathError::Resolve {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if is_root(&resolved) {
        return Err(PathError::Root);
    }
    if !resolved.is_dir() {
        return Err(PathError::NotDirectory);
    }
    Ok(resolved)
}

fn is_root(path: &Path) -> bool {
    path.parent().is_none()
}
