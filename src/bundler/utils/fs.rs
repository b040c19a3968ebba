//! File system utilities for the packaging pipeline.
//!
//! Provides safe file operations with automatic directory creation,
//! symlink preservation, and executable permission handling.

use crate::bundler::error::Result;
use std::{io, path::Path};
use tokio::fs;

/// Creates all of the directories of the specified path, erasing it first
/// if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        // Idempotent removal
        match fs::remove_dir_all(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(fs::create_dir_all(path).await?)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err(e.into()),
    }
}

/// Removes the file if it exists.
pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err(e.into()),
    }
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(crate::bundler::error::Error::GenericError(format!(
            "{from:?} does not exist"
        )));
    }
    if !from.is_file() {
        return Err(crate::bundler::error::Error::GenericError(format!(
            "{from:?} is not a file"
        )));
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir).await?;
    }
    fs::copy(from, to).await?;
    Ok(())
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Preserves symlinks, which .app bundles rely on for framework links.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(crate::bundler::error::Error::GenericError(format!(
            "{from:?} does not exist"
        )));
    }
    if !from.is_dir() {
        return Err(crate::bundler::error::Error::GenericError(format!(
            "{from:?} is not a directory"
        )));
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();

    // Blocking walk belongs on the blocking pool
    tokio::task::spawn_blocking(move || {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }

        for entry in walkdir::WalkDir::new(&from) {
            let entry = entry?;
            let rel_path = entry.path().strip_prefix(&from).map_err(|e| {
                crate::bundler::error::Error::GenericError(format!(
                    "path {} outside copy root: {}",
                    entry.path().display(),
                    e
                ))
            })?;
            let dest_path = to.join(rel_path);

            if entry.path_is_symlink() {
                #[cfg(unix)]
                {
                    let target = std::fs::read_link(entry.path())?;
                    std::os::unix::fs::symlink(&target, &dest_path)?;
                }
            } else if entry.file_type().is_dir() {
                std::fs::create_dir_all(dest_path)?;
            } else {
                std::fs::copy(entry.path(), dest_path)?;
            }
        }

        Ok(())
    })
    .await
    .map_err(|e| {
        crate::bundler::error::Error::GenericError(format!("directory copy task panicked: {e}"))
    })?
}

/// Marks a file as executable (0o755).
#[cfg(unix)]
pub async fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o755);
    fs::set_permissions(path, perms).await?;
    Ok(())
}

/// Marks a file as executable. No-op on platforms without unix permissions.
#[cfg(not(unix))]
pub async fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Reports whether the path is an existing regular file with an executable
/// bit set.
pub fn is_executable_file(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copy_dir_preserves_structure() {
        let src = tempfile::tempdir().expect("tempdir");
        let dst = tempfile::tempdir().expect("tempdir");

        let nested = src.path().join("a/b");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(nested.join("file.txt"), b"contents").expect("write");

        let dest = dst.path().join("copy");
        copy_dir(src.path(), &dest).await.expect("copy");

        let copied = std::fs::read(dest.join("a/b/file.txt")).expect("read");
        assert_eq!(copied, b"contents");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn executable_detection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("bin");
        std::fs::write(&file, b"#!/bin/sh\n").expect("write");

        assert!(!is_executable_file(&file));
        set_executable(&file).await.expect("chmod");
        assert!(is_executable_file(&file));
        assert!(!is_executable_file(dir.path()));
    }

    #[tokio::test]
    async fn copy_file_rejects_missing_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = copy_file(&dir.path().join("missing"), &dir.path().join("out")).await;
        assert!(result.is_err());
    }
}
