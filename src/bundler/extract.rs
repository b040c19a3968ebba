//! Fetching and extracting the q binary from a remote locator.
//!
//! The locator's path suffix dictates the strategy: disk images are mounted
//! read-only at a scoped mount point, zips are extracted into a scoped temp
//! directory, and anything else is treated as a raw executable. Both archive
//! forms are searched for an executable named exactly `q`, preferring a copy
//! nested under an application bundle's `Contents/MacOS` directory.

use crate::bundler::{
    error::{Context, Error, Result},
    settings::Q_BINARY_NAME,
    utils::{fs, http},
};
use std::path::{Path, PathBuf};

/// Declared format of a remote archive, inferred from its locator suffix.
///
/// Never content-sniffed; a mislabeled locator is the caller's problem.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArchiveFormat {
    /// Mountable disk image (`.dmg`).
    DiskImage,
    /// Zip archive (`.zip`).
    Zip,
    /// Raw executable, downloaded as-is.
    Raw,
}

/// Infers the archive format from the locator's path suffix.
pub fn infer_format(locator: &str) -> ArchiveFormat {
    let path = match url::Url::parse(locator) {
        Ok(url) => url.path().to_ascii_lowercase(),
        Err(_) => locator.to_ascii_lowercase(),
    };

    if path.ends_with(".dmg") {
        ArchiveFormat::DiskImage
    } else if path.ends_with(".zip") {
        ArchiveFormat::Zip
    } else {
        ArchiveFormat::Raw
    }
}

/// Fetches the q binary from a remote locator into the vendor path and
/// marks it executable.
pub async fn fetch_binary(locator: &str, vendor_path: &Path) -> Result<()> {
    match infer_format(locator) {
        ArchiveFormat::DiskImage => fetch_from_dmg(locator, vendor_path).await,
        ArchiveFormat::Zip => fetch_from_zip(locator, vendor_path).await,
        ArchiveFormat::Raw => {
            http::download_to_file(locator, vendor_path).await?;
            fs::set_executable(vendor_path).await?;
            log::info!("✓ Downloaded q binary to {}", vendor_path.display());
            Ok(())
        }
    }
}

/// Downloads a disk image, mounts it read-only, and copies the q binary out.
///
/// The mount point lives inside a scoped temp directory; the image is
/// detached on success and failure alike before the directory is dropped.
async fn fetch_from_dmg(locator: &str, vendor_path: &Path) -> Result<()> {
    let scratch = tempfile::tempdir()
        .map_err(|e| Error::GenericError(format!("Failed to create scratch directory: {}", e)))?;

    let dmg_path = scratch.path().join("q.dmg");
    http::download_to_file(locator, &dmg_path).await?;

    let mount_point = scratch.path().join("mnt");
    tokio::fs::create_dir_all(&mount_point).await?;

    attach_dmg(&dmg_path, &mount_point).await?;

    // Detach must run whether or not the search succeeded.
    let copied = copy_q_from_tree(&mount_point, vendor_path, locator).await;
    detach_dmg(&mount_point).await;

    copied
}

/// Downloads a zip archive, extracts it into a scoped temp directory, and
/// copies the q binary out.
async fn fetch_from_zip(locator: &str, vendor_path: &Path) -> Result<()> {
    let data = http::download(locator).await?;

    let scratch = tempfile::tempdir()
        .map_err(|e| Error::GenericError(format!("Failed to create scratch directory: {}", e)))?;

    http::extract_zip(&data, scratch.path())
        .await
        .with_context(|| format!("extracting {}", locator))?;

    copy_q_from_tree(scratch.path(), vendor_path, locator).await
}

/// Searches an extracted/mounted tree for the q binary and copies the first
/// preferred match into the vendor path.
async fn copy_q_from_tree(root: &Path, vendor_path: &Path, locator: &str) -> Result<()> {
    // Blocking walk belongs on the blocking pool
    let search_root = root.to_path_buf();
    let found = tokio::task::spawn_blocking(move || find_q_executable(&search_root))
        .await
        .map_err(|e| Error::GenericError(format!("archive search task panicked: {e}")))?
        .ok_or_else(|| Error::ExtractionFailed {
            archive: locator.to_string(),
        })?;

    log::debug!("Found q binary at {}", found.display());
    fs::copy_file(&found, vendor_path).await?;
    fs::set_executable(vendor_path).await?;

    log::info!("✓ Extracted q binary to {}", vendor_path.display());
    Ok(())
}

/// Finds an executable named exactly `q` under `root`.
///
/// A match nested under an application bundle's executable directory
/// (`*.app/Contents/MacOS/q`) is preferred over any other match; within
/// each class, the first one encountered wins.
pub fn find_q_executable(root: &Path) -> Option<PathBuf> {
    let mut fallback: Option<PathBuf> = None;

    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name() != Q_BINARY_NAME {
            continue;
        }
        if !fs::is_executable_file(entry.path()) {
            continue;
        }

        if is_bundle_nested(entry.path()) {
            return Some(entry.path().to_path_buf());
        }
        if fallback.is_none() {
            fallback = Some(entry.path().to_path_buf());
        }
    }

    fallback
}

/// Reports whether the path sits under `<something>.app/Contents/MacOS/`.
fn is_bundle_nested(path: &Path) -> bool {
    let components: Vec<&str> = path
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();

    components.windows(3).any(|w| {
        w[0].ends_with(".app") && w[1] == "Contents" && w[2] == "MacOS"
    })
}

/// Mounts a disk image read-only at the given mount point.
async fn attach_dmg(dmg_path: &Path, mount_point: &Path) -> Result<()> {
    log::debug!("Mounting {} at {}", dmg_path.display(), mount_point.display());

    let output = tokio::process::Command::new("hdiutil")
        .arg("attach")
        .arg(dmg_path)
        .arg("-readonly")
        .arg("-nobrowse")
        .arg("-noverify")
        .arg("-mountpoint")
        .arg(mount_point)
        .output()
        .await
        .map_err(|error| Error::CommandFailed {
            command: "hdiutil attach".into(),
            error,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::GenericError(format!(
            "Failed to mount disk image: {}",
            stderr
        )));
    }

    Ok(())
}

/// Detaches a mounted disk image, best effort.
///
/// Failure here is logged, not propagated: the scoped scratch directory is
/// removed regardless, and the search result decides the pipeline outcome.
async fn detach_dmg(mount_point: &Path) {
    let output = tokio::process::Command::new("hdiutil")
        .arg("detach")
        .arg(mount_point)
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => {}
        _ => {
            log::warn!(
                "Detach of {} had issues, forcing",
                mount_point.display()
            );
            let _ = tokio::process::Command::new("hdiutil")
                .arg("detach")
                .arg(mount_point)
                .arg("-force")
                .output()
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_inferred_from_suffix() {
        assert_eq!(
            infer_format("https://example.com/latest/Amazon%20Q.dmg"),
            ArchiveFormat::DiskImage
        );
        assert_eq!(
            infer_format("https://example.com/q-aarch64-apple-darwin.zip"),
            ArchiveFormat::Zip
        );
        assert_eq!(
            infer_format("https://example.com/releases/q"),
            ArchiveFormat::Raw
        );
        // Suffix check is on the path, not the query string
        assert_eq!(
            infer_format("https://example.com/q?format=dmg"),
            ArchiveFormat::Raw
        );
    }

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    }

    #[cfg(unix)]
    #[test]
    fn search_prefers_bundle_nested_match() {
        let dir = tempfile::tempdir().expect("tempdir");

        let plain = dir.path().join("bin");
        std::fs::create_dir_all(&plain).expect("mkdir");
        std::fs::write(plain.join("q"), b"plain").expect("write");
        make_executable(&plain.join("q"));

        let nested = dir.path().join("Amazon Q.app/Contents/MacOS");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(nested.join("q"), b"nested").expect("write");
        make_executable(&nested.join("q"));

        let found = find_q_executable(dir.path()).expect("match");
        assert!(found.ends_with("Amazon Q.app/Contents/MacOS/q"));
    }

    #[cfg(unix)]
    #[test]
    fn search_falls_back_to_any_match() {
        let dir = tempfile::tempdir().expect("tempdir");

        let plain = dir.path().join("some/where");
        std::fs::create_dir_all(&plain).expect("mkdir");
        std::fs::write(plain.join("q"), b"plain").expect("write");
        make_executable(&plain.join("q"));

        let found = find_q_executable(dir.path()).expect("match");
        assert!(found.ends_with("some/where/q"));
    }

    #[cfg(unix)]
    #[test]
    fn search_ignores_non_executables_and_wrong_names() {
        let dir = tempfile::tempdir().expect("tempdir");

        std::fs::write(dir.path().join("q"), b"not executable").expect("write");
        std::fs::write(dir.path().join("qq"), b"wrong name").expect("write");
        make_executable(&dir.path().join("qq"));

        assert!(find_q_executable(dir.path()).is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn zip_extraction_keeps_q_findable() {
        use async_zip::{Compression, ZipEntryBuilder, base::write::ZipFileWriter};

        // Archive shaped like a real q release: the binary stored 0755
        let mut cursor = futures_lite::io::Cursor::new(Vec::new());
        let mut writer = ZipFileWriter::new(&mut cursor);
        let entry = ZipEntryBuilder::new("bin/q".to_string().into(), Compression::Stored)
            .unix_permissions(0o755);
        writer
            .write_entry_whole(entry, b"#!/bin/sh\n")
            .await
            .expect("write entry");
        writer.close().await.expect("close");
        let data = cursor.into_inner();

        let dest = tempfile::tempdir().expect("tempdir");
        http::extract_zip(&data, dest.path()).await.expect("extract");

        // The extracted binary must keep its executable bit or the
        // search rejects it
        let found = find_q_executable(dest.path()).expect("search");
        assert!(found.ends_with("bin/q"));
        assert!(fs::is_executable_file(&found));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tree_copy_installs_executable_vendor_binary() {
        let dir = tempfile::tempdir().expect("tempdir");

        let tree = dir.path().join("tree");
        std::fs::create_dir_all(&tree).expect("mkdir");
        std::fs::write(tree.join("q"), b"#!/bin/sh\n").expect("write");
        make_executable(&tree.join("q"));

        let vendor = dir.path().join("vendor/q");
        copy_q_from_tree(&tree, &vendor, "local-tree")
            .await
            .expect("copy");

        assert!(fs::is_executable_file(&vendor));
    }
}
