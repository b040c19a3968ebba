//! HTTP utilities for downloading the q binary.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::path::Path;

/// Downloads a file from a URL.
///
/// Returns the file contents as a byte vector.
pub async fn download(url: &str) -> Result<Vec<u8>> {
    log::info!("Downloading {}", url);

    let response = reqwest::get(url)
        .await
        .map_err(|e| Error::GenericError(format!("Download failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::GenericError(format!(
            "Download failed: {} returned {}",
            url,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::GenericError(format!("Failed to read response: {}", e)))?;

    Ok(bytes.to_vec())
}

/// Downloads a file from a URL straight to the given path, creating parent
/// directories as needed.
pub async fn download_to_file(url: &str, dest: &Path) -> Result<()> {
    let data = download(url).await?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating download directory", parent)?;
    }
    tokio::fs::write(dest, data)
        .await
        .fs_context("writing downloaded file", dest)?;

    log::debug!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

/// Extracts a ZIP archive from memory into a destination directory.
///
/// Creates parent directories as needed, handles both files and
/// directories, and restores each entry's unix permission bits so
/// executables stay executable after extraction.
///
/// **Security:** Only extracts files within the destination directory,
/// rejecting entries with `..` or absolute paths.
pub async fn extract_zip(data: &[u8], dest: &Path) -> Result<()> {
    use async_zip::base::read::mem::ZipFileReader;
    use futures_lite::io::AsyncReadExt as _;

    let reader = ZipFileReader::new(data.to_vec())
        .await
        .map_err(|e| Error::GenericError(format!("Failed to read ZIP archive: {}", e)))?;

    for i in 0..reader.file().entries().len() {
        let entry = reader
            .file()
            .entries()
            .get(i)
            .ok_or_else(|| Error::GenericError(format!("Failed to get ZIP entry {}", i)))?;

        let filename = entry
            .filename()
            .as_str()
            .map_err(|e| Error::GenericError(format!("Invalid filename in ZIP: {}", e)))?
            .to_string();

        // Reject traversal attempts
        if filename.contains("..") || filename.starts_with('/') || filename.starts_with('\\') {
            return Err(Error::GenericError(format!(
                "Invalid ZIP entry path (potential traversal attack): {}",
                filename
            )));
        }

        let is_dir = entry
            .dir()
            .map_err(|e| Error::GenericError(format!("Failed to check if entry is directory: {}", e)))?;
        let unix_mode = entry.unix_permissions();

        if is_dir {
            let dir_path = dest.join(&filename);
            tokio::fs::create_dir_all(&dir_path).await?;
            continue;
        }

        let file_path = dest.join(&filename);

        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut entry_reader = reader
            .reader_with_entry(i)
            .await
            .map_err(|e| Error::GenericError(format!("Failed to read ZIP entry: {}", e)))?;
        let mut content = Vec::new();
        entry_reader.read_to_end(&mut content).await?;

        tokio::fs::write(&file_path, content).await?;

        if let Some(mode) = unix_mode {
            restore_mode(&file_path, mode).await?;
        }
    }

    Ok(())
}

/// Restores an archived entry's unix permission bits after extraction.
#[cfg(unix)]
async fn restore_mode(path: &Path, mode: u16) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(u32::from(mode) & 0o777);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

/// No-op on platforms without unix permissions.
#[cfg(not(unix))]
async fn restore_mode(_path: &Path, _mode: u16) -> Result<()> {
    Ok(())
}
