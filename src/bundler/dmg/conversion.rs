//! Conversion of the writable image into the final compressed installer.
//!
//! A UDRW image cannot ship: it is uncompressed and writable. After the
//! layout is applied and the image detached, it is converted to UDZO at the
//! final installer name and the intermediate deleted.

use crate::bundler::{
    error::{Error, Result},
    settings::Settings,
    utils::fs,
};
use std::path::{Path, PathBuf};

/// Converts the writable UDRW image into the compressed final installer.
///
/// The final path only comes into existence when conversion succeeds, so a
/// failed assembly never leaves a partial file under the installer name.
pub async fn convert_to_compressed(rw_image: &Path, settings: &Settings) -> Result<PathBuf> {
    let final_path = settings.dmg_output_path();
    fs::remove_file(&final_path).await?;

    log::info!("Converting installer to compressed format...");

    let output = tokio::process::Command::new("hdiutil")
        .arg("convert")
        .arg(rw_image)
        .arg("-format")
        .arg("UDZO")
        .arg("-o")
        .arg(&final_path)
        .output()
        .await
        .map_err(|error| Error::CommandFailed {
            command: "hdiutil convert".into(),
            error,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        // Keep the final name clean on failure
        fs::remove_file(&final_path).await?;
        return Err(Error::GenericError(format!(
            "DMG conversion failed: {}",
            stderr
        )));
    }

    fs::remove_file(rw_image).await?;

    log::debug!("Converted to UDZO: {}", final_path.display());
    Ok(final_path)
}
