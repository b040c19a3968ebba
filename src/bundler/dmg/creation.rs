//! Staging and writable image creation.
//!
//! Stages the .app bundle, an Applications symlink, and the optional
//! cosmetic files in a scoped temporary directory, then turns the staging
//! directory into a writable UDRW image that the customization step can
//! mount and edit.

use crate::bundler::{
    error::{Context, Error, ErrorExt, Result},
    settings::Settings,
    utils::fs,
};
use std::path::{Path, PathBuf};

/// Creates the writable UDRW image from a freshly staged directory.
///
/// Returns the intermediate image path (`<Name>-<version>.rw.dmg` next to
/// the final output). The staging directory is scoped and removed when this
/// function returns, on success and failure alike.
pub async fn create_rw_image(settings: &Settings, bundle: &Path) -> Result<PathBuf> {
    let rw_path = settings.dmg_output_path().with_extension("rw.dmg");
    fs::remove_file(&rw_path).await?;

    let staging = tempfile::tempdir().map_err(|e| {
        Error::GenericError(format!("Failed to create staging directory: {}", e))
    })?;
    let staging_path = staging.path();

    // Copy of the bundle, preserving symlinks inside it
    let app_name = bundle
        .file_name()
        .context("invalid app bundle path")?;
    let staged_app = staging_path.join(app_name);

    log::debug!("Copying .app to staging: {}", staged_app.display());
    fs::copy_dir(bundle, &staged_app)
        .await
        .with_context(|| format!("copying .app bundle to {}", staged_app.display()))?;

    // Applications shortcut for the drag-to-install gesture
    #[cfg(unix)]
    {
        let applications_link = staging_path.join("Applications");
        std::os::unix::fs::symlink("/Applications", &applications_link)
            .fs_context("creating Applications symlink", &applications_link)?;
    }

    // Optional cosmetics, copied only when present
    let background = settings.dmg_background();
    if background.is_file() {
        let dest = staging_path.join(".background").join("background.png");
        fs::copy_file(&background, &dest).await?;
        log::debug!("Staged background image: {}", dest.display());
    }

    let volume_icon = settings.volume_icon();
    if volume_icon.is_file() {
        let dest = staging_path.join(".VolumeIcon.icns");
        fs::copy_file(&volume_icon, &dest).await?;
        log::debug!("Staged volume icon: {}", dest.display());
    }

    log::info!("Creating writable DMG...");

    let output = tokio::process::Command::new("hdiutil")
        .arg("create")
        .arg("-volname")
        .arg(settings.product_name())
        .arg("-srcfolder")
        .arg(staging_path)
        .arg("-ov")
        .arg("-format")
        .arg("UDRW")
        .arg(&rw_path)
        .output()
        .await
        .map_err(|error| Error::CommandFailed {
            command: "hdiutil create".into(),
            error,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::GenericError(format!("hdiutil create failed: {}", stderr)));
    }

    log::debug!("Created writable image: {}", rw_path.display());

    // Staging directory is cleaned up by the TempDir guard
    drop(staging);

    Ok(rw_path)
}
