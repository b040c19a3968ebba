//! DMG installer assembly.
//!
//! Produces a drag-to-install disk image with the native hdiutil tool: a
//! staged copy of the .app next to an Applications symlink, a Finder window
//! layout applied via AppleScript, and a final compressed UDZO image.
//!
//! Submodules:
//! - `creation` - staging directory and writable UDRW image
//! - `customization` - Finder window layout on the mounted image
//! - `conversion` - UDRW to compressed UDZO conversion

mod conversion;
mod creation;
mod customization;

use crate::bundler::{app, error::Error, error::Result, settings::Settings, utils::fs};
use std::path::{Path, PathBuf};

pub use creation::create_rw_image;
pub use customization::{apply_finder_layout, finder_layout_script};

/// Assembles the distributable DMG installer for an already-built bundle.
///
/// # Process
/// 1. Resolve the .app bundle (precondition: it must exist)
/// 2. Stage bundle + Applications symlink + optional cosmetics
/// 3. Create writable UDRW image from the staging directory
/// 4. Mount, apply the Finder layout, flush, detach
/// 5. Convert to compressed UDZO at the final name, drop the intermediate
///
/// # Errors
///
/// [`Error::MissingBundle`] when no bundle exists at either output
/// location. Later step failures abort the remaining steps; the mount is
/// detached best-effort on failure paths and no file is left at the final
/// installer name.
pub async fn assemble(settings: &Settings) -> Result<PathBuf> {
    let bundle = app::resolve_bundle_path(settings).ok_or_else(|| Error::MissingBundle {
        product: settings.product_name().to_string(),
    })?;

    log::info!(
        "Assembling installer for {} from {}",
        settings.product_name(),
        bundle.display()
    );

    let rw_image = create_rw_image(settings, &bundle).await?;

    if let Err(e) = apply_finder_layout(&rw_image, settings).await {
        // Abort before conversion; leave no final-named artifact behind
        discard_rw_image(&rw_image).await;
        return Err(e);
    }

    let installer = match conversion::convert_to_compressed(&rw_image, settings).await {
        Ok(installer) => installer,
        Err(e) => {
            discard_rw_image(&rw_image).await;
            return Err(e);
        }
    };

    log::info!("✓ Created installer: {}", installer.display());
    Ok(installer)
}

/// Removes the intermediate image on a failed assembly, best effort.
///
/// The step failure is what the caller needs to see; a cleanup failure
/// only gets logged.
async fn discard_rw_image(rw_image: &Path) {
    if let Err(e) = fs::remove_file(rw_image).await {
        log::warn!(
            "Failed to remove intermediate image {}: {}",
            rw_image.display(),
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_assembly_cleanup_is_best_effort() {
        let dir = tempfile::tempdir().expect("tempdir");

        // Missing intermediate: cleanup must not panic or error
        discard_rw_image(&dir.path().join("absent.rw.dmg")).await;

        // Present intermediate: cleanup removes it
        let rw = dir.path().join("QChat-0.1.0.rw.dmg");
        std::fs::write(&rw, b"image").expect("write");
        discard_rw_image(&rw).await;
        assert!(!rw.exists());
    }
}
