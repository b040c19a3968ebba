//! Icon generation via the platform's sips and iconutil utilities.
//!
//! Renders the source image at every fixed size plus a double-density
//! rendition, collects them in a scoped `.iconset` working directory, and
//! packs the set into a single `.icns` container. Icon generation never
//! fails the pipeline: missing tooling or a missing source image downgrade
//! to a warning and the app is packaged without an icon.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    settings::Settings,
    tools,
};
use std::path::{Path, PathBuf};

/// Square pixel sizes of the renditions inside the icon container.
///
/// Each size also gets an `@2x` rendition at twice the edge length.
pub const ICON_SIZES: [u32; 7] = [16, 32, 64, 128, 256, 512, 1024];

/// Produces the `.icns` icon container, or None when icon generation was
/// skipped.
///
/// An existing output file short-circuits regeneration, so repeated runs
/// leave the artifact byte-identical.
pub async fn generate(settings: &Settings) -> Result<Option<PathBuf>> {
    let output = settings.icon_output_path();
    if output.exists() {
        log::info!("Reusing existing icon: {}", output.display());
        return Ok(Some(output));
    }

    let source = settings.icon_source();
    if !source.is_file() {
        log::warn!(
            "Icon source {} not found, packaging without an icon",
            source.display()
        );
        return Ok(None);
    }

    if !tools::icon_tooling_available() {
        log::warn!("sips/iconutil not available, packaging without an icon");
        return Ok(None);
    }

    let work = tempfile::tempdir()
        .map_err(|e| Error::GenericError(format!("Failed to create iconset directory: {}", e)))?;

    // iconutil requires the working set to carry the .iconset extension
    let iconset = work
        .path()
        .join(format!("{}.iconset", settings.product_name()));
    tokio::fs::create_dir_all(&iconset)
        .await
        .fs_context("creating iconset directory", &iconset)?;

    for size in ICON_SIZES {
        let base = iconset.join(format!("icon_{size}x{size}.png"));
        render(&source, &base, size).await?;

        let retina = iconset.join(format!("icon_{size}x{size}@2x.png"));
        render(&source, &retina, size * 2).await?;
    }

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating icon output directory", parent)?;
    }

    pack_iconset(&iconset, &output).await?;

    log::info!("✓ Created icon: {}", output.display());
    Ok(Some(output))
}

/// Renders the source image as a square PNG of the given edge length.
async fn render(source: &Path, dest: &Path, size: u32) -> Result<()> {
    let size_arg = size.to_string();
    let output = tokio::process::Command::new("sips")
        .arg("-z")
        .arg(&size_arg)
        .arg(&size_arg)
        .arg(source)
        .arg("--out")
        .arg(dest)
        .output()
        .await
        .map_err(|error| Error::CommandFailed {
            command: "sips".into(),
            error,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::GenericError(format!(
            "sips failed rendering {}x{}: {}",
            size, size, stderr
        )));
    }

    Ok(())
}

/// Converts an `.iconset` working directory into a single `.icns` file.
async fn pack_iconset(iconset: &Path, output: &Path) -> Result<()> {
    let result = tokio::process::Command::new("iconutil")
        .arg("-c")
        .arg("icns")
        .arg(iconset)
        .arg("-o")
        .arg(output)
        .output()
        .await
        .map_err(|error| Error::CommandFailed {
            command: "iconutil".into(),
            error,
        })?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(Error::GenericError(format!(
            "iconutil failed: {}",
            stderr
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::SettingsBuilder;

    #[tokio::test]
    async fn existing_icon_is_reused_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = SettingsBuilder::new()
            .project_dir(dir.path())
            .build()
            .expect("settings");

        let output = settings.icon_output_path();
        std::fs::create_dir_all(output.parent().expect("parent")).expect("mkdir");
        std::fs::write(&output, b"icns bytes").expect("write");

        let first = generate(&settings).await.expect("generate");
        assert_eq!(first, Some(output.clone()));

        let second = generate(&settings).await.expect("generate");
        assert_eq!(second, Some(output.clone()));

        // Byte-identical: generation short-circuits, nothing rewrote it
        assert_eq!(std::fs::read(&output).expect("read"), b"icns bytes");
    }

    #[tokio::test]
    async fn missing_source_skips_without_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = SettingsBuilder::new()
            .project_dir(dir.path())
            .build()
            .expect("settings");

        let result = generate(&settings).await.expect("generate");
        assert_eq!(result, None);
    }
}
