//! .app bundle creation via the external packaging tool.
//!
//! The pipeline does not build the bundle itself; PyInstaller does. This
//! stage guarantees a clean slate before the tool runs, hands it the
//! resolved q binary and the optional icon, and verifies the bundle landed
//! at one of the two conventional output locations afterwards.

use crate::bundler::{
    error::{Error, Result},
    resolver::BinaryArtifact,
    settings::Settings,
    utils::fs,
};
use std::path::{Path, PathBuf};

/// External application-packaging tool.
const PACKAGING_TOOL: &str = "pyinstaller";

/// Builds the .app bundle and returns its resolved path.
///
/// Prior build/dist outputs for the same product are removed first so a
/// stale bundle is never silently reused.
///
/// # Errors
///
/// [`Error::PackagingFailed`] when the tool exits successfully but neither
/// expected output location holds a bundle; tool invocation failures
/// propagate with the tool's stderr.
pub async fn bundle_project(
    settings: &Settings,
    binary: &BinaryArtifact,
    icon: Option<&Path>,
) -> Result<PathBuf> {
    log::info!("Packaging {} with {}", settings.product_name(), PACKAGING_TOOL);

    clean_previous_outputs(settings).await?;

    let add_binary = format!("{}:.", binary.path().display());

    let mut command = tokio::process::Command::new(PACKAGING_TOOL);
    command
        .current_dir(settings.project_dir())
        .arg("--windowed")
        .arg("--noconfirm")
        .arg("--clean")
        .arg("--name")
        .arg(settings.product_name())
        .arg("--add-binary")
        .arg(&add_binary);

    if let Some(icon_path) = icon {
        command.arg("--icon").arg(icon_path);
    }

    command.arg(settings.entry_script());

    let output = command.output().await.map_err(|error| Error::CommandFailed {
        command: PACKAGING_TOOL.into(),
        error,
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::GenericError(format!(
            "{} failed: {}",
            PACKAGING_TOOL, stderr
        )));
    }

    match resolve_bundle_path(settings) {
        Some(bundle) => {
            log::info!("✓ Created app bundle: {}", bundle.display());
            Ok(bundle)
        }
        None => {
            log_dist_contents(&settings.dist_dir()).await;
            Err(Error::PackagingFailed {
                product: settings.product_name().to_string(),
            })
        }
    }
}

/// Resolves the bundle location via ordered existence checks.
///
/// The packaging tool places the .app either directly under dist/ or inside
/// a product-named subdirectory; both are treated as equivalent, resolved
/// once here rather than re-checked by every consumer.
pub fn resolve_bundle_path(settings: &Settings) -> Option<PathBuf> {
    settings
        .bundle_candidates()
        .into_iter()
        .find(|candidate| candidate.is_dir())
}

/// Removes prior packaging outputs for this product.
async fn clean_previous_outputs(settings: &Settings) -> Result<()> {
    fs::remove_dir_all(&settings.build_dir()).await?;

    let [top, nested] = settings.bundle_candidates();
    fs::remove_dir_all(&top).await?;
    if let Some(nested_dir) = nested.parent() {
        fs::remove_dir_all(nested_dir).await?;
    }

    Ok(())
}

/// Logs the dist directory contents when the bundle is missing, for
/// diagnosis.
async fn log_dist_contents(dist: &Path) {
    log::error!("No .app bundle found; contents of {}:", dist.display());

    let Ok(mut entries) = tokio::fs::read_dir(dist).await else {
        log::error!("  (dist directory does not exist)");
        return;
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        log::error!("  {}", entry.path().display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::SettingsBuilder;

    fn settings_in(dir: &Path) -> Settings {
        SettingsBuilder::new()
            .project_dir(dir)
            .product_name("MyApp")
            .build()
            .expect("settings")
    }

    #[test]
    fn bundle_path_prefers_top_level_location() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = settings_in(dir.path());

        let [top, nested] = settings.bundle_candidates();
        std::fs::create_dir_all(&top).expect("mkdir");
        std::fs::create_dir_all(&nested).expect("mkdir");

        assert_eq!(resolve_bundle_path(&settings), Some(top));
    }

    #[test]
    fn bundle_path_falls_back_to_nested_location() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = settings_in(dir.path());

        let [_, nested] = settings.bundle_candidates();
        std::fs::create_dir_all(&nested).expect("mkdir");

        assert_eq!(resolve_bundle_path(&settings), Some(nested));
    }

    #[test]
    fn bundle_path_is_none_when_nothing_built() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = settings_in(dir.path());

        assert_eq!(resolve_bundle_path(&settings), None);
    }

    #[tokio::test]
    async fn clean_removes_stale_outputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = settings_in(dir.path());

        let [top, nested] = settings.bundle_candidates();
        std::fs::create_dir_all(&top).expect("mkdir");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::create_dir_all(settings.build_dir()).expect("mkdir");

        clean_previous_outputs(&settings).await.expect("clean");

        assert!(!top.exists());
        assert!(!nested.exists());
        assert!(!settings.build_dir().exists());
    }
}
