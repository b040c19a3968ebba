//! Resolution of the q binary dependency.
//!
//! Exactly one source wins, in documented precedence order: an explicitly
//! supplied path, the vendor cache, a caller-supplied remote locator, then
//! the built-in default locator. Whatever wins must end up as an executable
//! file or the whole pipeline fails before any packaging work starts.

use crate::bundler::{
    error::{Error, Result},
    extract,
    settings::Settings,
    utils::fs,
};
use std::path::{Path, PathBuf};

/// Built-in default locator for the Amazon Q Developer CLI disk image.
///
/// Used only when neither an explicit path nor a caller-supplied locator is
/// configured.
pub const DEFAULT_DOWNLOAD_URL: &str =
    "https://desktop-release.q.us-east-1.amazonaws.com/latest/Amazon%20Q.dmg";

/// Where a resolved binary came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Origin {
    /// Explicitly supplied path, used verbatim.
    Explicit,
    /// Reused from the fixed vendor cache path.
    VendorCache,
    /// Fetched from a remote locator (caller-supplied or default).
    Downloaded,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Explicit => write!(f, "explicit path"),
            Origin::VendorCache => write!(f, "vendor cache"),
            Origin::Downloaded => write!(f, "download"),
        }
    }
}

/// A resolved, verified q binary.
///
/// Never mutated after creation; the validator and bundle builder only read
/// from it.
#[derive(Clone, Debug)]
pub struct BinaryArtifact {
    path: PathBuf,
    origin: Origin,
}

impl BinaryArtifact {
    /// Path of the resolved executable.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Which resolution source produced this binary.
    pub fn origin(&self) -> Origin {
        self.origin
    }
}

/// The source selected for one resolution attempt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResolutionSource<'a> {
    /// Use the explicitly supplied path verbatim.
    Explicit(&'a Path),
    /// Reuse the binary already present in the vendor cache.
    VendorCache(PathBuf),
    /// Fetch from a caller-supplied locator.
    Locator(&'a str),
    /// Fetch from the built-in default locator.
    DefaultLocator,
}

/// Selects the winning resolution source.
///
/// Pure decision logic, separated from the side effects so precedence is
/// testable without touching the network.
pub fn select_source<'a>(
    explicit: Option<&'a Path>,
    vendor_path: &Path,
    locator: Option<&'a str>,
) -> ResolutionSource<'a> {
    if let Some(path) = explicit {
        if fs::is_executable_file(path) {
            return ResolutionSource::Explicit(path);
        }
        log::warn!(
            "Explicit binary path {} is not an executable file, trying other sources",
            path.display()
        );
    }

    if vendor_path.is_file() {
        return ResolutionSource::VendorCache(vendor_path.to_path_buf());
    }

    match locator {
        Some(url) => ResolutionSource::Locator(url),
        None => ResolutionSource::DefaultLocator,
    }
}

/// Produces exactly one verified, executable [`BinaryArtifact`].
///
/// # Errors
///
/// [`Error::UnresolvedDependency`] if the winning source does not yield an
/// executable file; fetch/extraction errors propagate from the extractor.
pub async fn resolve(settings: &Settings) -> Result<BinaryArtifact> {
    let vendor_path = settings.vendor_binary_path();

    let source = select_source(
        settings.explicit_binary(),
        &vendor_path,
        settings.download_url(),
    );

    let artifact = match source {
        ResolutionSource::Explicit(path) => BinaryArtifact {
            path: path.to_path_buf(),
            origin: Origin::Explicit,
        },
        ResolutionSource::VendorCache(path) => {
            // Normalize permission bits; the cache may have been checked
            // out or copied without them.
            fs::set_executable(&path).await?;
            BinaryArtifact {
                path,
                origin: Origin::VendorCache,
            }
        }
        ResolutionSource::Locator(url) => {
            extract::fetch_binary(url, &vendor_path).await?;
            BinaryArtifact {
                path: vendor_path.clone(),
                origin: Origin::Downloaded,
            }
        }
        ResolutionSource::DefaultLocator => {
            log::info!("No q binary configured, using default locator");
            extract::fetch_binary(DEFAULT_DOWNLOAD_URL, &vendor_path).await?;
            BinaryArtifact {
                path: vendor_path.clone(),
                origin: Origin::Downloaded,
            }
        }
    };

    ensure_executable(&artifact)?;

    log::info!(
        "✓ Resolved q binary from {}: {}",
        artifact.origin(),
        artifact.path().display()
    );

    Ok(artifact)
}

/// Final gate: whatever source won must have produced an executable file,
/// or the pipeline fails before any packaging work.
fn ensure_executable(artifact: &BinaryArtifact) -> Result<()> {
    if !fs::is_executable_file(artifact.path()) {
        return Err(Error::UnresolvedDependency(format!(
            "resolved q binary at {} is not an executable file",
            artifact.path().display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executable(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"#!/bin/sh\n").expect("write");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod");
        }
        path
    }

    #[test]
    fn explicit_path_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let explicit = executable(dir.path(), "explicit-q");
        let vendor = executable(dir.path(), "q");

        let source = select_source(Some(&explicit), &vendor, Some("https://example.com/q.zip"));
        assert_eq!(source, ResolutionSource::Explicit(&explicit));
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_explicit_falls_through_to_vendor() {
        let dir = tempfile::tempdir().expect("tempdir");
        let explicit = dir.path().join("explicit-q");
        std::fs::write(&explicit, b"data").expect("write");
        let vendor = executable(dir.path(), "q");

        let source = select_source(Some(&explicit), &vendor, None);
        assert_eq!(source, ResolutionSource::VendorCache(vendor));
    }

    #[test]
    fn locator_wins_over_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let vendor = dir.path().join("q"); // absent

        let source = select_source(None, &vendor, Some("https://example.com/q.dmg"));
        assert_eq!(source, ResolutionSource::Locator("https://example.com/q.dmg"));
    }

    #[test]
    fn default_locator_is_last_resort() {
        let dir = tempfile::tempdir().expect("tempdir");
        let vendor = dir.path().join("q"); // absent

        let source = select_source(None, &vendor, None);
        assert_eq!(source, ResolutionSource::DefaultLocator);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn resolve_normalizes_vendor_cache_permissions() {
        use crate::bundler::SettingsBuilder;

        let dir = tempfile::tempdir().expect("tempdir");
        let vendor_dir = dir.path().join("vendor");
        std::fs::create_dir_all(&vendor_dir).expect("mkdir");
        // Cached binary without an executable bit, as a fresh checkout
        // would leave it
        let cached = vendor_dir.join("q");
        std::fs::write(&cached, b"data").expect("write");

        let settings = SettingsBuilder::new()
            .project_dir(dir.path())
            .build()
            .expect("settings");

        let artifact = resolve(&settings).await.expect("resolve");
        assert_eq!(artifact.origin(), Origin::VendorCache);
        assert!(fs::is_executable_file(artifact.path()));
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_resolution_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("q");
        std::fs::write(&path, b"data").expect("write");

        let artifact = BinaryArtifact {
            path,
            origin: Origin::Downloaded,
        };
        assert!(matches!(
            ensure_executable(&artifact),
            Err(Error::UnresolvedDependency(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn explicit_executable_is_used_verbatim() {
        use crate::bundler::SettingsBuilder;

        let dir = tempfile::tempdir().expect("tempdir");
        let explicit = executable(dir.path(), "my-q");

        let settings = SettingsBuilder::new()
            .project_dir(dir.path())
            .explicit_binary(Some(&explicit))
            .build()
            .expect("settings");

        let artifact = resolve(&settings).await.expect("resolve");
        assert_eq!(artifact.origin(), Origin::Explicit);
        assert_eq!(artifact.path(), explicit.as_path());
    }
}
