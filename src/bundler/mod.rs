//! The packaging pipeline.
//!
//! Strictly sequential stages: resolve the q binary, validate its
//! architecture, generate an icon, build the .app bundle, and (separately)
//! assemble the DMG installer from a built bundle. Every stage takes its
//! inputs as explicit values and every external invocation blocks until it
//! completes or fails.

pub mod app;
pub mod arch;
pub mod dmg;
pub mod error;
pub mod extract;
pub mod icon;
pub mod resolver;
pub mod settings;
pub mod tools;
pub mod utils;

pub use error::{Error, Result};
pub use extract::ArchiveFormat;
pub use resolver::{BinaryArtifact, Origin};
pub use settings::{Settings, SettingsBuilder};

use std::path::PathBuf;

/// Pipeline orchestrator.
///
/// Coordinates the stages in dependency order and threads the resolved
/// artifact and icon path between them.
///
/// # Examples
///
/// ```no_run
/// use qchat_bundler::bundler::{Pipeline, SettingsBuilder};
///
/// # async fn example() -> qchat_bundler::bundler::Result<()> {
/// let settings = SettingsBuilder::new().project_dir(".").build()?;
/// let pipeline = Pipeline::new(settings);
///
/// let bundle = pipeline.bundle_app().await?;
/// let installer = pipeline.assemble_installer().await?;
/// println!("{} / {}", bundle.display(), installer.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Pipeline {
    settings: Settings,
}

impl Pipeline {
    /// Creates a pipeline with the given settings.
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Returns the pipeline settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Builds the .app bundle: resolve, validate, icon, package.
    ///
    /// Fails fast: no packaging work starts until the binary is resolved
    /// and architecture-matched.
    pub async fn bundle_app(&self) -> Result<PathBuf> {
        let binary = resolver::resolve(&self.settings).await?;
        arch::validate(&binary).await?;

        let icon = icon::generate(&self.settings).await?;

        app::bundle_project(&self.settings, &binary, icon.as_deref()).await
    }

    /// Assembles the DMG installer from an already-built bundle.
    pub async fn assemble_installer(&self) -> Result<PathBuf> {
        dmg::assemble(&self.settings).await
    }

    /// Runs the full pipeline: app bundle, then installer.
    pub async fn run(&self) -> Result<(PathBuf, PathBuf)> {
        let bundle = self.bundle_app().await?;
        let installer = self.assemble_installer().await?;
        Ok((bundle, installer))
    }
}
