//! Pipeline settings and their builder.
//!
//! All values the pipeline stages need are threaded through one [`Settings`]
//! value constructed up front, instead of being read from ambient state by
//! each stage.

use std::path::{Path, PathBuf};

/// Name of the CLI executable embedded into the bundle.
///
/// The Amazon Q Developer CLI ships its binary under this exact name, and
/// archive extraction searches for it verbatim.
pub const Q_BINARY_NAME: &str = "q";

/// Main settings for one pipeline run.
///
/// Constructed via [`SettingsBuilder`]. Paths for the vendor cache, build
/// outputs, and installer artifacts are all derived from `project_dir`, so
/// a run never touches anything outside the project tree other than the
/// scoped temporary directories the stages create themselves.
///
/// # Examples
///
/// ```no_run
/// use qchat_bundler::bundler::SettingsBuilder;
///
/// # fn example() -> qchat_bundler::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .project_dir(".")
///     .product_name("QChat")
///     .version("1.0.0")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Settings {
    /// Product name used for the .app bundle, volume name, and DMG.
    product_name: String,

    /// Version string appended to the installer file name.
    version: String,

    /// Project root. Vendor cache, build/, dist/, and the final DMG all
    /// live under this directory.
    project_dir: PathBuf,

    /// GUI entry script handed to the packaging tool.
    entry_script: PathBuf,

    /// Explicitly supplied q binary, if any. Highest resolution priority.
    explicit_binary: Option<PathBuf>,

    /// Caller-supplied remote locator for the q binary, if any.
    download_url: Option<String>,

    /// Source image for icon generation.
    icon_source: PathBuf,

    /// Optional DMG window background image.
    dmg_background: PathBuf,

    /// Optional DMG volume icon.
    volume_icon: PathBuf,
}

impl Settings {
    /// Returns the product name.
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// Returns the version string.
    pub fn version_string(&self) -> &str {
        &self.version
    }

    /// Returns the project root directory.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Returns the GUI entry script path.
    pub fn entry_script(&self) -> PathBuf {
        self.project_dir.join(&self.entry_script)
    }

    /// Returns the explicitly supplied q binary path, if any.
    pub fn explicit_binary(&self) -> Option<&Path> {
        self.explicit_binary.as_deref()
    }

    /// Returns the caller-supplied remote locator, if any.
    pub fn download_url(&self) -> Option<&str> {
        self.download_url.as_deref()
    }

    /// Fixed vendor-cache path for the resolved q binary.
    ///
    /// A binary left here by a previous run is reused on the next one.
    pub fn vendor_binary_path(&self) -> PathBuf {
        self.project_dir.join("vendor").join(Q_BINARY_NAME)
    }

    /// Returns the icon source image path.
    pub fn icon_source(&self) -> PathBuf {
        self.project_dir.join(&self.icon_source)
    }

    /// Output path for the generated .icns icon container.
    pub fn icon_output_path(&self) -> PathBuf {
        self.project_dir
            .join("build")
            .join(format!("{}.icns", self.product_name))
    }

    /// Returns the DMG background image path (used only if it exists).
    pub fn dmg_background(&self) -> PathBuf {
        self.project_dir.join(&self.dmg_background)
    }

    /// Returns the DMG volume icon path (used only if it exists).
    pub fn volume_icon(&self) -> PathBuf {
        self.project_dir.join(&self.volume_icon)
    }

    /// Packaging tool work directory for this product.
    pub fn build_dir(&self) -> PathBuf {
        self.project_dir.join("build").join(&self.product_name)
    }

    /// Packaging tool output directory.
    pub fn dist_dir(&self) -> PathBuf {
        self.project_dir.join("dist")
    }

    /// The two acceptable bundle output locations, in precedence order.
    ///
    /// The packaging tool places the .app either directly under dist/ or
    /// nested inside a directory named after the product.
    pub fn bundle_candidates(&self) -> [PathBuf; 2] {
        let app_name = format!("{}.app", self.product_name);
        [
            self.dist_dir().join(&app_name),
            self.dist_dir().join(&self.product_name).join(&app_name),
        ]
    }

    /// Final installer path: `<Name>-<version>.dmg` in the project root.
    pub fn dmg_output_path(&self) -> PathBuf {
        self.project_dir
            .join(format!("{}-{}.dmg", self.product_name, self.version))
    }
}

/// Builder for constructing [`Settings`].
///
/// Only `project_dir` is required; everything else has a convention-based
/// default matching the repository layout.
#[derive(Default)]
pub struct SettingsBuilder {
    product_name: Option<String>,
    version: Option<String>,
    project_dir: Option<PathBuf>,
    entry_script: Option<PathBuf>,
    explicit_binary: Option<PathBuf>,
    download_url: Option<String>,
    icon_source: Option<PathBuf>,
    dmg_background: Option<PathBuf>,
    volume_icon: Option<PathBuf>,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the project root directory.
    ///
    /// # Required
    pub fn project_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.project_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the product name. Default: "QChat".
    pub fn product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    /// Sets the version string. Default: "0.1.0".
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the GUI entry script, relative to the project root.
    /// Default: "app.py".
    pub fn entry_script<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.entry_script = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets an explicitly supplied q binary path.
    pub fn explicit_binary<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        self.explicit_binary = path.map(|p| p.as_ref().to_path_buf());
        self
    }

    /// Sets a caller-supplied remote locator URL.
    pub fn download_url(mut self, url: Option<String>) -> Self {
        self.download_url = url;
        self
    }

    /// Sets the icon source image, relative to the project root.
    /// Default: "assets/icon.png".
    pub fn icon_source<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.icon_source = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the DMG background image, relative to the project root.
    /// Default: "assets/dmg-background.png".
    pub fn dmg_background<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.dmg_background = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the DMG volume icon, relative to the project root.
    /// Default: "assets/volume-icon.icns".
    pub fn volume_icon<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.volume_icon = Some(path.as_ref().to_path_buf());
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if `project_dir` is missing or the product name is
    /// empty.
    pub fn build(self) -> crate::bundler::Result<Settings> {
        use crate::bundler::error::Context;

        let project_dir = self.project_dir.context("project_dir is required")?;
        let product_name = self.product_name.unwrap_or_else(|| "QChat".into());
        if product_name.is_empty() {
            crate::bail!("product name cannot be empty");
        }

        Ok(Settings {
            product_name,
            version: self.version.unwrap_or_else(|| "0.1.0".into()),
            project_dir,
            entry_script: self.entry_script.unwrap_or_else(|| "app.py".into()),
            explicit_binary: self.explicit_binary,
            download_url: self.download_url,
            icon_source: self.icon_source.unwrap_or_else(|| "assets/icon.png".into()),
            dmg_background: self
                .dmg_background
                .unwrap_or_else(|| "assets/dmg-background.png".into()),
            volume_icon: self
                .volume_icon
                .unwrap_or_else(|| "assets/volume-icon.icns".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let settings = SettingsBuilder::new()
            .project_dir("/tmp/project")
            .build()
            .expect("settings");

        assert_eq!(settings.product_name(), "QChat");
        assert_eq!(
            settings.vendor_binary_path(),
            PathBuf::from("/tmp/project/vendor/q")
        );
        assert_eq!(
            settings.dmg_output_path(),
            PathBuf::from("/tmp/project/QChat-0.1.0.dmg")
        );
    }

    #[test]
    fn bundle_candidates_order() {
        let settings = SettingsBuilder::new()
            .project_dir("/tmp/project")
            .product_name("MyApp")
            .build()
            .expect("settings");

        let [top, nested] = settings.bundle_candidates();
        assert_eq!(top, PathBuf::from("/tmp/project/dist/MyApp.app"));
        assert_eq!(nested, PathBuf::from("/tmp/project/dist/MyApp/MyApp.app"));
    }

    #[test]
    fn empty_product_name_rejected() {
        let result = SettingsBuilder::new()
            .project_dir("/tmp/project")
            .product_name("")
            .build();
        assert!(result.is_err());
    }
}
