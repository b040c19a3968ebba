//! Command line argument parsing and validation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// macOS packager for the Amazon Q CLI chat GUI
#[derive(Parser, Debug)]
#[command(
    name = "qchat_bundler",
    version,
    about = "Packages the Amazon Q CLI chat GUI into a macOS .app and DMG installer",
    long_about = "Resolves the Amazon Q Developer CLI binary (explicit path, vendor cache, or \
download), validates its architecture against the host, generates the app icon, builds the \
.app bundle with PyInstaller, and assembles a drag-to-install DMG.

Usage:
  qchat_bundler app                         # build the .app bundle
  qchat_bundler dmg                         # assemble the installer from an existing bundle
  qchat_bundler all                         # both, in order
  QCHAT_Q_BINARY=/usr/local/bin/q qchat_bundler all

Exit code 0 = requested artifacts exist at their conventional paths."
)]
pub struct Args {
    /// What to build. Defaults to the full pipeline.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Product name used for the bundle, volume, and installer
    #[arg(long, default_value = "QChat")]
    pub name: String,

    /// Version string for the installer file name
    #[arg(long, default_value = "0.1.0")]
    pub app_version: String,

    /// Project root directory
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub project_dir: PathBuf,

    /// GUI entry script handed to the packaging tool
    #[arg(long, default_value = "app.py", value_name = "FILE")]
    pub entry_script: PathBuf,

    /// Explicit q binary to embed, used verbatim when executable
    #[arg(long, env = "QCHAT_Q_BINARY", value_name = "PATH")]
    pub q_binary: Option<PathBuf>,

    /// Remote locator for the q binary (.dmg, .zip, or raw executable)
    #[arg(long, env = "QCHAT_Q_DOWNLOAD_URL", value_name = "URL")]
    pub q_download_url: Option<String>,

    /// Source image for icon generation
    #[arg(long, default_value = "assets/icon.png", value_name = "FILE")]
    pub icon_source: PathBuf,
}

/// Pipeline stage selection.
#[derive(Subcommand, Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    /// Build the .app bundle
    App,
    /// Assemble the DMG installer from an existing bundle
    Dmg,
    /// Build the bundle, then assemble the installer
    All,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Product name cannot be empty".to_string());
        }

        if let Some(url) = &self.q_download_url {
            url::Url::parse(url).map_err(|e| format!("Invalid download URL {url}: {e}"))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_full_pipeline() {
        let args = Args::parse_from(["qchat_bundler"]);
        assert_eq!(args.command, None);
        assert_eq!(args.name, "QChat");
        assert!(args.validate().is_ok());
    }

    #[test]
    fn invalid_url_rejected() {
        let args = Args::parse_from(["qchat_bundler", "--q-download-url", "not a url", "app"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn subcommand_parses() {
        let args = Args::parse_from(["qchat_bundler", "dmg"]);
        assert_eq!(args.command, Some(Command::Dmg));
    }
}
