//! Command line interface for the packager.

mod args;

pub use args::{Args, Command};

use crate::bundler::{Pipeline, SettingsBuilder};
use crate::error::{CliError, Result};

/// Main CLI entry point.
///
/// Returns the process exit code: zero when every requested artifact was
/// produced, with all errors propagated to the caller for printing.
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();

    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let settings = SettingsBuilder::new()
        .project_dir(&args.project_dir)
        .product_name(&args.name)
        .version(&args.app_version)
        .entry_script(&args.entry_script)
        .explicit_binary(args.q_binary.as_deref())
        .download_url(args.q_download_url.clone())
        .icon_source(&args.icon_source)
        .build()?;

    let pipeline = Pipeline::new(settings);

    match args.command.unwrap_or(Command::All) {
        Command::App => {
            pipeline.bundle_app().await?;
        }
        Command::Dmg => {
            pipeline.assemble_installer().await?;
        }
        Command::All => {
            pipeline.run().await?;
        }
    }

    Ok(0)
}
