//! Finder window layout for the mounted installer image.
//!
//! Mounts the writable image, runs an AppleScript that arranges the volume
//! window (icon view, fixed bounds, app on the left, Applications shortcut
//! on the right), flushes filesystem state so the .DS_Store persists, and
//! detaches. The mount is detached best-effort even when a step fails.

use crate::bundler::{
    error::{Error, Result},
    settings::Settings,
};
use regex::Regex;
use std::path::Path;
use tokio::time::Duration;

/// A mounted writable image: device node plus Finder-visible mount point.
struct Mount {
    device: String,
    volume: String,
}

/// Applies the drag-to-install Finder layout to a writable image.
pub async fn apply_finder_layout(rw_image: &Path, settings: &Settings) -> Result<()> {
    log::info!("Applying installer window layout...");

    let mount = attach_rw(rw_image).await?;

    let result = run_layout_script(&mount, settings).await;

    // Flush and detach regardless of the script outcome
    flush().await;
    detach(&mount).await;

    result?;
    log::info!("✓ Installer window layout applied");
    Ok(())
}

/// Mounts the image read-write and parses the device and mount point from
/// the hdiutil attach output.
async fn attach_rw(rw_image: &Path) -> Result<Mount> {
    log::debug!("Mounting {} for customization...", rw_image.display());

    let output = tokio::process::Command::new("hdiutil")
        .arg("attach")
        .arg(rw_image)
        .arg("-readwrite")
        .arg("-noverify")
        .arg("-nobrowse")
        .output()
        .await
        .map_err(|error| Error::CommandFailed {
            command: "hdiutil attach".into(),
            error,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::GenericError(format!(
            "Failed to mount installer image: {}",
            stderr
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_attach_output(&stdout).ok_or_else(|| {
        Error::GenericError(format!(
            "Could not parse hdiutil attach output:\n{}",
            stdout
        ))
    })
}

/// Extracts the device node and volume path from hdiutil attach output.
///
/// The relevant line looks like:
/// `/dev/disk4s1    Apple_HFS    /Volumes/QChat`
fn parse_attach_output(stdout: &str) -> Option<Mount> {
    let re = Regex::new(r"(?m)^(/dev/\S+)\s+\S+\s+(/Volumes/.+?)\s*$").ok()?;
    let captures = re.captures(stdout)?;
    Some(Mount {
        device: captures.get(1)?.as_str().to_string(),
        volume: captures.get(2)?.as_str().to_string(),
    })
}

/// Escape special characters for AppleScript string literals.
fn escape_applescript_string(s: &str) -> String {
    s.replace('\\', r"\\").replace('"', r#"\""#)
}

/// Builds the Finder layout script for a volume.
///
/// Positions suggest the left-to-right drag gesture: the app at {180, 170},
/// the Applications shortcut at {480, 170}.
pub fn finder_layout_script(volume_name: &str, app_name: &str, has_background: bool) -> String {
    let escaped_volume = escape_applescript_string(volume_name);
    let escaped_app = escape_applescript_string(app_name);

    let background_clause = if has_background {
        r#"set background picture of viewOptions to file ".background:background.png""#
    } else {
        ""
    };

    format!(
        r#"
        tell application "Finder"
            tell disk "{escaped_volume}"
                open
                set current view of container window to icon view
                set toolbar visible of container window to false
                set statusbar visible of container window to false
                set bounds of container window to {{100, 100, 700, 500}}
                set viewOptions to icon view options of container window
                set arrangement of viewOptions to not arranged
                set icon size of viewOptions to 72
                {background_clause}
                set position of item "{escaped_app}" to {{180, 170}}
                set position of item "Applications" to {{480, 170}}
                close
                open
                update without registering applications
                delay 2
            end tell
        end tell
        "#
    )
}

/// Runs the layout script against the mounted volume.
async fn run_layout_script(mount: &Mount, settings: &Settings) -> Result<()> {
    let volume_name = mount
        .volume
        .strip_prefix("/Volumes/")
        .unwrap_or(&mount.volume);
    let app_name = format!("{}.app", settings.product_name());
    let has_background = mount_has_background(&mount.volume);

    let script = finder_layout_script(volume_name, &app_name, has_background);

    let output = tokio::process::Command::new("osascript")
        .arg("-e")
        .arg(&script)
        .output()
        .await
        .map_err(|error| Error::CommandFailed {
            command: "osascript".into(),
            error,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::GenericError(format!(
            "Finder layout script failed: {}",
            stderr
        )));
    }

    Ok(())
}

/// Whether the staged background made it onto the mounted volume.
fn mount_has_background(volume: &str) -> bool {
    Path::new(volume).join(".background/background.png").is_file()
}

/// Flushes filesystem state so the layout persists in the image.
async fn flush() {
    let _ = tokio::process::Command::new("sync").output().await;
    // Give Finder a moment to write the .DS_Store
    tokio::time::sleep(Duration::from_secs(2)).await;
}

/// Detaches the mounted image, best effort with a force fallback.
async fn detach(mount: &Mount) {
    log::debug!("Detaching {}...", mount.device);

    let output = tokio::process::Command::new("hdiutil")
        .arg("detach")
        .arg(&mount.device)
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => {}
        _ => {
            log::warn!("Detach of {} had issues, forcing", mount.device);
            let _ = tokio::process::Command::new("hdiutil")
                .arg("detach")
                .arg(&mount.device)
                .arg("-force")
                .output()
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_output_parsing() {
        let stdout = "/dev/disk4          GUID_partition_scheme\n\
                      /dev/disk4s1        Apple_HFS               /Volumes/QChat\n";
        let mount = parse_attach_output(stdout).expect("mount");
        assert_eq!(mount.device, "/dev/disk4s1");
        assert_eq!(mount.volume, "/Volumes/QChat");
    }

    #[test]
    fn attach_output_without_volume_is_rejected() {
        assert!(parse_attach_output("/dev/disk4 GUID_partition_scheme\n").is_none());
    }

    #[test]
    fn layout_script_positions_icons_left_to_right() {
        let script = finder_layout_script("QChat", "QChat.app", false);
        assert!(script.contains(r#"set position of item "QChat.app" to {180, 170}"#));
        assert!(script.contains(r#"set position of item "Applications" to {480, 170}"#));
        assert!(script.contains("set toolbar visible of container window to false"));
        assert!(script.contains("set icon size of viewOptions to 72"));
        assert!(!script.contains("background picture"));
    }

    #[test]
    fn layout_script_applies_background_when_present() {
        let script = finder_layout_script("QChat", "QChat.app", true);
        assert!(script.contains(r#".background:background.png"#));
    }

    #[test]
    fn script_escapes_quotes_in_names() {
        let script = finder_layout_script(r#"My"Vol"#, "App.app", false);
        assert!(script.contains(r#"My\"Vol"#));
    }
}
