//! External tool detection and availability checking.
//!
//! Icon generation needs the platform's `sips` and `iconutil` utilities.
//! Their absence is non-fatal: the pipeline skips icon generation and
//! packages the app without an icon.

use std::sync::LazyLock;

/// Check if sips is available for image resizing.
///
/// Cached result to avoid repeated lookups during a run.
pub static HAS_SIPS: LazyLock<bool> = LazyLock::new(|| match which::which("sips") {
    Ok(path) => {
        log::debug!("Found sips at: {}", path.display());
        true
    }
    Err(e) => {
        log::debug!("sips not found in PATH: {}", e);
        false
    }
});

/// Check if iconutil is available for .icns creation.
pub static HAS_ICONUTIL: LazyLock<bool> = LazyLock::new(|| match which::which("iconutil") {
    Ok(path) => {
        log::debug!("Found iconutil at: {}", path.display());
        true
    }
    Err(e) => {
        log::debug!("iconutil not found in PATH: {}", e);
        false
    }
});

/// Reports whether the full icon toolchain is available.
pub fn icon_tooling_available() -> bool {
    *HAS_SIPS && *HAS_ICONUTIL
}
