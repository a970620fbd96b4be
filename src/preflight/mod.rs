//! Preflight checks for nest builds.
//!
//! Validates that the host system has the bootstrap and archiving tools
//! before the old nest workspace is removed.
//!
//! # Example
//!
//! ```rust
//! use package_breeder::preflight::{check_required_tools, command_exists};
//!
//! if !command_exists("qemu-debootstrap") {
//!     println!("qemu-user-static not installed");
//! }
//!
//! let tools = &[("cpio", "cpio"), ("gzip", "gzip")];
//! if let Err(e) = check_required_tools(tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use tracing::warn;

use crate::error::{BreederError, Result};
use crate::process;

/// Check if a command exists on the host system.
pub fn command_exists(cmd: &str) -> bool {
    process::exists(cmd)
}

/// Tools used by the archive pipeline.
///
/// Each tuple is (command_name, package_name).
pub const ARCHIVE_TOOLS: &[(&str, &str)] = &[
    ("find", "findutils"),
    ("sort", "coreutils"),
    ("cpio", "cpio"),
    ("gzip", "gzip"),
];

/// Debian package providing a bootstrap tool, used in error hints.
pub fn bootstrap_package(tool: &str) -> &'static str {
    match tool {
        "qemu-debootstrap" => "qemu-user-static",
        "mmdebstrap" => "mmdebstrap",
        _ => "debootstrap",
    }
}

/// Check that specific tools are available.
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` listing every missing tool and its package
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .map(|(tool, package)| format!("{} (install: {})", tool, package))
        .collect::<Vec<_>>();

    if !missing.is_empty() {
        return Err(BreederError::ExternalProcess {
            program: "preflight".to_string(),
            status: "missing required host tools".to_string(),
            hint: Some(missing.join(", ")),
        });
    }

    Ok(())
}

/// Check the bootstrap tool and the archive pipeline.
pub fn check_nest_tools(bootstrap: &str) -> Result<()> {
    let mut tools = vec![(bootstrap, bootstrap_package(bootstrap))];
    tools.extend_from_slice(ARCHIVE_TOOLS);
    check_required_tools(&tools)?;

    // SAFETY: geteuid has no preconditions and cannot fail.
    if unsafe { libc::geteuid() } != 0 {
        warn!("Not running as root; {} will most likely fail", bootstrap);
    }
    Ok(())
}
