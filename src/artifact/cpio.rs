//! CPIO archive creation for nest images.

use std::path::Path;

use crate::error::{BreederError, Result};
use crate::process::shell_with_args;

/// Build a compressed cpio archive from a directory.
///
/// Entries are archived in sorted order (newc format) so two identical
/// workspaces produce identical archives before compression.
///
/// # Arguments
///
/// * `root` - Bootstrapped nest workspace
/// * `output` - Path for the output .cpio.gz file
/// * `gzip_level` - Gzip compression level (1-9, higher = smaller but slower)
///
/// # Example
///
/// ```rust,ignore
/// use package_breeder::artifact::cpio::build_cpio;
/// use std::path::Path;
///
/// build_cpio(
///     Path::new("/srv/breeder/nests/bookworm-amd64"),
///     Path::new("/srv/breeder/nests/bookworm-amd64.cpio.gz"),
///     9,
/// )?;
/// ```
pub fn build_cpio(root: &Path, output: &Path, gzip_level: u32) -> Result<()> {
    if !root.is_dir() {
        return Err(BreederError::missing("nest workspace", root));
    }

    // Paths travel as positional parameters so quotes in them stay inert.
    let pipeline = format!(
        "cd \"$1\" && find . | sort | cpio -o -H newc --quiet | gzip -{gzip_level} > \"$2\""
    );

    shell_with_args(&pipeline, [root.as_os_str(), output.as_os_str()])
}
