//! Nest image artifacts.
//!
//! - [`cpio`] - Gzip-compressed cpio archive of a bootstrapped workspace
//! - [`checksum`] - `sha256sum`-compatible sidecar for an image

pub mod checksum;
pub mod cpio;
