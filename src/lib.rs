//! Build environments ("nests") for target platforms ("species") and the
//! package descriptions ("genomes") meant to be built inside them.
//!
//! - **Catalog / species** - `species.yaml` holds a `common` entry plus one
//!   entry per target; each target is overlaid onto `common` and its package
//!   lists are resolved so target-level choices win
//! - **Nests** - a bootstrapped root filesystem per target, archived as
//!   `nests/<target>.cpio.gz` with a `nests/<target>.yaml` record of when and
//!   what was built
//! - **Genomes** - name, version and dependency lists of a package to hatch
//!
//! # Example
//!
//! ```rust,ignore
//! use package_breeder::Breeder;
//! use std::path::Path;
//!
//! let breeder = Breeder::open(Path::new("/srv/breeder"))?;
//! for status in breeder.species() {
//!     println!("{status}");
//! }
//! breeder.build_nests()?;
//! ```

pub mod artifact;
pub mod bootstrap;
pub mod breeder;
pub mod catalog;
pub mod config;
pub mod error;
pub mod genome;
pub mod nest;
pub mod preflight;
pub mod process;
pub mod schema;
pub mod specie;

pub use breeder::{Breeder, Hatching, NestStatus, SpecieStatus};
pub use catalog::Catalog;
pub use config::{BreederConfig, BreederLayout};
pub use error::{BreederError, Result};
pub use genome::Genome;
pub use nest::{EnsureOutcome, Nest, NestBuilder, NestState, NestStore};
pub use specie::{PackageSet, Specie};
