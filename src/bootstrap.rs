//! Debootstrap-based [`NestBuilder`].

use std::fs;
use std::path::Path;

use crate::artifact::cpio::build_cpio;
use crate::config::BreederConfig;
use crate::error::{BreederError, Result};
use crate::nest::NestBuilder;
use crate::preflight::{bootstrap_package, check_nest_tools};
use crate::process::Cmd;
use crate::specie::Specie;

/// Runs `<bootstrap> --arch=.. --include=.. --exclude=.. <distribution> <workspace>`
/// and archives the result with cpio + gzip.
#[derive(Debug, Clone)]
pub struct DebootstrapBuilder {
    tool: String,
    gzip_level: u32,
}

impl DebootstrapBuilder {
    pub fn new(config: &BreederConfig) -> Self {
        Self {
            tool: config.bootstrap.clone(),
            gzip_level: config.gzip_level,
        }
    }

    /// Full argument list passed to the bootstrap tool.
    pub fn command_args(specie: &Specie, workspace: &Path) -> Vec<String> {
        let mut args = specie.bootstrap_args();
        args.push(workspace.display().to_string());
        args
    }
}

impl NestBuilder for DebootstrapBuilder {
    fn preflight(&self) -> Result<()> {
        check_nest_tools(&self.tool)
    }

    fn populate(&self, specie: &Specie, workspace: &Path) -> Result<()> {
        if let Some(parent) = workspace.parent() {
            fs::create_dir_all(parent).map_err(|e| BreederError::io(parent, e))?;
        }

        Cmd::new(&self.tool)
            .args(Self::command_args(specie, workspace))
            .error_msg(format!(
                "bootstrapping \"{}\" failed; is {} installed and are you root?",
                specie.name(),
                bootstrap_package(&self.tool)
            ))
            .run_interactive()
    }

    fn archive(&self, workspace: &Path, image: &Path) -> Result<()> {
        build_cpio(workspace, image, self.gzip_level)
    }
}
