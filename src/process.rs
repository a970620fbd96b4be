//! External process helpers.
//!
//! Every tool the breeder shells out to goes through [`Cmd`] or
//! [`shell_with_args`], so a failing tool always surfaces as
//! [`BreederError::ExternalProcess`].

use std::ffi::OsString;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{BreederError, Result};

/// Check whether `program` can be found on `PATH`.
pub fn exists(program: &str) -> bool {
    which::which(program).is_ok()
}

/// Run `script` through `sh -c` with inherited stdio, binding `args` to `$1`, `$2`, ...
pub fn shell_with_args<I, S>(script: &str, args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    Cmd::new("sh")
        .arg("-c")
        .arg(script)
        .arg("sh")
        .args(args)
        .run_interactive()
}

/// Builder for a single external command.
#[derive(Debug)]
pub struct Cmd {
    program: String,
    args: Vec<OsString>,
    error_msg: Option<String>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            error_msg: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Hint appended to the error when the command fails.
    pub fn error_msg(mut self, msg: impl Into<String>) -> Self {
        self.error_msg = Some(msg.into());
        self
    }

    /// Run with the terminal attached and fail on a non-zero exit.
    pub fn run_interactive(self) -> Result<()> {
        debug!("arguments={:?} {:?}", self.program, self.args);

        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| BreederError::ExternalProcess {
                program: self.program.clone(),
                status: e.to_string(),
                hint: self.error_msg.clone(),
            })?;

        if !status.success() {
            return Err(BreederError::ExternalProcess {
                program: self.program,
                status: status.to_string(),
                hint: self.error_msg,
            });
        }
        Ok(())
    }
}
