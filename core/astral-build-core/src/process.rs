//! External command execution with merged output capture (astral-build-core)

use std::fmt;
use std::io::{self, Read};
use std::process::{Command, ExitStatus};

use crate::decode::RawOutput;
use crate::error::BuildToolError;

/// A program plus its fixed argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    program: String,
    args: Vec<String>,
}

impl BuildCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from an argv-style list: program first, then its arguments.
    pub fn from_argv<I, S>(argv: I) -> Result<Self, BuildToolError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parts = argv.into_iter().map(Into::into);
        let program = parts
            .next()
            .filter(|p: &String| !p.trim().is_empty())
            .ok_or_else(|| BuildToolError::InvalidConfig("build command is empty".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A finished process and everything it wrote.
#[derive(Debug)]
pub struct CapturedRun {
    pub status: ExitStatus,
    pub output: RawOutput,
}

/// Run `command` to completion with stderr and stdout sharing one pipe, so
/// the captured bytes keep the order the tool wrote them in.
pub fn run_merged(command: &BuildCommand) -> Result<CapturedRun, BuildToolError> {
    let launch_error = |source: io::Error| BuildToolError::Launch {
        program: command.program.clone(),
        source,
    };

    let (mut reader, writer) = io::pipe().map_err(launch_error)?;

    // The Command holds copies of the write end; it must be dropped before
    // reading or the read never sees EOF.
    let mut child = {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdout(writer.try_clone().map_err(launch_error)?)
            .stderr(writer);
        log::debug!("spawning `{command}`");
        cmd.spawn().map_err(launch_error)?
    };

    let mut bytes = Vec::new();
    let read = reader.read_to_end(&mut bytes);
    let status = child.wait();

    let capture_error = |source: io::Error| BuildToolError::Capture {
        program: command.program.clone(),
        source,
    };
    read.map_err(capture_error)?;
    let status = status.map_err(capture_error)?;

    log::info!("`{command}` exited with {status} after writing {} bytes", bytes.len());
    Ok(CapturedRun {
        status,
        output: RawOutput::new(bytes),
    })
}
