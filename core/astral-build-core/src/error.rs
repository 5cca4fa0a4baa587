//! Error types shared by the shader compiler and the build inspector

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures the tools surface to their callers.
///
/// Decoding has no variant: the decode chain always ends in a lossy
/// fallback, so it cannot fail.
#[derive(Debug, Error)]
pub enum BuildToolError {
    #[error("Directory {} does not exist.", .0.display())]
    MissingDirectory(PathBuf),

    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to capture output of `{program}`: {source}")]
    Capture {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
