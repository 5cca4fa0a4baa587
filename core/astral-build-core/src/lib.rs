//! astral-build-core: the two chores every Astral build needs done
//!
//! Shaders have to become SPIR-V before the renderer can load them, and a
//! failed native build has to be read by someone. This crate does both so
//! the command-line front-ends stay thin.
//!
//! ## Shader compilation
//!
//! - Scans a shader directory (default `assets/shaders`) for the stage
//!   extensions `.vert .frag .comp .geom .tesc .tese`
//! - Hands each file to an external compiler (`glslc` by default) as
//!   `<input> -o <input>.spv`
//! - Reports every file on its own; one broken shader never stops the rest
//! - Compiles sequentially, or on a rayon pool when asked to
//!
//! ## Build inspection
//!
//! - Runs the build (default `cmake --build build --config Release`) with
//!   stderr folded into stdout so the interleaving survives
//! - Decodes the bytes with the first of `utf-8`, `utf-16`, `cp1252`,
//!   `latin1` that fits, dropping to a lossy decode when none does
//! - Flags every line mentioning `error` or `warning` (any case) together
//!   with the two lines after it
//! - Falls back to the last 20 lines when nothing was flagged
//!
//! ## Example
//!
//! ```rust,no_run
//! use astral_build_core::inspect::BuildInspector;
//! use astral_build_core::process::BuildCommand;
//! use astral_build_core::report::write_analysis;
//!
//! let command = BuildCommand::new("cmake", ["--build", "build", "--config", "Release"]);
//! let report = BuildInspector::default().inspect(&command)?;
//!
//! write_analysis(&report.analysis, std::io::stdout().lock())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Configuration lives in [`config::Config`]; every setting has a default so
//! both tools run with no file at all.

pub mod config;
pub mod decode;
pub mod error;
pub mod inspect;
pub mod process;
pub mod report;
pub mod scan;
pub mod shaders;

pub use error::BuildToolError;
