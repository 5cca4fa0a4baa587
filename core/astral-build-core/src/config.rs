// =============================================================================
// CONFIGURATION - Load tool settings from astral-tools.toml
// =============================================================================
//
// Both tools run with no arguments against fixed defaults. A TOML file can
// override any of them; command-line flags override the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::decode::{Decoder, Encoding, DEFAULT_ENCODINGS};
use crate::error::BuildToolError;
use crate::process::BuildCommand;
use crate::scan::{DiagnosticScanner, DEFAULT_CONTEXT_LINES, DEFAULT_MARKERS, DEFAULT_TAIL_LINES};
use crate::shaders::{DEFAULT_EXTENSIONS, DEFAULT_OUTPUT_SUFFIX, DEFAULT_SHADER_DIR};

/// File picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "astral-tools.toml";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub shaders: ShaderConfig,
    pub inspect: InspectConfig,
}

/// compile-shaders settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    pub dir: PathBuf,
    pub compiler: String,
    /// Passed to the compiler before the input path.
    pub compiler_args: Vec<String>,
    /// Recognised extensions; a leading dot is optional.
    pub extensions: Vec<String>,
    pub output_suffix: String,
    pub recursive: bool,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_SHADER_DIR),
            compiler: "glslc".to_string(),
            compiler_args: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| format!(".{e}")).collect(),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            recursive: false,
        }
    }
}

impl ShaderConfig {
    /// Extensions without their leading dot, as `Path::extension` reports them.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .collect()
    }
}

/// debug-build settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
    /// Program followed by its arguments.
    pub command: Vec<String>,
    pub encodings: Vec<Encoding>,
    pub markers: Vec<String>,
    pub context_lines: usize,
    pub tail_lines: usize,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            command: ["cmake", "--build", "build", "--config", "Release"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            encodings: DEFAULT_ENCODINGS.to_vec(),
            markers: DEFAULT_MARKERS.iter().map(|s| s.to_string()).collect(),
            context_lines: DEFAULT_CONTEXT_LINES,
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }
}

impl InspectConfig {
    pub fn build_command(&self) -> Result<BuildCommand, BuildToolError> {
        BuildCommand::from_argv(self.command.iter().cloned())
    }

    pub fn decoder(&self) -> Decoder {
        Decoder::new(self.encodings.iter().copied())
    }

    pub fn scanner(&self) -> DiagnosticScanner {
        DiagnosticScanner::new()
            .with_markers(&self.markers)
            .with_context_lines(self.context_lines)
    }
}

impl Config {
    /// Load `explicit` if given (it must exist), else the default file in
    /// the working directory if present, else built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_path(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if !path.exists() {
                    log::debug!("no {DEFAULT_CONFIG_FILE} in working directory, using defaults");
                    return Ok(Config::default());
                }
                Self::load_from_path(path)
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded configuration from {}", path.display());
        log::debug!("Config: {config:?}");

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), BuildToolError> {
        self.inspect.build_command()?;
        if self.shaders.compiler.trim().is_empty() {
            return Err(BuildToolError::InvalidConfig(
                "shader compiler is empty".to_string(),
            ));
        }
        if self.shaders.output_suffix.is_empty() {
            return Err(BuildToolError::InvalidConfig(
                "output suffix is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml_str("").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.shaders.dir, PathBuf::from("assets/shaders"));
        assert_eq!(
            config.inspect.build_command().expect("command").to_string(),
            "cmake --build build --config Release"
        );
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [shaders]
            compiler = "glslangValidator"
            extensions = [".vert", "frag"]

            [inspect]
            encodings = ["utf-16", "Windows-1252"]
            tail_lines = 5
            "#,
        )
        .expect("parse");

        assert_eq!(config.shaders.compiler, "glslangValidator");
        assert_eq!(config.shaders.normalized_extensions(), vec!["vert", "frag"]);
        assert_eq!(config.shaders.output_suffix, ".spv");
        assert_eq!(config.inspect.encodings, vec![Encoding::Utf16, Encoding::Cp1252]);
        assert_eq!(config.inspect.tail_lines, 5);
        assert_eq!(config.inspect.context_lines, 2);
    }

    #[test]
    fn rejects_unknown_encoding() {
        let err = Config::from_toml_str("[inspect]\nencodings = [\"mbcs\"]\n");
        assert!(err.is_err());
    }

    #[test]
    fn rejects_empty_build_command() {
        let err = Config::from_toml_str("[inspect]\ncommand = []\n");
        assert!(err.is_err());
    }
}
