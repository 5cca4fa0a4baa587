//! Shader discovery and batch compilation for astral-build-core

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Result;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::decode::{Decoder, RawOutput};
use crate::error::BuildToolError;

/// Directory compiled when nothing else is configured, relative to the
/// working directory.
pub const DEFAULT_SHADER_DIR: &str = "assets/shaders";

/// Shader-stage extensions recognised by default.
pub const DEFAULT_EXTENSIONS: [&str; 6] = ["vert", "frag", "comp", "geom", "tesc", "tese"];

/// Appended to the full input file name to name the artifact.
pub const DEFAULT_OUTPUT_SUFFIX: &str = ".spv";

/// Path to a shader source file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ShaderSource {
    pub path: PathBuf,
}

impl ShaderSource {
    /// File name for reporting, falling back to the full path.
    pub fn name(&self) -> String {
        display_name(&self.path)
    }
}

/// Directory scanner that collects files with recognised shader extensions.
#[derive(Debug, Clone)]
pub struct ShaderDiscovery {
    root: PathBuf,
    extensions: Vec<String>,
    recursive: bool,
    follow_symlinks: bool,
}

impl ShaderDiscovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            recursive: false,
            follow_symlinks: true,
        }
    }

    /// Extensions without the leading dot, matched case-sensitively.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Symlinked shaders are compiled unless this is turned off.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Matching files sorted by path. Unreadable entries are logged and
    /// skipped.
    pub fn discover(&self) -> Result<Vec<ShaderSource>, BuildToolError> {
        if !self.root.exists() {
            return Err(BuildToolError::MissingDirectory(self.root.clone()));
        }

        let mut walker = WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(self.follow_symlinks);
        if !self.recursive {
            walker = walker.max_depth(1);
        }

        let mut found = Vec::new();
        for entry in walker.sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("skipping unreadable entry under {}: {err}", self.root.display());
                    continue;
                }
            };
            if entry.file_type().is_file() && self.is_shader(entry.path()) {
                found.push(ShaderSource {
                    path: entry.path().to_path_buf(),
                });
            }
        }

        log::debug!("found {} shader sources under {}", found.len(), self.root.display());
        Ok(found)
    }

    fn is_shader(&self, path: &Path) -> bool {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.extensions.iter().any(|known| known == ext),
            None => false,
        }
    }
}

/// `input` with `suffix` appended to its full file name.
pub fn output_path_for(input: &Path, suffix: &str) -> PathBuf {
    let mut raw = OsString::from(input.as_os_str());
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Result of compiling one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "diagnostics", rename_all = "snake_case")]
pub enum CompileOutcome {
    Success,
    Failure(String),
}

impl CompileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CompileOutcome::Success)
    }
}

/// One source file, its artifact path, and how the compile went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRecord {
    pub source: PathBuf,
    pub output: PathBuf,
    pub outcome: CompileOutcome,
}

impl CompileRecord {
    pub fn name(&self) -> String {
        display_name(&self.source)
    }
}

/// Anything that turns one shader source into one artifact.
pub trait ShaderCompiler: Sync {
    fn compile(&self, input: &Path, output: &Path) -> CompileOutcome;
}

impl<T: ShaderCompiler + ?Sized> ShaderCompiler for &T {
    fn compile(&self, input: &Path, output: &Path) -> CompileOutcome {
        (**self).compile(input, output)
    }
}

/// Runs `<program> [args...] <input> -o <output>` and reads diagnostics from
/// its stderr.
#[derive(Debug, Clone)]
pub struct ExternalCompiler {
    program: String,
    args: Vec<String>,
}

impl ExternalCompiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for ExternalCompiler {
    fn default() -> Self {
        Self::new("glslc")
    }
}

impl ShaderCompiler for ExternalCompiler {
    fn compile(&self, input: &Path, output: &Path) -> CompileOutcome {
        log::debug!(
            "{} {} -o {}",
            self.program,
            input.display(),
            output.display()
        );

        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(input)
            .arg("-o")
            .arg(output)
            .output();

        match result {
            Ok(out) if out.status.success() => CompileOutcome::Success,
            Ok(out) => {
                log::info!("{} failed on {} ({})", self.program, input.display(), out.status);
                let stderr = Decoder::default().decode(RawOutput::new(out.stderr));
                CompileOutcome::Failure(stderr.into_string())
            }
            Err(source) => CompileOutcome::Failure(
                BuildToolError::Launch {
                    program: self.program.clone(),
                    source,
                }
                .to_string(),
            ),
        }
    }
}

/// Receives progress while a batch runs.
pub trait BatchObserver {
    fn started(&mut self, _source: &ShaderSource) -> io::Result<()> {
        Ok(())
    }

    fn finished(&mut self, record: &CompileRecord) -> io::Result<()>;
}

/// What a batch run amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The shader directory is absent; nothing was compiled.
    MissingDirectory(PathBuf),
    Completed(Vec<CompileRecord>),
}

impl BatchOutcome {
    pub fn records(&self) -> &[CompileRecord] {
        match self {
            BatchOutcome::MissingDirectory(_) => &[],
            BatchOutcome::Completed(records) => records,
        }
    }

    pub fn failed(&self) -> usize {
        self.records()
            .iter()
            .filter(|r| !r.outcome.is_success())
            .count()
    }
}

/// Compiles every discovered shader with one compiler.
#[derive(Debug, Clone)]
pub struct ShaderBatch<C> {
    discovery: ShaderDiscovery,
    compiler: C,
    output_suffix: String,
    jobs: Option<usize>,
}

impl<C: ShaderCompiler> ShaderBatch<C> {
    pub fn new(discovery: ShaderDiscovery, compiler: C) -> Self {
        Self {
            discovery,
            compiler,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            jobs: None,
        }
    }

    pub fn with_output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.output_suffix = suffix.into();
        self
    }

    /// Worker threads; `None` or `Some(1)` compiles sequentially, `Some(0)`
    /// lets rayon pick.
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Compile every source. A failed file never stops the batch.
    ///
    /// Sequential runs notify the observer around each compile. Parallel
    /// runs notify after the pool drains, still in path order.
    pub fn run(&self, observer: &mut impl BatchObserver) -> Result<BatchOutcome> {
        let sources = match self.discovery.discover() {
            Ok(sources) => sources,
            Err(BuildToolError::MissingDirectory(dir)) => {
                log::warn!("shader directory {} does not exist", dir.display());
                return Ok(BatchOutcome::MissingDirectory(dir));
            }
            Err(err) => return Err(err.into()),
        };

        let records = match self.jobs {
            Some(jobs) if jobs != 1 => {
                let pool = ThreadPoolBuilder::new().num_threads(jobs).build()?;
                let records: Vec<CompileRecord> =
                    pool.install(|| sources.par_iter().map(|s| self.compile_one(s)).collect());
                for (source, record) in sources.iter().zip(&records) {
                    observer.started(source)?;
                    observer.finished(record)?;
                }
                records
            }
            _ => {
                let mut records = Vec::with_capacity(sources.len());
                for source in &sources {
                    observer.started(source)?;
                    let record = self.compile_one(source);
                    observer.finished(&record)?;
                    records.push(record);
                }
                records
            }
        };

        let outcome = BatchOutcome::Completed(records);
        log::info!(
            "compiled {} shaders, {} failed",
            outcome.records().len(),
            outcome.failed()
        );
        Ok(outcome)
    }

    fn compile_one(&self, source: &ShaderSource) -> CompileRecord {
        let output = output_path_for(&source.path, &self.output_suffix);
        let outcome = self.compiler.compile(&source.path, &output);
        CompileRecord {
            source: source.path.clone(),
            output,
            outcome,
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn appends_suffix_to_full_file_name() {
        assert_eq!(
            output_path_for(Path::new("assets/shaders/cube.vert"), ".spv"),
            PathBuf::from("assets/shaders/cube.vert.spv")
        );
    }

    #[test]
    fn recognises_shader_extensions_case_sensitively() {
        let discovery = ShaderDiscovery::new("/shaders");
        assert!(discovery.is_shader(Path::new("/shaders/a.vert")));
        assert!(discovery.is_shader(Path::new("/shaders/a.tese")));
        assert!(!discovery.is_shader(Path::new("/shaders/a.VERT")));
        assert!(!discovery.is_shader(Path::new("/shaders/a.vert.spv")));
        assert!(!discovery.is_shader(Path::new("/shaders/.vert")));
    }

    #[test]
    fn skips_nested_directories_unless_recursive() {
        let tmp = tempdir().expect("tempdir");
        let nested = tmp.path().join("post");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(tmp.path().join("top.frag"), b"").expect("touch");
        fs::write(nested.join("blur.comp"), b"").expect("touch");

        let flat = ShaderDiscovery::new(tmp.path()).discover().expect("discover");
        assert_eq!(flat.len(), 1);
        assert!(flat[0].path.ends_with("top.frag"));

        let deep = ShaderDiscovery::new(tmp.path())
            .recursive(true)
            .discover()
            .expect("discover");
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn directories_named_like_shaders_are_ignored() {
        let tmp = tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("odd.vert")).expect("mkdir");

        let found = ShaderDiscovery::new(tmp.path()).discover().expect("discover");
        assert!(found.is_empty());
    }

    #[test]
    fn missing_compiler_is_reported_as_failure() {
        let tmp = tempdir().expect("tempdir");
        let input = tmp.path().join("a.vert");
        fs::write(&input, b"void main() {}").expect("touch");

        let compiler = ExternalCompiler::new("astral-missing-glslc");
        let outcome = compiler.compile(&input, &output_path_for(&input, ".spv"));

        match outcome {
            CompileOutcome::Failure(text) => assert!(text.contains("astral-missing-glslc")),
            CompileOutcome::Success => panic!("compile should fail"),
        }
    }
}
