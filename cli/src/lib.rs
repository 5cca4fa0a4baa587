//! astral build tools CLI: compile-shaders and debug-build

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, ValueHint};
use log::LevelFilter;
use serde::Serialize;

use astral_build_core::config::{Config, InspectConfig, ShaderConfig};
use astral_build_core::inspect::BuildInspector;
use astral_build_core::process::BuildCommand;
use astral_build_core::report::{
    write_analysis, write_json_pretty, write_missing_directory, write_ndjson, SilentReporter,
    TextReporter,
};
use astral_build_core::shaders::{
    BatchOutcome, CompileRecord, ExternalCompiler, ShaderBatch, ShaderDiscovery,
};

/// Compile every shader in the asset directory to SPIR-V.
#[derive(Debug, Parser)]
#[command(
    name = "compile-shaders",
    about = "Compile every shader in the asset directory to SPIR-V"
)]
pub struct CompileShadersCli {
    /// Shader directory [default: assets/shaders]
    #[arg(long = "dir", value_hint = ValueHint::DirPath)]
    dir: Option<PathBuf>,

    /// Shader compiler executable [default: glslc]
    #[arg(long = "compiler", value_hint = ValueHint::CommandName)]
    compiler: Option<String>,

    /// Also compile shaders in subdirectories
    #[arg(long = "recursive", action = ArgAction::SetTrue)]
    recursive: bool,

    /// Compile on this many worker threads (0 = one per core)
    #[arg(short = 'j', long = "jobs")]
    jobs: Option<usize>,

    /// Emit a single JSON document
    #[arg(long = "json", action = ArgAction::SetTrue, conflicts_with = "ndjson")]
    json: bool,

    /// Emit one JSON record per shader
    #[arg(long = "ndjson", action = ArgAction::SetTrue)]
    ndjson: bool,

    #[command(flatten)]
    common: CommonArgs,
}

/// Run the native build and pull the errors and warnings out of its output.
#[derive(Debug, Parser)]
#[command(
    name = "debug-build",
    about = "Run the native build and pull the errors and warnings out of its output"
)]
pub struct DebugBuildCli {
    /// Emit the report as JSON
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,

    #[command(flatten)]
    common: CommonArgs,

    /// Build command to run instead of the configured one
    #[arg(last = true)]
    command: Vec<String>,
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Configuration file [default: ./astral-tools.toml when present]
    #[arg(long = "config", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

/// Parse compile-shaders args and run the batch.
pub fn run_compile_shaders() -> Result<ExitCode> {
    let cli = CompileShadersCli::parse();
    init_logging(cli.common.verbose);

    let config = Config::load(cli.common.config.as_deref())?;
    let stdout = io::stdout();
    let outcome = compile_shaders(&cli, config.shaders, stdout.lock())?;

    Ok(if outcome.failed() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Parse debug-build args and inspect one build.
pub fn run_debug_build() -> Result<ExitCode> {
    let cli = DebugBuildCli::parse();
    init_logging(cli.common.verbose);

    let config = Config::load(cli.common.config.as_deref())?;
    let stdout = io::stdout();
    let succeeded = debug_build(&cli, config.inspect, stdout.lock())?;

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Warn by default; `-v` flags raise it and `RUST_LOG` has the last word.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();
    if builder.try_init().is_err() {
        log::debug!("logger already initialised");
    }
}

fn apply_shader_overrides(cli: &CompileShadersCli, settings: &mut ShaderConfig) {
    if let Some(dir) = &cli.dir {
        settings.dir = dir.clone();
    }
    if let Some(compiler) = &cli.compiler {
        settings.compiler = compiler.clone();
    }
    if cli.recursive {
        settings.recursive = true;
    }
}

#[derive(Debug, Serialize)]
struct CompileSummary<'a> {
    directory: &'a Path,
    missing: bool,
    compiled: usize,
    failed: usize,
    records: &'a [CompileRecord],
}

fn compile_shaders(
    cli: &CompileShadersCli,
    mut settings: ShaderConfig,
    mut out: impl Write,
) -> Result<BatchOutcome> {
    apply_shader_overrides(cli, &mut settings);

    let discovery = ShaderDiscovery::new(&settings.dir)
        .with_extensions(settings.normalized_extensions())
        .recursive(settings.recursive);
    let compiler = ExternalCompiler::new(&settings.compiler).with_args(&settings.compiler_args);
    let batch = ShaderBatch::new(discovery, compiler)
        .with_output_suffix(&settings.output_suffix)
        .with_jobs(cli.jobs);

    let machine_output = cli.json || cli.ndjson;
    let outcome = if machine_output {
        batch.run(&mut SilentReporter)?
    } else {
        batch.run(&mut TextReporter::new(&mut out))?
    };

    let records = outcome.records();
    if cli.json {
        let summary = CompileSummary {
            directory: &settings.dir,
            missing: matches!(outcome, BatchOutcome::MissingDirectory(_)),
            compiled: records.len() - outcome.failed(),
            failed: outcome.failed(),
            records,
        };
        write_json_pretty(&summary, &mut out)?;
    } else if cli.ndjson {
        if let BatchOutcome::MissingDirectory(dir) = &outcome {
            write_missing_directory(dir, io::stderr().lock())?;
        }
        write_ndjson(records, &mut out)?;
    } else if let BatchOutcome::MissingDirectory(dir) = &outcome {
        write_missing_directory(dir, &mut out)?;
    }

    Ok(outcome)
}

#[derive(Debug, Serialize)]
struct FailedRun {
    command: String,
    error: String,
}

/// Returns whether the build itself succeeded. A build that cannot be
/// launched is reported, not propagated.
fn debug_build(cli: &DebugBuildCli, settings: InspectConfig, mut out: impl Write) -> Result<bool> {
    let command = if cli.command.is_empty() {
        settings.build_command()?
    } else {
        BuildCommand::from_argv(cli.command.iter().cloned())?
    };
    let inspector = BuildInspector::from_config(&settings);

    if !cli.json {
        writeln!(out, "Running: {command}")?;
        out.flush()?;
    }

    match inspector.inspect(&command) {
        Ok(report) => {
            if cli.json {
                write_json_pretty(&report, &mut out)?;
            } else {
                write_analysis(&report.analysis, &mut out)?;
            }
            Ok(report.success)
        }
        Err(err) => {
            log::debug!("inspection aborted: {err:?}");
            if cli.json {
                let failed = FailedRun {
                    command: command.to_string(),
                    error: err.to_string(),
                };
                write_json_pretty(&failed, &mut out)?;
            } else {
                writeln!(out, "Script failed: {err}")?;
            }
            Ok(false)
        }
    }
}
