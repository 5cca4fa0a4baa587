//! Build inspection pipeline: run, decode, scan (astral-build-core)

use serde::Serialize;

use crate::config::InspectConfig;
use crate::decode::{DecodeStrategy, Decoder, RawOutput};
use crate::error::BuildToolError;
use crate::process::{run_merged, BuildCommand};
use crate::scan::{tail, DiagnosticMatch, DiagnosticScanner, DEFAULT_TAIL_LINES};

/// What the scan turned up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Findings {
    Diagnostics { matches: Vec<DiagnosticMatch> },
    /// No marker matched; the last lines of output instead.
    Tail { requested: usize, lines: Vec<String> },
}

/// Decode strategy plus findings for one captured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub strategy: DecodeStrategy,
    pub findings: Findings,
}

/// Everything `debug-build` reports about one build run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectionReport {
    pub command: String,
    /// `None` when the build was killed by a signal.
    pub exit_code: Option<i32>,
    pub success: bool,
    #[serde(flatten)]
    pub analysis: Analysis,
}

#[derive(Debug, Clone)]
pub struct BuildInspector {
    decoder: Decoder,
    scanner: DiagnosticScanner,
    tail_lines: usize,
}

impl Default for BuildInspector {
    fn default() -> Self {
        Self {
            decoder: Decoder::default(),
            scanner: DiagnosticScanner::default(),
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }
}

impl BuildInspector {
    pub fn new(decoder: Decoder, scanner: DiagnosticScanner) -> Self {
        Self {
            decoder,
            scanner,
            ..Self::default()
        }
    }

    pub fn from_config(config: &InspectConfig) -> Self {
        Self::new(config.decoder(), config.scanner()).with_tail_lines(config.tail_lines)
    }

    pub fn with_tail_lines(mut self, count: usize) -> Self {
        self.tail_lines = count;
        self
    }

    /// Decode the captured bytes and scan them for diagnostics.
    pub fn analyze(&self, raw: RawOutput) -> Analysis {
        let decoded = self.decoder.decode(raw);
        let lines = decoded.lines();
        let matches = self.scanner.scan(&lines);

        let findings = if matches.is_empty() {
            log::debug!("no diagnostic markers in {} lines", lines.len());
            Findings::Tail {
                requested: self.tail_lines,
                lines: tail(&lines, self.tail_lines),
            }
        } else {
            log::debug!("{} diagnostic lines out of {}", matches.len(), lines.len());
            Findings::Diagnostics { matches }
        };

        Analysis {
            strategy: decoded.strategy(),
            findings,
        }
    }

    /// Run `command` to completion, then analyze everything it wrote.
    ///
    /// A build that fails still yields a report; only a command that cannot
    /// be launched or read is an error.
    pub fn inspect(&self, command: &BuildCommand) -> Result<InspectionReport, BuildToolError> {
        let run = run_merged(command)?;
        Ok(InspectionReport {
            command: command.to_string(),
            exit_code: run.status.code(),
            success: run.status.success(),
            analysis: self.analyze(run.output),
        })
    }
}
