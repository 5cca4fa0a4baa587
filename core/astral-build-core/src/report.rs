//! Console and JSON report writers (astral-build-core)

use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::inspect::{Analysis, Findings};
use crate::shaders::{BatchObserver, CompileOutcome, CompileRecord, ShaderSource};

/// Printed before the tail when no diagnostic marker matched.
pub fn no_diagnostics_notice(requested: usize) -> String {
    format!("No errors found in output (or pattern mismatch). Dumping last {requested} lines:")
}

/// Write any serializable report as prettified JSON.
pub fn write_json_pretty<T: Serialize + ?Sized>(value: &T, mut w: impl Write) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    w.write_all(json.as_bytes())?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Write records as newline-delimited JSON (NDJSON).
pub fn write_ndjson<T: Serialize>(items: &[T], mut w: impl Write) -> Result<()> {
    for item in items {
        let line = serde_json::to_string(item)?;
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

pub fn write_missing_directory(dir: &Path, mut w: impl Write) -> io::Result<()> {
    writeln!(w, "Error: Directory {} does not exist.", dir.display())
}

/// Decode strategy line followed by the matches or the fallback tail.
pub fn write_analysis(analysis: &Analysis, mut w: impl Write) -> io::Result<()> {
    writeln!(w, "Decoded using: {}", analysis.strategy)?;

    match &analysis.findings {
        Findings::Diagnostics { matches } => {
            for m in matches {
                writeln!(w, "[{}] {}", m.index, m.line)?;
                for context in &m.context {
                    writeln!(w, "    {context}")?;
                }
            }
        }
        Findings::Tail { requested, lines } => {
            writeln!(w, "{}", no_diagnostics_notice(*requested))?;
            for line in lines {
                writeln!(w, "{line}")?;
            }
        }
    }

    Ok(())
}

/// Streams compile progress in the plain console format.
pub struct TextReporter<W> {
    out: W,
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> BatchObserver for TextReporter<W> {
    fn started(&mut self, source: &ShaderSource) -> io::Result<()> {
        writeln!(self.out, "Compiling {}...", source.name())?;
        self.out.flush()
    }

    fn finished(&mut self, record: &CompileRecord) -> io::Result<()> {
        match &record.outcome {
            CompileOutcome::Success => writeln!(self.out, "Successfully compiled {}", record.name()),
            CompileOutcome::Failure(diagnostics) => {
                writeln!(self.out, "Error compiling {}:", record.name())?;
                writeln!(self.out, "{diagnostics}")
            }
        }
    }
}

/// Observer that reports nothing; used when the caller prints the records
/// itself once the batch is done.
#[derive(Debug, Default)]
pub struct SilentReporter;

impl BatchObserver for SilentReporter {
    fn finished(&mut self, _record: &CompileRecord) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{DecodeStrategy, Encoding};
    use crate::scan::DiagnosticMatch;
    use std::path::PathBuf;

    fn render(analysis: &Analysis) -> String {
        let mut buf = Vec::new();
        write_analysis(analysis, &mut buf).expect("write");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn renders_matches_with_indented_context() {
        let analysis = Analysis {
            strategy: DecodeStrategy::Exact(Encoding::Cp1252),
            findings: Findings::Diagnostics {
                matches: vec![DiagnosticMatch {
                    index: 4,
                    line: "main.cpp(9): error C2065".to_string(),
                    context: vec!["note: see x".to_string()],
                }],
            },
        };

        assert_eq!(
            render(&analysis),
            "Decoded using: cp1252\n[4] main.cpp(9): error C2065\n    note: see x\n"
        );
    }

    #[test]
    fn renders_tail_with_notice() {
        let lines: Vec<String> = (0..20).map(|i| format!("line {i}")).collect();
        let analysis = Analysis {
            strategy: DecodeStrategy::Lossy(Encoding::Utf8),
            findings: Findings::Tail {
                requested: 20,
                lines,
            },
        };

        let text = render(&analysis);
        let mut out = text.lines();
        assert_eq!(out.next(), Some("Decoded using: utf-8(ignore)"));
        assert_eq!(
            out.next(),
            Some("No errors found in output (or pattern mismatch). Dumping last 20 lines:")
        );
        assert_eq!(out.count(), 20);
    }

    #[test]
    fn reporter_prints_failure_diagnostics() {
        let mut reporter = TextReporter::new(Vec::new());
        let source = ShaderSource {
            path: PathBuf::from("assets/shaders/a.frag"),
        };
        let record = CompileRecord {
            source: source.path.clone(),
            output: PathBuf::from("assets/shaders/a.frag.spv"),
            outcome: CompileOutcome::Failure("a.frag:3: error: 'x' undeclared".to_string()),
        };

        reporter.started(&source).expect("started");
        reporter.finished(&record).expect("finished");

        let text = String::from_utf8(reporter.into_inner()).expect("utf8");
        assert_eq!(
            text,
            "Compiling a.frag...\nError compiling a.frag:\na.frag:3: error: 'x' undeclared\n"
        );
    }

    #[test]
    fn ndjson_writes_one_line_per_record() {
        let records = vec![
            CompileRecord {
                source: PathBuf::from("a.vert"),
                output: PathBuf::from("a.vert.spv"),
                outcome: CompileOutcome::Success,
            },
            CompileRecord {
                source: PathBuf::from("b.frag"),
                output: PathBuf::from("b.frag.spv"),
                outcome: CompileOutcome::Failure("boom".to_string()),
            },
        ];
        let mut buf = Vec::new();

        write_ndjson(&records, &mut buf).expect("write ndjson");

        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: CompileRecord = serde_json::from_str(lines[1]).expect("parse");
        assert_eq!(parsed.outcome, CompileOutcome::Failure("boom".to_string()));
    }
}
