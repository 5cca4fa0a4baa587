//! Binary entrypoint for debug-build

use std::process::ExitCode;

fn main() -> ExitCode {
    match astral_build_cli::run_debug_build() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
