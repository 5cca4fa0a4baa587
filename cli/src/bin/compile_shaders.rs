//! Binary entrypoint for compile-shaders

use std::process::ExitCode;

fn main() -> ExitCode {
    match astral_build_cli::run_compile_shaders() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
