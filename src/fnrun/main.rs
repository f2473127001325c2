//! The `fnrun` binary. All wiring lives in [`cli`]; this file only hands the exit code back
//! to the OS.

use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    cli::run()
}
