//! # CLI Layer
//!
//! The binary is one host of the library, not the library itself. This is the only place
//! that reads the process environment, installs the tracing subscriber and turns an
//! [`Exit`] into a process exit code.
//!
//! ## Flow
//!
//! 1. Load `function.json` from `$FNRUN_HOME`, else the current directory if it has one,
//!    else the platform config dir. `$FNRUN_FUNCTION` overrides the function name.
//! 2. Set up logging (stderr only).
//! 3. Build an owning [`FunctionInitializer`] with the built-in function registry.
//! 4. Dispatch to the built-in named in the config and report through the exit handler.
//! 5. Close the initializer, then exit with the reported code.

mod builtins;

use colored::Colorize;
use directories::ProjectDirs;
use fnrun::config::{ExitCodes, FunctionConfig, CONFIG_FILENAME};
use fnrun::context::InvocationArgs;
use fnrun::error::{FnError, Result};
use fnrun::exit::{Exit, ExitStatus};
use fnrun::logging::init_logging;
use fnrun::FunctionInitializer;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

pub const HOME_ENV_VAR: &str = "FNRUN_HOME";
pub const FUNCTION_ENV_VAR: &str = "FNRUN_FUNCTION";

pub fn run() -> ExitCode {
    let argv: Vec<OsString> = env::args_os().skip(1).collect();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            return ExitCode::from(ExitCodes::default().error);
        }
    };

    if let Err(e) = init_logging(config.log_filter.as_deref(), debug_requested(&argv)) {
        eprintln!("{} {}", "Warning:".yellow().bold(), e);
    }

    let codes = config.exit_codes;
    let function_name = config.function_name.clone();
    tracing::debug!(target: "fnrun::cli", function = %function_name, "Configuration loaded");

    let mut initializer = match FunctionInitializer::owning((), |beans| {
        beans.register(builtins::registry());
        beans.register(config);
    }) {
        Ok(initializer) => initializer,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            return ExitCode::from(codes.error);
        }
    };

    let exit = invoke(&initializer, &function_name, argv);
    finish(exit, initializer.close(), &codes).into()
}

/// Whether argv asks for `--debug`. Unparseable argv counts as no.
fn debug_requested(argv: &[OsString]) -> bool {
    InvocationArgs::parse_argv(argv.iter().cloned())
        .map(|args| args.debug)
        .unwrap_or(false)
}

/// Folds the teardown result into the invocation's exit: a failed close turns a success
/// into the error code, failures keep their own code.
fn finish(exit: Exit, closed: Result<()>, codes: &ExitCodes) -> Exit {
    match closed {
        Ok(()) => exit,
        Err(e) => {
            tracing::warn!(target: "fnrun::cli", error = %e, "Failed to close initializer");
            eprintln!("{} {}", "Error:".red().bold(), e);
            if exit.is_success() {
                Exit::new(ExitStatus::Failure, codes)
            } else {
                exit
            }
        }
    }
}

fn invoke(initializer: &FunctionInitializer<'_>, name: &str, argv: Vec<OsString>) -> Exit {
    match builtins::dispatch(name, initializer, argv.clone()) {
        Some(exit) => exit,
        None => initializer.run(argv, |_| -> Result<Option<()>> {
            Err(FnError::Config(format!(
                "unknown function '{}', set {} or function_name in {}",
                name, FUNCTION_ENV_VAR, CONFIG_FILENAME
            )))
        }),
    }
}

fn config_dir() -> Option<PathBuf> {
    if let Some(home) = env::var_os(HOME_ENV_VAR) {
        return Some(PathBuf::from(home));
    }
    if let Ok(cwd) = env::current_dir() {
        if cwd.join(CONFIG_FILENAME).exists() {
            return Some(cwd);
        }
    }
    ProjectDirs::from("dev", "fnrun", "fnrun").map(|dirs| dirs.config_dir().to_path_buf())
}

fn load_config() -> Result<FunctionConfig> {
    let mut config = match config_dir() {
        Some(dir) => FunctionConfig::load(&dir)?,
        None => FunctionConfig::default(),
    };

    if let Ok(name) = env::var(FUNCTION_ENV_VAR) {
        if !name.trim().is_empty() {
            config.function_name = name.trim().to_string();
        }
    }
    Ok(config)
}
