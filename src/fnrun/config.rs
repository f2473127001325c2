use crate::error::{FnError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "function.json";
const DEFAULT_FUNCTION_NAME: &str = "function";

/// Process exit codes agreed with the invoking host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitCodes {
    #[serde(default)]
    pub success: u8,
    #[serde(default = "default_error_code")]
    pub error: u8,
    #[serde(default = "default_no_data_code")]
    pub no_data: u8,
}

fn default_error_code() -> u8 {
    1
}

fn default_no_data_code() -> u8 {
    2
}

impl Default for ExitCodes {
    fn default() -> Self {
        Self {
            success: 0,
            error: default_error_code(),
            no_data: default_no_data_code(),
        }
    }
}

impl ExitCodes {
    /// Success must be 0, both failure codes non-zero and distinct.
    pub fn validate(&self) -> Result<()> {
        if self.success != 0 {
            return Err(FnError::Config(format!(
                "success exit code must be 0, got {}",
                self.success
            )));
        }
        if self.error == 0 || self.no_data == 0 {
            return Err(FnError::Config(
                "failure exit codes must be non-zero".to_string(),
            ));
        }
        if self.error == self.no_data {
            return Err(FnError::Config(format!(
                "error and no-data exit codes must differ, both are {}",
                self.error
            )));
        }
        Ok(())
    }
}

/// Configuration for a function process, stored in `function.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionConfig {
    /// Name of the function to run, as registered in the function registry
    #[serde(default = "default_function_name")]
    pub function_name: String,

    #[serde(default)]
    pub exit_codes: ExitCodes,

    /// tracing filter directive used when `FNRUN_LOG` is not set (e.g. "fnrun=debug")
    #[serde(default)]
    pub log_filter: Option<String>,
}

fn default_function_name() -> String {
    DEFAULT_FUNCTION_NAME.to_string()
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            function_name: default_function_name(),
            exit_codes: ExitCodes::default(),
            log_filter: None,
        }
    }
}

impl FunctionConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: FunctionConfig = serde_json::from_str(&content)?;
        config.exit_codes.validate()?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }

    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = name.into();
        self
    }
}
