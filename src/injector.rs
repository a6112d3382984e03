//! Injection service boundary
//!
//! The actual patching of war3.exe is done by an external loader. The
//! launcher hands it a command line and the executable path and gets back a
//! status code plus an optional message.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::error::InjectorError;
use crate::logging::{log_launch, log_warning};
use crate::registry::linux_path_to_wine;
use crate::runtime_wrap;

/// Default file name of the loader helper, looked up in the working directory
pub const DEFAULT_INJECTOR: &str = "w3l.exe";

/// Game started
pub const STATUS_OK: i32 = 0;
/// Loader reported a failure, message describes it
pub const STATUS_FAILED: i32 = 1;
/// Loader could not find the executable, message carries the path
pub const STATUS_EXECUTABLE_NOT_FOUND: i32 = 2;

/// What the injection service answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionReply {
    pub status: i32,
    pub message: Option<String>,
}

impl InjectionReply {
    pub fn new(status: i32, message: Option<String>) -> Self {
        Self { status, message }
    }
}

/// Something that can patch and start the game
pub trait InjectionService {
    /// Start `executable_path` with `command_line`.
    ///
    /// `Err` means the service itself could not be reached; failures of the
    /// injection are reported through [`InjectionReply::status`].
    fn inject(&mut self, command_line: &str, executable_path: &str) -> Result<InjectionReply, InjectorError>;

    /// How this service spells a host path
    fn host_path(&self, path: &Path) -> String {
        path.display().to_string()
    }
}

/// Runs the loader helper as `helper <command line> <executable path>`.
///
/// The helper's exit code is the status and its stdout the message.
#[derive(Debug, Clone)]
pub struct HelperInjector {
    helper: PathBuf,
    wine_prefix: Option<PathBuf>,
}

impl HelperInjector {
    pub fn new(helper: impl Into<PathBuf>) -> Self {
        Self {
            helper: helper.into(),
            wine_prefix: None,
        }
    }

    pub fn with_wine_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.wine_prefix = Some(prefix.into());
        self
    }

    pub fn helper(&self) -> &Path {
        &self.helper
    }

    fn under_wine(&self) -> bool {
        runtime_wrap::needs_wine(&self.helper)
    }
}

impl InjectionService for HelperInjector {
    fn inject(&mut self, command_line: &str, executable_path: &str) -> Result<InjectionReply, InjectorError> {
        if !self.helper.is_file() {
            return Err(InjectorError::NotFound(self.helper.clone()));
        }

        log_launch(&format!("Running {} {}", self.helper.display(), command_line));

        let output = runtime_wrap::command_for(&self.helper, self.wine_prefix.as_deref())
            .arg(command_line)
            .arg(executable_path)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| InjectorError::Spawn {
                path: self.helper.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            log_warning(&format!("Injection helper stderr: {}", stderr.trim()));
        }

        let status = output.status.code().ok_or(InjectorError::Terminated)?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let message = if stdout.is_empty() { None } else { Some(stdout) };

        Ok(InjectionReply { status, message })
    }

    fn host_path(&self, path: &Path) -> String {
        if self.under_wine() {
            linux_path_to_wine(path)
        } else {
            path.display().to_string()
        }
    }
}
