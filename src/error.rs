//! Error types for every launch stage

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::launcher::LaunchStage;

/// The flat gateway list does not follow the `2 + 3*N` slot layout
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayFormatError {
    #[error("gateway list has {slots} slots, expected a header pair followed by whole triplets")]
    SlotCount { slots: usize },
}

/// Failures reading or writing the persisted gateway list
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("registry key [{0}] not found")]
    KeyMissing(String),
    #[error("registry value \"{0}\" not found")]
    ValueMissing(String),
    #[error("registry value \"{name}\" is not a multi-string: {reason}")]
    Undecodable { name: String, reason: String },
    #[error(transparent)]
    Format(#[from] GatewayFormatError),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures talking to the injection service itself (not its status codes)
#[derive(Debug, Error)]
pub enum InjectorError {
    #[error("injection helper not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to run injection helper {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("injection helper was terminated without an exit code")]
    Terminated,
}

/// Terminal failure of a launch
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("the given directory does not contain the game executable: {}", .0.display())]
    ExecutableNotFound(PathBuf),
    #[error("support library is missing, expected a copy at {}", .0.display())]
    SupportLibraryMissing(PathBuf),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("gateway list is malformed: {0}")]
    ConfigurationFormatError(String),
    #[error("unable to find the game executable in {0}")]
    ExecutableNotFoundAtRuntime(String),
    #[error("injection failed: {0}")]
    InjectionFailed(String),
    #[error("unexpected failure: {0}")]
    UnexpectedFailure(String),
}

impl LaunchError {
    /// Stage this kind of failure is specific to
    ///
    /// `None` for kinds that can surface from more than one stage.
    pub fn stage(&self) -> Option<LaunchStage> {
        match self {
            LaunchError::ExecutableNotFound(_) | LaunchError::SupportLibraryMissing(_) => {
                Some(LaunchStage::Validating)
            }
            LaunchError::ConfigurationFormatError(_) => Some(LaunchStage::Synchronizing),
            LaunchError::ExecutableNotFoundAtRuntime(_) | LaunchError::InjectionFailed(_) => {
                Some(LaunchStage::Launching)
            }
            LaunchError::AccessDenied(_) | LaunchError::UnexpectedFailure(_) => None,
        }
    }
}

impl From<GatewayFormatError> for LaunchError {
    fn from(err: GatewayFormatError) -> Self {
        LaunchError::ConfigurationFormatError(err.to_string())
    }
}

impl From<StoreError> for LaunchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io { .. } => LaunchError::AccessDenied(err.to_string()),
            StoreError::KeyMissing(_)
            | StoreError::ValueMissing(_)
            | StoreError::Undecodable { .. }
            | StoreError::Format(_) => LaunchError::ConfigurationFormatError(err.to_string()),
        }
    }
}

impl From<InjectorError> for LaunchError {
    fn from(err: InjectorError) -> Self {
        LaunchError::UnexpectedFailure(err.to_string())
    }
}
