//! Error taxonomy for import sessions.
//!
//! Every failure carries a [`Severity`] so the session controller can make
//! an explicit continue/abort decision instead of swallowing errors:
//!
//! - **Fatal**: target resolution and definition import abort the session.
//! - **Degraded**: extraction and 3D failures skip the affected step.
//! - **Ignorable**: cache and discovery failures only produce a log line.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::host::HostError;
use crate::import::extract::ExtractError;

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// How a failure affects the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Abort the remaining pipeline.
    Fatal,
    /// Skip the affected step and carry on.
    Degraded,
    /// Log and ignore.
    Ignorable,
}

impl Severity {
    /// Lower-case label used in logs and bridge replies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Degraded => "degraded",
            Self::Ignorable => "ignorable",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step of the 3D model pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStage {
    /// Materialising the 3D package shell from the imported definition.
    CreateShell,
    /// Saving the shell as its own document.
    SaveShell,
    /// Importing the STEP model into the shell.
    ImportStep,
    /// Applying the canonical orientation.
    Reorient,
}

impl fmt::Display for ModelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateShell => "create-shell",
            Self::SaveShell => "save-shell",
            Self::ImportStep => "import-step",
            Self::Reorient => "reorient",
        })
    }
}

/// Errors that can occur during an import session.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The target library document could not be opened or created.
    #[error("Failed to resolve target library document")]
    ResolveTarget {
        /// Underlying host error.
        #[source]
        source: HostError,
    },

    /// A textual host command failed.
    #[error("Host command failed: {command}")]
    Command {
        /// Exact command text that was submitted.
        command: String,
        /// Underlying host error.
        #[source]
        source: HostError,
    },

    /// No definition name could be read from the source library.
    #[error("Package name extraction failed for {path}")]
    Extract {
        /// Source library file.
        path: PathBuf,
        /// Underlying extraction error.
        #[source]
        source: ExtractError,
    },

    /// A step of the 3D model pipeline failed.
    #[error("3D model pipeline failed at {stage}")]
    Model {
        /// Failing step.
        stage: ModelStage,
        /// Underlying host error.
        #[source]
        source: HostError,
    },

    /// The STEP import succeeded but produced no occurrence to orient.
    #[error("STEP import produced no occurrence")]
    NoOccurrence,

    /// The identity cache file could not be read or written.
    #[error("Failed to access identity cache: {path}")]
    Cache {
        /// Cache file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Scanning the project for an existing library document failed.
    #[error("Library document discovery failed")]
    Discovery {
        /// Underlying host error.
        #[source]
        source: HostError,
    },
}

impl ImportError {
    /// Classifies this error.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::ResolveTarget { .. } | Self::Command { .. } => Severity::Fatal,
            Self::Extract { .. } | Self::Model { .. } | Self::NoOccurrence => Severity::Degraded,
            Self::Cache { .. } | Self::Discovery { .. } => Severity::Ignorable,
        }
    }

    /// Whether this error aborts the session.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.severity(), Severity::Fatal)
    }
}

/// Errors decoding an inbound open-from-URL payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The payload string is not valid JSON.
    #[error("Payload is not valid JSON")]
    InvalidJson(#[from] serde_json::Error),

    /// The payload is JSON but not an object.
    #[error("Payload must be a JSON object, got {found}")]
    NotAnObject {
        /// JSON type that was found instead.
        found: &'static str,
    },
}
