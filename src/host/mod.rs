//! Capability interface to the CAD host.
//!
//! The import workflow never touches the host's object model directly. It
//! goes through the narrow [`Host`] trait below, which exposes only what an
//! import needs:
//!
//! - data-store lookups (`find_data_file`, `list_root_folder`)
//! - document lifecycle (`close_active_document`, `open_document`,
//!   `create_document`, `save_active_as`)
//! - the textual command interpreter (`execute_text_command`)
//! - 3D geometry (`import_step`, `set_occurrence_transform`)
//! - a user notice (`show_message`)
//!
//! The production implementation is [`crate::bridge::RpcHost`], which
//! forwards each call to a host-side shim. Tests use an in-memory fake.

mod error;
mod transform;

pub use error::{HostError, HostResult};
pub use transform::Transform;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Stable identifier (URN) of a document in the host's data store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
    /// Wraps an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file entry in the host's data store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFile {
    /// Stable identifier.
    pub id: Urn,
    /// Display name.
    pub name: String,
}

/// A document open in the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentHandle {
    /// Display name.
    pub name: String,
    /// Data-store identifier, once the document has been saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Urn>,
}

/// A placed instance of imported 3D geometry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OccurrenceId(String);

impl OccurrenceId {
    /// Wraps an occurrence token handed out by the host.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OccurrenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operations the import workflow needs from the CAD host.
///
/// Calls are issued one at a time from a single task. Implementations may
/// assume the host serialises them and that exactly one document is active
/// between `open_document`/`create_document` and the next close.
#[async_trait(?Send)]
pub trait Host {
    /// Looks up a file by identifier in the live data store.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NotFound`] if the identifier does not resolve.
    async fn find_data_file(&mut self, id: &Urn) -> HostResult<DataFile>;

    /// Lists the files in the root folder of the current project.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot enumerate the folder.
    async fn list_root_folder(&mut self) -> HostResult<Vec<DataFile>>;

    /// Closes the active document without saving. A no-op if none is open.
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses to close the document.
    async fn close_active_document(&mut self) -> HostResult<()>;

    /// Opens the document with the given identifier and makes it active.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier does not resolve or opening fails.
    async fn open_document(&mut self, id: &Urn) -> HostResult<DocumentHandle>;

    /// Creates a new electronics library document, saves it as `name` in
    /// the project's root folder and commits it with `commit_message`.
    ///
    /// # Errors
    ///
    /// Returns an error if creation or either save fails.
    async fn create_document(
        &mut self,
        name: &str,
        commit_message: &str,
    ) -> HostResult<DocumentHandle>;

    /// Saves the active document as a new file named `name` in the
    /// project's root folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the save fails.
    async fn save_active_as(&mut self, name: &str) -> HostResult<DocumentHandle>;

    /// Runs a command through the host's textual command interpreter.
    ///
    /// # Errors
    ///
    /// Returns an error if the interpreter rejects the command.
    async fn execute_text_command(&mut self, command: &str) -> HostResult<String>;

    /// Imports a STEP file into the root component of the active design.
    ///
    /// Returns the newly created occurrences, in host order.
    ///
    /// # Errors
    ///
    /// Returns an error if the import fails.
    async fn import_step(&mut self, path: &Path) -> HostResult<Vec<OccurrenceId>>;

    /// Replaces the transform of an occurrence.
    ///
    /// # Errors
    ///
    /// Returns an error if the occurrence is unknown or the host rejects it.
    async fn set_occurrence_transform(
        &mut self,
        occurrence: &OccurrenceId,
        transform: &Transform,
    ) -> HostResult<()>;

    /// Shows a short informational message to the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be delivered.
    async fn show_message(&mut self, text: &str) -> HostResult<()>;
}
