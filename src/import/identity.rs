//! Persisted identifier of the reusable library document.
//!
//! A single URN is kept in a plain-text file beside the plugin
//! (`team_urn.txt` by default), newline-terminated. The entry is only
//! trusted after it resolves in the host's live data store; a stale entry
//! is a cache miss, never an error.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::host::{Host, Urn};
use crate::import::error::{ImportError, ImportResult};

/// File-backed cache for the library document identifier.
#[derive(Debug, Clone)]
pub struct IdentityCache {
    path: PathBuf,
    library_name: String,
}

impl IdentityCache {
    /// Creates a cache stored at `path` for documents named `library_name`.
    pub fn new(path: impl Into<PathBuf>, library_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            library_name: library_name.into(),
        }
    }

    /// Path of the cache file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display name that [`discover`](Self::discover) searches for.
    #[must_use]
    pub fn library_name(&self) -> &str {
        &self.library_name
    }

    /// Reads the cached identifier, if any.
    ///
    /// An absent, unreadable, or empty file yields `None`.
    pub async fn load(&self) -> Option<Urn> {
        match self.read().await {
            Ok(urn) => urn,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable identity cache");
                None
            }
        }
    }

    async fn read(&self) -> ImportResult<Option<Urn>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No identity cache yet");
                return Ok(None);
            }
            Err(source) => {
                return Err(ImportError::Cache {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let id = contents.lines().next().unwrap_or("").trim();
        Ok((!id.is_empty()).then(|| Urn::new(id)))
    }

    /// Checks that `id` still resolves in the host's data store.
    ///
    /// Any lookup failure counts as stale.
    pub async fn validate<H: Host>(&self, host: &mut H, id: &Urn) -> bool {
        match host.find_data_file(id).await {
            Ok(file) => {
                debug!(urn = %id, name = %file.name, "Cached library document resolves");
                true
            }
            Err(e) => {
                info!(urn = %id, error = %e, "Cached library identifier is stale");
                false
            }
        }
    }

    /// Overwrites the cache file with exactly one identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Cache`] if the file cannot be written.
    pub async fn store(&self, id: &Urn) -> ImportResult<()> {
        tokio::fs::write(&self.path, format!("{id}\n"))
            .await
            .map_err(|source| ImportError::Cache {
                path: self.path.clone(),
                source,
            })?;
        debug!(urn = %id, path = %self.path.display(), "Stored library identifier");
        Ok(())
    }

    /// Scans the project's root folder for a document with the library
    /// display name and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Discovery`] if the folder cannot be listed.
    pub async fn discover<H: Host>(&self, host: &mut H) -> ImportResult<Option<Urn>> {
        let files = host
            .list_root_folder()
            .await
            .map_err(|source| ImportError::Discovery { source })?;

        let found = files
            .into_iter()
            .find(|file| file.name == self.library_name)
            .map(|file| file.id);

        if let Some(ref id) = found {
            info!(urn = %id, name = %self.library_name, "Found existing library document");
        }
        Ok(found)
    }

    /// Discovers the library document and persists its identifier.
    ///
    /// Discovery and write failures are logged and otherwise ignored; the
    /// discovered identifier is returned even if it could not be stored.
    pub async fn refresh<H: Host>(&self, host: &mut H) -> Option<Urn> {
        let found = match self.discover(host).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Error retrieving library identifier");
                return None;
            }
        };

        if let Some(ref id) = found {
            if let Err(e) = self.store(id).await {
                warn!(error = %e, "Could not persist library identifier");
            }
        }
        found
    }
}
