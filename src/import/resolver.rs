//! Target library resolution.
//!
//! Decides whether an import lands in the previously used library document
//! (found through the identity cache or a folder scan) or in a freshly
//! created one. Exactly one target document is active on return.

use serde::Serialize;
use tracing::info;

use crate::host::{DocumentHandle, Host, Urn};
use crate::import::error::{ImportError, ImportResult};
use crate::import::identity::IdentityCache;

/// How the target document was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOrigin {
    /// Opened from a cached identifier that still resolved.
    Cached,
    /// Opened after finding it by name in the project.
    Discovered,
    /// Created and saved during this session.
    Created,
}

/// The document that receives imported definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetLibrary {
    /// Host document.
    pub document: DocumentHandle,
    /// How it was obtained.
    pub origin: TargetOrigin,
}

/// Resolves the target library document for an import.
#[derive(Debug)]
pub struct LibraryResolver<'a> {
    cache: &'a IdentityCache,
    commit_message: &'a str,
}

impl<'a> LibraryResolver<'a> {
    /// Creates a resolver backed by `cache`.
    #[must_use]
    pub const fn new(cache: &'a IdentityCache, commit_message: &'a str) -> Self {
        Self {
            cache,
            commit_message,
        }
    }

    /// Opens or creates the target library document.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::ResolveTarget`] if the document cannot be
    /// opened or created.
    pub async fn resolve<H: Host>(&self, host: &mut H) -> ImportResult<TargetLibrary> {
        match self.known_library(host).await {
            Some((id, origin)) => {
                let document = open_existing(host, &id).await?;
                info!(urn = %id, ?origin, "Opened library document");
                Ok(TargetLibrary { document, origin })
            }
            None => {
                let document = host
                    .create_document(self.cache.library_name(), self.commit_message)
                    .await
                    .map_err(|source| ImportError::ResolveTarget { source })?;
                info!(name = %document.name, "Created library document");
                Ok(TargetLibrary {
                    document,
                    origin: TargetOrigin::Created,
                })
            }
        }
    }

    async fn known_library<H: Host>(&self, host: &mut H) -> Option<(Urn, TargetOrigin)> {
        if let Some(id) = self.cache.load().await {
            if self.cache.validate(host, &id).await {
                return Some((id, TargetOrigin::Cached));
            }
        }

        self.cache
            .refresh(host)
            .await
            .map(|id| (id, TargetOrigin::Discovered))
    }
}

/// Closes whatever is active, then opens `id`.
async fn open_existing<H: Host>(host: &mut H, id: &Urn) -> ImportResult<DocumentHandle> {
    host.close_active_document()
        .await
        .map_err(|source| ImportError::ResolveTarget { source })?;
    host.open_document(id)
        .await
        .map_err(|source| ImportError::ResolveTarget { source })
}
