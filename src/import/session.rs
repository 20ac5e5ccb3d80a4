//! Import session controller.
//!
//! One session runs per open-from-URL notification:
//!
//! ```text
//! Start ─▶ ResolveTarget ─▶ FindPackage(devicesets → packages)
//!            │ fatal              │ none ─────────────────────┐
//!            ▼                    ▼                           │
//!         Aborted           ImportDefinition ─▶ fatal ─▶ Aborted
//!                                 │                           │
//!                          has <base>.step?                   │
//!                           ├─ yes ─▶ ModelPipeline           │
//!                           └─ no                             │
//!                                 ▼                           ▼
//!                         RefreshIdentityCache ─────────────▶ End
//! ```
//!
//! Only target resolution and definition import abort a session; every
//! other failure degrades into a log line and a skipped step.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::host::{Host, Urn};
use crate::import::ecad;
use crate::import::error::ImportResult;
use crate::import::extract::{self, PackageDescriptor};
use crate::import::identity::IdentityCache;
use crate::import::model3d::{ModelOutcome, ModelPipeline};
use crate::import::request::ImportRequest;
use crate::import::resolver::{LibraryResolver, TargetLibrary};
use crate::import::{
    DEFAULT_CACHE_FILE, DEFAULT_COMMIT_MESSAGE, DEFAULT_LIBRARY_NAME, DEFAULT_PACKAGE_3D_NAME,
};

/// Names and locations a session works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    /// Directory holding the plugin's own files (cache, log).
    pub plugin_dir: PathBuf,
    /// Display name of the reusable library document.
    pub library_name: String,
    /// Display name of saved 3D package shells.
    pub package_3d_name: String,
    /// Commit message used when saving the library document.
    pub commit_message: String,
    /// File name of the identity cache inside `plugin_dir`.
    pub cache_file: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            plugin_dir: PathBuf::from("."),
            library_name: DEFAULT_LIBRARY_NAME.to_string(),
            package_3d_name: DEFAULT_PACKAGE_3D_NAME.to_string(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            cache_file: DEFAULT_CACHE_FILE.to_string(),
        }
    }
}

impl ImportSettings {
    /// Full path of the identity cache file.
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.plugin_dir.join(&self.cache_file)
    }
}

/// Result of a session that was not aborted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SessionOutcome {
    /// The notification was not a library import.
    Ignored,
    /// The target was resolved but no definition name could be found.
    Skipped {
        /// Resolved target library.
        target: TargetLibrary,
        /// Identifier persisted at the end of the session.
        cached: Option<Urn>,
    },
    /// A definition was copied into the target library.
    Imported {
        /// Resolved target library.
        target: TargetLibrary,
        /// The imported definition.
        package: PackageDescriptor,
        /// What happened to the 3D model.
        model: ModelOutcome,
        /// Identifier persisted at the end of the session.
        cached: Option<Urn>,
    },
}

impl SessionOutcome {
    /// Short status label.
    #[must_use]
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::Skipped { .. } => "skipped",
            Self::Imported { .. } => "imported",
        }
    }
}

/// Runs import sessions with a fixed set of settings.
#[derive(Debug, Clone)]
pub struct ImportController {
    settings: ImportSettings,
    cache: IdentityCache,
}

impl ImportController {
    /// Creates a controller.
    #[must_use]
    pub fn new(settings: ImportSettings) -> Self {
        let cache = IdentityCache::new(settings.cache_path(), settings.library_name.clone());
        Self { settings, cache }
    }

    /// Settings in use.
    #[must_use]
    pub const fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Identity cache in use.
    #[must_use]
    pub const fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// Handles one open-from-URL notification.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`crate::import::ImportError`] if the target library
    /// cannot be resolved or the definition import is rejected by the host.
    /// No cleanup is attempted in either case.
    pub async fn handle<H: Host>(
        &self,
        host: &mut H,
        request: &ImportRequest,
    ) -> ImportResult<SessionOutcome> {
        info!(
            lib_path = %request.lib_path.display(),
            target_library = %request.target_library.display(),
            "Document opened from URL"
        );

        if !request.is_library_import() {
            info!("Not a library import, ignoring");
            return Ok(SessionOutcome::Ignored);
        }
        let (Some(source_name), Some(source_path)) = (request.source_name(), request.source_path())
        else {
            info!("Library path has no file name, ignoring");
            return Ok(SessionOutcome::Ignored);
        };

        let target = LibraryResolver::new(&self.cache, &self.settings.commit_message)
            .resolve(host)
            .await?;

        let Some(package) = extract::find_package(&source_path, &source_name).await else {
            warn!(source = %source_path.display(), "No importable definition found, skipping");
            let cached = self.cache.refresh(host).await;
            return Ok(SessionOutcome::Skipped { target, cached });
        };
        info!(
            source_name = %package.source_name,
            package_type = %package.package_type,
            package_name = %package.package_name,
            "Importing definition"
        );

        ecad::import_definition(host, &source_path, &package).await?;
        info!(source_name = %package.source_name, "Imported ECAD library");

        let step_path = request.step_path();
        let has_model = match step_path.as_deref() {
            Some(path) => has_file(path).await,
            None => false,
        };
        let model = match step_path {
            Some(step_path) if has_model => {
                ModelPipeline::new(&self.settings.package_3d_name)
                    .run(host, &source_path, &step_path)
                    .await
            }
            _ => {
                info!("No 3D model");
                ModelOutcome::NotPresent
            }
        };

        let cached = self.cache.refresh(host).await;

        Ok(SessionOutcome::Imported {
            target,
            package,
            model,
            cached,
        })
    }
}

async fn has_file(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
