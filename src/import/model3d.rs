//! Optional 3D model import.
//!
//! When a `<base>.step` file sits next to the source library, the just
//! imported definition gets a 3D package: a shell document is created from
//! the library, saved on its own, the STEP model is imported into it and
//! the first occurrence is turned a quarter turn about X so it lies the way
//! the 2D footprint expects. The correction is best effort; the user is
//! asked to check the alignment.
//!
//! Nothing here rolls back: a failure leaves the already imported 2D
//! definition in place.

use std::f64::consts::FRAC_PI_2;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::host::{DocumentHandle, Host, HostError, OccurrenceId, Transform};
use crate::import::ecad;
use crate::import::error::{ImportError, ImportResult, ModelStage};

/// Notice shown after the model has been reoriented.
pub const ORIENTATION_NOTICE: &str =
    "Please make sure to orient the 3D model properly in the package editor.";

/// Rotation applied to every imported STEP model.
#[must_use]
pub fn canonical_orientation() -> Transform {
    Transform::rotation_about_x(FRAC_PI_2)
}

/// Outcome of the 3D stage of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ModelOutcome {
    /// No sibling STEP file; nothing was attempted.
    NotPresent,
    /// The model was imported and reoriented.
    Placed {
        /// The saved 3D package document.
        document: DocumentHandle,
        /// The reoriented occurrence.
        occurrence: OccurrenceId,
    },
    /// A step failed; earlier steps were kept.
    Failed {
        /// Error description.
        error: String,
    },
}

/// Drives the 3D package steps against a host.
#[derive(Debug)]
pub struct ModelPipeline<'a> {
    package_name: &'a str,
}

impl<'a> ModelPipeline<'a> {
    /// Creates a pipeline that saves shells under `package_name`.
    #[must_use]
    pub const fn new(package_name: &'a str) -> Self {
        Self { package_name }
    }

    /// Runs every step and folds failures into [`ModelOutcome::Failed`].
    pub async fn run<H: Host>(
        &self,
        host: &mut H,
        source_path: &Path,
        step_path: &Path,
    ) -> ModelOutcome {
        match self.place(host, source_path, step_path).await {
            Ok((document, occurrence)) => {
                info!(%occurrence, document = %document.name, "3D model placed");
                ModelOutcome::Placed {
                    document,
                    occurrence,
                }
            }
            Err(e) => {
                let error = std::error::Error::source(&e)
                    .map_or_else(|| e.to_string(), |cause| format!("{e}: {cause}"));
                warn!(%error, "3D model import failed");
                ModelOutcome::Failed { error }
            }
        }
    }

    /// Creates the shell, imports the model and reorients it.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Model`] naming the failing stage, or
    /// [`ImportError::NoOccurrence`] if the import created nothing.
    pub async fn place<H: Host>(
        &self,
        host: &mut H,
        source_path: &Path,
        step_path: &Path,
    ) -> ImportResult<(DocumentHandle, OccurrenceId)> {
        let command = ecad::create_3d_package(source_path);
        host.execute_text_command(&command)
            .await
            .map_err(stage(ModelStage::CreateShell))?;
        info!(command = %command, "3D package created");

        let document = host
            .save_active_as(self.package_name)
            .await
            .map_err(stage(ModelStage::SaveShell))?;

        let occurrences = host
            .import_step(step_path)
            .await
            .map_err(stage(ModelStage::ImportStep))?;
        let occurrence = occurrences
            .into_iter()
            .next()
            .ok_or(ImportError::NoOccurrence)?;

        host.set_occurrence_transform(&occurrence, &canonical_orientation())
            .await
            .map_err(stage(ModelStage::Reorient))?;

        if let Err(e) = host.show_message(ORIENTATION_NOTICE).await {
            warn!(error = %e, "Could not show orientation notice");
        }

        Ok((document, occurrence))
    }
}

fn stage(stage: ModelStage) -> impl Fn(HostError) -> ImportError {
    move |source| ImportError::Model { stage, source }
}
