//! Import orchestration.
//!
//! This module turns an open-from-URL notification into a populated
//! library document:
//!
//! - [`identity`]: persisted URN of the reusable library document
//! - [`resolver`]: open the cached/discovered document or create one
//! - [`extract`]: read the definition name out of the `.lbr` file
//! - [`ecad`]: textual commands that copy the definition
//! - [`model3d`]: optional STEP import and reorientation
//! - [`session`]: the controller that sequences all of the above
//!
//! Everything talks to the CAD host through [`crate::host::Host`].

pub mod ecad;
pub mod error;
pub mod extract;
pub mod identity;
pub mod model3d;
pub mod request;
pub mod resolver;
pub mod session;

pub use error::{ImportError, ImportResult, ModelStage, PayloadError, Severity};
pub use extract::{PackageDescriptor, PackageType};
pub use identity::IdentityCache;
pub use model3d::ModelOutcome;
pub use request::ImportRequest;
pub use resolver::{LibraryResolver, TargetLibrary, TargetOrigin};
pub use session::{ImportController, ImportSettings, SessionOutcome};

/// Display name of the document that accumulates imported parts.
pub const DEFAULT_LIBRARY_NAME: &str = "SnapEDA Library";

/// Display name under which 3D package shells are saved.
pub const DEFAULT_PACKAGE_3D_NAME: &str = "Empty SnapEDA 3D Package";

/// Commit message used when saving the library document.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Imported from SnapEDA";

/// Identity cache file name, relative to the plugin directory.
pub const DEFAULT_CACHE_FILE: &str = "team_urn.txt";
