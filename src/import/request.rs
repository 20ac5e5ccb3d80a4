//! Inbound open-from-URL payloads.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::import::error::PayloadError;

/// Marker that identifies a library import in `target_library`.
pub const LIBRARY_MARKER: &str = ".lbr";

/// Extension of the source library file.
pub const LIBRARY_EXTENSION: &str = "lbr";

/// Extension of the optional 3D model next to the library file.
pub const STEP_EXTENSION: &str = "step";

/// A parsed open-from-URL notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRequest {
    /// Directory holding the downloaded source artifacts.
    pub lib_path: PathBuf,
    /// Path of the library file the user selected.
    pub target_library: PathBuf,
}

impl ImportRequest {
    /// Creates a request, normalising both paths.
    pub fn new(lib_path: impl AsRef<Path>, target_library: impl AsRef<Path>) -> Self {
        Self {
            lib_path: normalise(lib_path.as_ref()),
            target_library: normalise(target_library.as_ref()),
        }
    }

    /// Decodes the payload carried by the notification.
    ///
    /// The payload may arrive either as a JSON string or as an
    /// already-parsed object. Missing keys are treated as empty paths.
    ///
    /// # Errors
    ///
    /// Returns an error if a string payload is not valid JSON, or if the
    /// payload is not an object.
    pub fn from_payload(payload: &Value) -> Result<Self, PayloadError> {
        let parsed;
        let object = match payload {
            Value::Object(map) => map,
            Value::String(text) => {
                parsed = serde_json::from_str::<Value>(text)?;
                parsed.as_object().ok_or(PayloadError::NotAnObject {
                    found: json_type(&parsed),
                })?
            }
            other => {
                return Err(PayloadError::NotAnObject {
                    found: json_type(other),
                })
            }
        };

        let field = |key: &str| object.get(key).and_then(Value::as_str).unwrap_or("");

        Ok(Self::new(field("lib_path"), field("target_library")))
    }

    /// Whether this notification asks for a library import at all.
    #[must_use]
    pub fn is_library_import(&self) -> bool {
        self.target_library
            .to_string_lossy()
            .contains(LIBRARY_MARKER)
    }

    /// Base name shared by the `.lbr`/`.step` pair, e.g. `R0805`.
    #[must_use]
    pub fn base_name(&self) -> Option<String> {
        self.target_library
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
    }

    /// File name of the source library, e.g. `R0805.lbr`.
    #[must_use]
    pub fn source_name(&self) -> Option<String> {
        self.base_name()
            .map(|base| format!("{base}.{LIBRARY_EXTENSION}"))
    }

    /// Full path of the source library inside `lib_path`.
    #[must_use]
    pub fn source_path(&self) -> Option<PathBuf> {
        self.source_name().map(|name| self.lib_path.join(name))
    }

    /// Full path of the sibling STEP model inside `lib_path`.
    #[must_use]
    pub fn step_path(&self) -> Option<PathBuf> {
        self.base_name()
            .map(|base| self.lib_path.join(format!("{base}.{STEP_EXTENSION}")))
    }
}

/// Collapses redundant separators and `.` components.
fn normalise(path: &Path) -> PathBuf {
    path.components().collect()
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
