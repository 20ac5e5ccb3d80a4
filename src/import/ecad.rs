//! Textual host commands that copy a definition into the active document.
//!
//! The host's electronics interpreter is driven with three commands, always
//! in this order:
//!
//! ```text
//! Electron.run "Use "<lib_path>/R0805.lbr""        select source as external reference
//! Electron.run "Copy "R0805.dev@R0805.lbr""        copy the qualified definition
//! Electron.run "Use "-R0805.lbr""                  drop the external reference
//! ```
//!
//! The reference must be active before `Copy` can resolve the qualified
//! name, and must be removed afterwards or it stays attached to the
//! library document. Quoting is passed through verbatim.

use std::path::Path;

use tracing::{debug, error};

use crate::host::Host;
use crate::import::error::{ImportError, ImportResult};
use crate::import::extract::PackageDescriptor;

/// Wraps an interpreter command in the `Electron.run` envelope.
#[must_use]
pub fn electron_run(command: &str) -> String {
    format!("Electron.run \"{command}\"")
}

/// Command that materialises a 3D package shell from a source library.
#[must_use]
pub fn create_3d_package(source_path: &Path) -> String {
    format!("Electron.Create3DPackage \"{}\"", source_path.display())
}

/// The three-command import sequence for one definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCommands {
    /// Selects the source file as the external reference.
    pub select: String,
    /// Copies the qualified definition into the active document.
    pub copy: String,
    /// Removes the external reference.
    pub remove: String,
}

impl ImportCommands {
    /// Builds the sequence for `package` read from `source_path`.
    #[must_use]
    pub fn new(source_path: &Path, package: &PackageDescriptor) -> Self {
        let source = &package.source_name;
        Self {
            select: electron_run(&format!("Use \"{}\"", source_path.display())),
            copy: electron_run(&format!(
                "Copy \"{}.{}@{source}\"",
                package.package_name,
                package.package_type.format_tag()
            )),
            remove: electron_run(&format!("Use \"-{source}\"")),
        }
    }

    /// Commands in submission order.
    #[must_use]
    pub fn in_order(&self) -> [&str; 3] {
        [&self.select, &self.copy, &self.remove]
    }
}

/// Copies `package` from `source_path` into the active document.
///
/// Stops at the first rejected command.
///
/// # Errors
///
/// Returns [`ImportError::Command`] carrying the exact command text that
/// the host rejected.
pub async fn import_definition<H: Host>(
    host: &mut H,
    source_path: &Path,
    package: &PackageDescriptor,
) -> ImportResult<()> {
    let commands = ImportCommands::new(source_path, package);
    for command in commands.in_order() {
        submit(host, command).await?;
    }
    Ok(())
}

/// Submits one command, logging it either way.
async fn submit<H: Host>(host: &mut H, command: &str) -> ImportResult<String> {
    match host.execute_text_command(command).await {
        Ok(output) => {
            debug!(command, "Host command executed");
            Ok(output)
        }
        Err(source) => {
            error!(command, error = %source, "Host command failed");
            Err(ImportError::Command {
                command: command.to_string(),
                source,
            })
        }
    }
}
