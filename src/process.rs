//! Companion client processes.
//!
//! The browser-like client that lets users pick parts runs as a separate
//! executable shipped next to the plugin. Every launch is tracked so the
//! whole set can be killed when the bridge shuts down.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Client executable path relative to the plugin directory.
#[cfg(windows)]
pub const CLIENT_EXECUTABLE: &str = "SnapEDA for Fusion 360";

/// Client executable path relative to the plugin directory.
#[cfg(not(windows))]
pub const CLIENT_EXECUTABLE: &str = "SnapEDA for Fusion 360.app/Contents/MacOS/SnapEDA for Fusion 360";

/// Image name swept by `taskkill` in case a child outlived its PID.
pub const CLIENT_IMAGE_NAME: &str = "SnapEDA for Autodesk Fusion 360.exe";

/// Staged self-update binary that replaces [`PLUGIN_BINARY`] at startup.
pub const UPDATED_PLUGIN_BINARY: &str = "new-snapeda-fusion-plugin.exe";

/// Installed plugin binary.
pub const PLUGIN_BINARY: &str = "snapeda-fusion-plugin.exe";

/// Default client executable for `plugin_dir`.
#[must_use]
pub fn default_client_executable(plugin_dir: &Path) -> PathBuf {
    plugin_dir.join(CLIENT_EXECUTABLE)
}

/// Tracks every client launched during the bridge's lifetime.
#[derive(Debug, Default)]
pub struct ClientProcesses {
    children: Vec<Child>,
    image_name: Option<String>,
}

impl ClientProcesses {
    /// Creates an empty set.
    ///
    /// `image_name` is additionally force-killed by name on Windows.
    #[must_use]
    pub fn new(image_name: Option<String>) -> Self {
        Self {
            children: Vec::new(),
            image_name,
        }
    }

    /// Starts `executable` detached from the bridge's stdio.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    pub fn launch(&mut self, executable: &Path) -> io::Result<u32> {
        let child = Command::new(executable)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let pid = child
            .id()
            .ok_or_else(|| io::Error::other("client exited before reporting a PID"))?;
        info!(pid, executable = %executable.display(), "Client launched");
        self.children.push(child);
        Ok(pid)
    }

    /// Number of tracked clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether no client is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Force-kills every tracked client and forgets them.
    pub fn terminate_all(&mut self) {
        if self.children.is_empty() {
            return;
        }
        for mut child in self.children.drain(..) {
            let Some(pid) = child.id() else {
                continue;
            };
            debug!(pid, "Killing client");
            kill_tree(&mut child, pid, self.image_name.as_deref());
        }
    }
}

impl Drop for ClientProcesses {
    fn drop(&mut self) {
        self.terminate_all();
    }
}

#[cfg(windows)]
fn kill_tree(_child: &mut Child, pid: u32, image_name: Option<&str>) {
    let by_pid = std::process::Command::new("taskkill")
        .args(["/F", "/PID", &pid.to_string(), "/T"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    if let Err(e) = by_pid {
        warn!(pid, error = %e, "taskkill failed");
    }

    if let Some(image) = image_name {
        let by_image = std::process::Command::new("taskkill")
            .args(["/F", "/IM", image, "/T"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Err(e) = by_image {
            warn!(image, error = %e, "taskkill failed");
        }
    }
}

#[cfg(not(windows))]
fn kill_tree(child: &mut Child, pid: u32, _image_name: Option<&str>) {
    if let Err(e) = child.start_kill() {
        warn!(pid, error = %e, "Failed to kill client");
    }
}

/// Swaps in a staged plugin update, if one is present in `plugin_dir`.
///
/// Returns `true` when the update was applied.
///
/// # Errors
///
/// Returns an error if the old binary cannot be removed or the new one
/// cannot be renamed into place.
pub fn apply_pending_update(plugin_dir: &Path) -> io::Result<bool> {
    let staged = plugin_dir.join(UPDATED_PLUGIN_BINARY);
    if !staged.exists() {
        return Ok(false);
    }

    let current = plugin_dir.join(PLUGIN_BINARY);
    match std::fs::remove_file(&current) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    std::fs::rename(&staged, &current)?;
    info!(path = %current.display(), "Applied staged plugin update");
    Ok(true)
}
