//! Shared fixtures for integration tests.
//!
//! [`FakeHost`] keeps an in-memory data store, records every call and can
//! be told to fail specific operations or commands.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use snapeda_importer::host::{
    DataFile, DocumentHandle, Host, HostError, HostResult, OccurrenceId, Transform, Urn,
};

/// One recorded host call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FindDataFile(String),
    ListRootFolder,
    CloseActiveDocument,
    OpenDocument(String),
    CreateDocument { name: String, commit_message: String },
    SaveActiveAs(String),
    Command(String),
    ImportStep(PathBuf),
    SetTransform(String, Transform),
    ShowMessage(String),
}

/// In-memory host.
#[derive(Debug)]
pub struct FakeHost {
    /// Files in the project's root folder, which doubles as the data store.
    pub files: Vec<DataFile>,
    /// Every call, in order.
    pub calls: Vec<Call>,
    /// Occurrences returned by the next `import_step`.
    pub occurrences: Vec<OccurrenceId>,
    failing_ops: HashSet<&'static str>,
    failing_commands: Vec<String>,
    next_urn: u32,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            calls: Vec::new(),
            occurrences: vec![OccurrenceId::new("occ:1")],
            failing_ops: HashSet::new(),
            failing_commands: Vec::new(),
            next_urn: 0,
        }
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an existing file to the root folder and returns its identifier.
    pub fn with_file(mut self, name: &str) -> (Self, Urn) {
        let id = self.mint(name);
        (self, id)
    }

    /// Makes every call to `op` fail.
    pub fn fail_op(mut self, op: &'static str) -> Self {
        self.failing_ops.insert(op);
        self
    }

    /// Makes every text command containing `fragment` fail.
    pub fn fail_command(mut self, fragment: &str) -> Self {
        self.failing_commands.push(fragment.to_string());
        self
    }

    /// Text commands, in order.
    pub fn commands(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Command(command) => Some(command.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of files named `name`.
    pub fn count_named(&self, name: &str) -> usize {
        self.files.iter().filter(|f| f.name == name).count()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    fn mint(&mut self, name: &str) -> Urn {
        self.next_urn += 1;
        let id = Urn::new(format!("urn:fake:{}", self.next_urn));
        self.files.push(DataFile {
            id: id.clone(),
            name: name.to_string(),
        });
        id
    }

    fn check(&self, op: &'static str) -> HostResult<()> {
        if self.failing_ops.contains(op) {
            return Err(HostError::rejected(op, "injected failure"));
        }
        Ok(())
    }

    fn lookup(&self, id: &Urn) -> HostResult<DataFile> {
        self.files
            .iter()
            .find(|f| &f.id == id)
            .cloned()
            .ok_or_else(|| HostError::not_found(id.to_string()))
    }
}

#[async_trait(?Send)]
impl Host for FakeHost {
    async fn find_data_file(&mut self, id: &Urn) -> HostResult<DataFile> {
        self.calls.push(Call::FindDataFile(id.to_string()));
        self.check("find_data_file")?;
        self.lookup(id)
    }

    async fn list_root_folder(&mut self) -> HostResult<Vec<DataFile>> {
        self.calls.push(Call::ListRootFolder);
        self.check("list_root_folder")?;
        Ok(self.files.clone())
    }

    async fn close_active_document(&mut self) -> HostResult<()> {
        self.calls.push(Call::CloseActiveDocument);
        self.check("close_active_document")
    }

    async fn open_document(&mut self, id: &Urn) -> HostResult<DocumentHandle> {
        self.calls.push(Call::OpenDocument(id.to_string()));
        self.check("open_document")?;
        let file = self.lookup(id)?;
        Ok(DocumentHandle {
            name: file.name,
            id: Some(file.id),
        })
    }

    async fn create_document(
        &mut self,
        name: &str,
        commit_message: &str,
    ) -> HostResult<DocumentHandle> {
        self.calls.push(Call::CreateDocument {
            name: name.to_string(),
            commit_message: commit_message.to_string(),
        });
        self.check("create_document")?;
        let id = self.mint(name);
        Ok(DocumentHandle {
            name: name.to_string(),
            id: Some(id),
        })
    }

    async fn save_active_as(&mut self, name: &str) -> HostResult<DocumentHandle> {
        self.calls.push(Call::SaveActiveAs(name.to_string()));
        self.check("save_active_as")?;
        let id = self.mint(name);
        Ok(DocumentHandle {
            name: name.to_string(),
            id: Some(id),
        })
    }

    async fn execute_text_command(&mut self, command: &str) -> HostResult<String> {
        self.calls.push(Call::Command(command.to_string()));
        self.check("execute_text_command")?;
        if self
            .failing_commands
            .iter()
            .any(|fragment| command.contains(fragment.as_str()))
        {
            return Err(HostError::rejected("execute_text_command", "command failed"));
        }
        Ok(String::new())
    }

    async fn import_step(&mut self, path: &Path) -> HostResult<Vec<OccurrenceId>> {
        self.calls.push(Call::ImportStep(path.to_path_buf()));
        self.check("import_step")?;
        Ok(self.occurrences.clone())
    }

    async fn set_occurrence_transform(
        &mut self,
        occurrence: &OccurrenceId,
        transform: &Transform,
    ) -> HostResult<()> {
        self.calls
            .push(Call::SetTransform(occurrence.to_string(), *transform));
        self.check("set_occurrence_transform")
    }

    async fn show_message(&mut self, text: &str) -> HostResult<()> {
        self.calls.push(Call::ShowMessage(text.to_string()));
        self.check("show_message")
    }
}

/// EAGLE library whose deviceset is named `name`.
pub fn device_library(name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE eagle SYSTEM "eagle.dtd">
<eagle version="9.6.2">
  <drawing>
    <library>
      <packages>
        <package name="{name}_PKG"/>
      </packages>
      <devicesets>
        <deviceset name="{name}"/>
      </devicesets>
    </library>
  </drawing>
</eagle>
"#
    )
}

/// EAGLE library with packages only.
pub fn package_library(name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<eagle version="9.6.2">
  <drawing>
    <library>
      <packages>
        <package name="{name}"/>
      </packages>
    </library>
  </drawing>
</eagle>
"#
    )
}

/// Payload object for a library download into `lib_path`.
pub fn payload(lib_path: &Path, target: &str) -> serde_json::Value {
    serde_json::json!({
        "lib_path": lib_path.to_string_lossy(),
        "target_library": target,
    })
}
