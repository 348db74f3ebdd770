//! Path-addressed file operations proposed by the AI assistant, and the
//! workspace context handed to it.
//!
//! The assistant speaks in slash-joined paths, never node IDs. Each
//! proposed operation is validated into a [`FileOperation`] and applied
//! through the regular [`Session`] mutators, one at a time and in order. A
//! failing operation is logged and skipped; it never aborts the rest.

use crate::{
    language_for_filename, split_path, ForgeError, NodeKind, NodePatch, Result, Session,
};
use serde::{Deserialize, Serialize};

/// A single change proposed by the AI assistant.
///
/// Serialized with an internal `type` tag (`"createFile"`, `"moveNode"`, ...)
/// matching the assistant's response schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FileOperation {
    /// Create a file at `path`, optionally with initial content.
    CreateFile {
        path: String,
        #[serde(default)]
        content: Option<String>,
    },
    /// Create an empty folder at `path`.
    CreateFolder { path: String },
    /// Replace the content of the file at `path`.
    UpdateFile { path: String, content: String },
    /// Delete the node at `path` and everything below it.
    DeleteFile { path: String },
    /// Rename the node at `path` in place.
    RenameFile {
        path: String,
        #[serde(rename = "newName")]
        new_name: String,
    },
    /// Move the node at `path` into the folder at `destinationPath`, or to
    /// the workspace root when the destination is empty or missing.
    MoveNode {
        path: String,
        #[serde(default, rename = "destinationPath")]
        destination_path: Option<String>,
    },
}

impl FileOperation {
    /// The path the operation targets.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::CreateFile { path, .. }
            | Self::CreateFolder { path }
            | Self::UpdateFile { path, .. }
            | Self::DeleteFile { path }
            | Self::RenameFile { path, .. }
            | Self::MoveNode { path, .. } => path,
        }
    }

    /// The wire name of the operation's type tag.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::CreateFile { .. } => "createFile",
            Self::CreateFolder { .. } => "createFolder",
            Self::UpdateFile { .. } => "updateFile",
            Self::DeleteFile { .. } => "deleteFile",
            Self::RenameFile { .. } => "renameFile",
            Self::MoveNode { .. } => "moveNode",
        }
    }
}

/// What happened to one proposed operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum OperationStatus {
    Applied,
    Skipped { reason: String },
}

/// The outcome of one entry in an operation list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    /// Position in the submitted list.
    pub index: usize,
    /// Type tag, or `"invalid"` if the entry did not parse.
    pub operation: String,
    pub path: String,
    #[serde(flatten)]
    pub status: OperationStatus,
}

/// Per-operation results of applying an AI response, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub outcomes: Vec<OperationOutcome>,
}

impl ApplyReport {
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == OperationStatus::Applied)
            .count()
    }

    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.applied_count()
    }
}

/// A response from the AI assistant.
///
/// Operations are kept as raw JSON so each one can be validated on its own;
/// a malformed entry is skipped without discarding its neighbours.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiResponse {
    #[serde(default)]
    pub operations: Vec<serde_json::Value>,
    /// Plain generated code, used when the assistant proposes no operations.
    #[serde(default)]
    pub generated_code: Option<String>,
    #[serde(default)]
    pub explanation: String,
}

impl AiResponse {
    /// Parses an assistant response.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::MalformedDocument`] if `json` is not an object
    /// of the response shape.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ForgeError::MalformedDocument(e.to_string()))
    }
}

/// One node of the workspace as presented to the AI assistant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// File content; empty for folders.
    pub content: String,
    /// Paths of the direct children; empty for files.
    pub children: Vec<String>,
}

impl Session {
    /// Applies one path-addressed operation to the active workspace.
    ///
    /// Parent paths are resolved before anything is created: an empty parent
    /// path means the workspace root, while a non-empty one that matches no
    /// node is an error rather than a silent fallback to the root. New files
    /// get a language tag guessed from their extension.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::NodeNotFound`] for unresolvable paths,
    /// [`ForgeError::NotAFile`] when updating a folder's content,
    /// [`ForgeError::MalformedDocument`] for an empty target name, and any
    /// error of the underlying mutator.
    pub fn apply_operation(&mut self, operation: &FileOperation) -> Result<()> {
        match operation {
            FileOperation::CreateFile { path, content } => {
                let (parent_path, name) = split_path(path);
                let name = non_empty_name(name, path)?;
                let parent = self.resolve_target(parent_path)?;
                let id = self.create_node(
                    parent.as_parent(),
                    name,
                    NodeKind::File,
                    language_for_filename(name),
                )?;
                if let Some(content) = content {
                    self.update_node(&id, NodePatch::content(content.as_str()));
                }
            }
            FileOperation::CreateFolder { path } => {
                let (parent_path, name) = split_path(path);
                let name = non_empty_name(name, path)?;
                let parent = self.resolve_target(parent_path)?;
                self.create_node(parent.as_parent(), name, NodeKind::Folder, None)?;
            }
            FileOperation::UpdateFile { path, content } => {
                let id = self.find_by_path(path)?;
                if self.get_node(&id)?.is_folder() {
                    return Err(ForgeError::NotAFile(path.clone()));
                }
                self.update_node(&id, NodePatch::content(content.as_str()));
            }
            FileOperation::DeleteFile { path } => {
                let id = self.find_by_path(path)?;
                self.delete_node(&id);
            }
            FileOperation::RenameFile { path, new_name } => {
                let id = self.find_by_path(path)?;
                self.rename_node(&id, non_empty_name(new_name, path)?);
            }
            FileOperation::MoveNode { path, destination_path } => {
                let id = self.find_by_path(path)?;
                let destination = self.resolve_target(destination_path.as_deref().unwrap_or(""))?;
                self.move_node(&id, destination.as_parent())?;
            }
        }
        Ok(())
    }

    /// Applies `operations` in order, best-effort.
    pub fn apply_operations(&mut self, operations: &[FileOperation]) -> ApplyReport {
        let outcomes = operations
            .iter()
            .enumerate()
            .map(|(index, op)| self.apply_and_record(index, op))
            .collect();
        ApplyReport { outcomes }
    }

    /// Validates and applies an assistant response.
    ///
    /// Each raw operation is parsed on its own; entries that do not parse
    /// are reported as skipped. When the response carries no operations but
    /// does carry generated code, the code is saved to a new root file named
    /// `ai_generated_<NNNN>.js`.
    ///
    /// # Errors
    ///
    /// Only the generated-code fallback can fail, with
    /// [`ForgeError::NoActiveWorkspace`].
    pub fn apply_response(&mut self, response: &AiResponse) -> Result<ApplyReport> {
        if response.operations.is_empty() {
            let mut report = ApplyReport::default();
            if let Some(code) = response.generated_code.as_deref().filter(|c| !c.is_empty()) {
                let millis = chrono::Utc::now().timestamp_millis().rem_euclid(10_000);
                let name = format!("ai_generated_{millis:04}.js");
                let id = self.create_node(None, &name, NodeKind::File, None)?;
                self.update_node(&id, NodePatch::content(code));
                report.outcomes.push(OperationOutcome {
                    index: 0,
                    operation: "createFile".to_string(),
                    path: name,
                    status: OperationStatus::Applied,
                });
            }
            return Ok(report);
        }

        let mut report = ApplyReport::default();
        for (index, raw) in response.operations.iter().enumerate() {
            match serde_json::from_value::<FileOperation>(raw.clone()) {
                Ok(op) => report.outcomes.push(self.apply_and_record(index, &op)),
                Err(e) => {
                    log::warn!("skipping invalid AI operation #{index}: {e}");
                    report.outcomes.push(OperationOutcome {
                        index,
                        operation: "invalid".to_string(),
                        path: raw
                            .get("path")
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        status: OperationStatus::Skipped { reason: e.to_string() },
                    });
                }
            }
        }
        Ok(report)
    }

    /// The active workspace flattened depth-first for the AI assistant, with
    /// children listed by path.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::NoActiveWorkspace`] if no workspace is active.
    pub fn workspace_context(&self) -> Result<Vec<ContextEntry>> {
        let workspace = self.active_workspace().ok_or(ForgeError::NoActiveWorkspace)?;
        Ok(self
            .walk_workspace(workspace)
            .into_iter()
            .map(|(path, node)| ContextEntry {
                children: node
                    .children()
                    .iter()
                    .filter_map(|id| self.node(id))
                    .map(|child| format!("{path}/{}", child.name))
                    .collect(),
                kind: node.kind(),
                content: node.content().unwrap_or_default().to_string(),
                path,
            })
            .collect())
    }

    fn apply_and_record(&mut self, index: usize, op: &FileOperation) -> OperationOutcome {
        let status = match self.apply_operation(op) {
            Ok(()) => OperationStatus::Applied,
            Err(e) => {
                log::warn!("skipping AI operation #{index} {} {}: {e}", op.type_name(), op.path());
                OperationStatus::Skipped { reason: e.to_string() }
            }
        };
        OperationOutcome {
            index,
            operation: op.type_name().to_string(),
            path: op.path().to_string(),
            status,
        }
    }
}

fn non_empty_name<'a>(name: &'a str, path: &str) -> Result<&'a str> {
    if name.trim().is_empty() {
        return Err(ForgeError::MalformedDocument(format!("no name in path '{path}'")));
    }
    Ok(name)
}
