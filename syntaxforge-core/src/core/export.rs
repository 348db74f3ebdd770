//! Workspace and subtree export to nested JSON documents, and import back
//! into the session with fresh identifiers.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::node::default_language;
use crate::{FileNode, ForgeError, NodeBody, Result, Session, Workspace};

/// A node and its descendants with identifiers stripped.
///
/// Child order is preserved; `id` and `parentId` are regenerated on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeDocument {
    File {
        name: String,
        #[serde(default)]
        content: String,
        #[serde(default = "default_language")]
        language: String,
    },
    Folder {
        name: String,
        #[serde(default)]
        children: Vec<NodeDocument>,
    },
}

impl NodeDocument {
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Folder { name, .. } => name,
        }
    }

    /// Parses a single-node export.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::MalformedDocument`] if the JSON does not have
    /// the export shape.
    pub fn from_json(json: &str) -> Result<Self> {
        parse_document(json)
    }
}

/// Parses an export document of any nesting depth.
///
/// Folder nesting is unbounded, so serde_json's recursion limit is lifted
/// and the stack grows on demand instead.
fn parse_document<T: DeserializeOwned>(json: &str) -> Result<T> {
    let mut de = serde_json::Deserializer::from_str(json);
    de.disable_recursion_limit();
    let malformed = |e: serde_json::Error| ForgeError::MalformedDocument(e.to_string());
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut de)).map_err(malformed)?;
    de.end().map_err(malformed)?;
    Ok(value)
}

/// Workspace metadata carried in a workspace export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMeta {
    pub name: String,
    #[serde(default = "now_millis")]
    pub created_at: i64,
    /// Root IDs at export time; informational only, never reused on import.
    #[serde(default)]
    pub root_file_ids: Vec<String>,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Top-level JSON structure of a `<name>_workspace.json` export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    pub workspace: WorkspaceMeta,
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
}

impl WorkspaceDocument {
    /// Parses a workspace export.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::MalformedDocument`] if required fields are
    /// missing or have the wrong type.
    pub fn from_json(json: &str) -> Result<Self> {
        parse_document(json)
    }
}

/// A file ready to be written out: suggested filename plus contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub contents: String,
}

impl Session {
    /// Exports `node_id` and, for folders, its children in display order.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::NodeNotFound`] if `node_id` does not exist.
    pub fn export_subtree(&self, node_id: &str) -> Result<NodeDocument> {
        self.get_node(node_id)?;
        // Children are built before their parents by walking pre-order backwards.
        let mut built: HashMap<String, NodeDocument> = HashMap::new();
        for id in self.subtree_ids(node_id).into_iter().rev() {
            let node = self.get_node(&id)?;
            let document = match &node.body {
                NodeBody::File { content, language } => NodeDocument::File {
                    name: node.name.clone(),
                    content: content.clone(),
                    language: language.clone(),
                },
                NodeBody::Folder { children } => NodeDocument::Folder {
                    name: node.name.clone(),
                    children: children
                        .iter()
                        .map(|child| {
                            built
                                .remove(child)
                                .ok_or_else(|| ForgeError::NodeNotFound(child.clone()))
                        })
                        .collect::<Result<Vec<_>>>()?,
                },
            };
            built.insert(id, document);
        }
        built
            .remove(node_id)
            .ok_or_else(|| ForgeError::NodeNotFound(node_id.to_string()))
    }

    /// Exports a workspace's metadata and every root subtree in order.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::WorkspaceNotFound`] for an unknown workspace and
    /// [`ForgeError::NodeNotFound`] if the store is missing a referenced node.
    pub fn export_workspace(&self, workspace_id: &str) -> Result<WorkspaceDocument> {
        let workspace = self
            .workspace(workspace_id)
            .ok_or_else(|| ForgeError::WorkspaceNotFound(workspace_id.to_string()))?;
        let nodes = workspace
            .root_file_ids
            .iter()
            .map(|id| self.export_subtree(id))
            .collect::<Result<Vec<_>>>()?;
        Ok(WorkspaceDocument {
            workspace: WorkspaceMeta {
                name: workspace.name.clone(),
                created_at: workspace.created_at,
                root_file_ids: workspace.root_file_ids.clone(),
            },
            nodes,
        })
    }

    /// Exports a single node for download: a file's raw content under its
    /// own name, or a folder's subtree as pretty JSON in `<name>.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::NodeNotFound`] if `node_id` does not exist.
    pub fn export_node_file(&self, node_id: &str) -> Result<ExportFile> {
        let node = self.get_node(node_id)?;
        match &node.body {
            NodeBody::File { content, .. } => Ok(ExportFile {
                filename: node.name.clone(),
                contents: content.clone(),
            }),
            NodeBody::Folder { .. } => Ok(ExportFile {
                filename: format!("{}.json", node.name),
                contents: serde_json::to_string_pretty(&self.export_subtree(node_id)?)?,
            }),
        }
    }

    /// Exports a workspace as pretty JSON in `<name>_workspace.json`.
    ///
    /// # Errors
    ///
    /// As [`Self::export_workspace`].
    pub fn export_workspace_file(&self, workspace_id: &str) -> Result<ExportFile> {
        let document = self.export_workspace(workspace_id)?;
        Ok(ExportFile {
            filename: format!("{}_workspace.json", document.workspace.name),
            contents: serde_json::to_string_pretty(&document)?,
        })
    }

    /// Parses a workspace export and imports it as a new, active workspace.
    ///
    /// Returns the new workspace ID.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::MalformedDocument`] if `json` is not a workspace
    /// export. The session is untouched on error.
    pub fn import_workspace(&mut self, json: &str) -> Result<String> {
        let document = WorkspaceDocument::from_json(json)?;
        Ok(self.import_workspace_document(document))
    }

    /// Imports an already-parsed workspace document as a new, active
    /// workspace. Every workspace and node receives a fresh ID; names,
    /// contents, languages, child order and `createdAt` are kept.
    pub fn import_workspace_document(&mut self, document: WorkspaceDocument) -> String {
        let WorkspaceDocument { workspace: meta, nodes } = document;
        let mut workspace = Workspace::new(meta.name);
        workspace.created_at = meta.created_at;
        workspace.root_file_ids = nodes
            .into_iter()
            .map(|doc| self.build_subtree(doc, None))
            .collect();

        let id = workspace.id.clone();
        log::debug!(
            "imported workspace {id} ({}) with {} roots",
            workspace.name,
            workspace.root_file_ids.len()
        );
        self.register_workspace(workspace);
        id
    }

    /// Parses a single-node export and attaches it under `parent_id`, or as
    /// a root of the active workspace when `parent_id` is `None`.
    ///
    /// Returns the ID of the imported top node.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::MalformedDocument`] for an invalid document,
    /// [`ForgeError::ParentNotFound`]/[`ForgeError::ParentNotFolder`] for an
    /// invalid parent, and [`ForgeError::NoActiveWorkspace`] for a root
    /// import with no active workspace. The session is untouched on error.
    pub fn import_subtree(&mut self, json: &str, parent_id: Option<&str>) -> Result<String> {
        let document = NodeDocument::from_json(json)?;
        match parent_id {
            Some(pid) => {
                self.require_folder(pid)?;
                let id = self.build_subtree(document, parent_id);
                self.push_child(pid, &id);
                Ok(id)
            }
            None => {
                let index = self.active_workspace_index()?;
                let id = self.build_subtree(document, None);
                self.push_root(index, &id);
                Ok(id)
            }
        }
    }

    /// Inserts `document` and its descendants with fresh IDs, wiring each
    /// child to its new parent. The top node's own parent link is set to
    /// `parent_id` but it is not attached anywhere.
    fn build_subtree(&mut self, document: NodeDocument, parent_id: Option<&str>) -> String {
        let top = self.fresh_id();
        // (document, its new id, parent to append it to)
        let mut pending = vec![(document, top.clone(), None::<String>)];
        while let Some((document, id, attach_to)) = pending.pop() {
            let parent = match &attach_to {
                Some(pid) => Some(pid.clone()),
                None => parent_id.map(str::to_string),
            };
            match document {
                NodeDocument::File { name, content, language } => {
                    self.insert_node(FileNode {
                        id: id.clone(),
                        name,
                        parent_id: parent,
                        body: NodeBody::File { content, language },
                    });
                }
                NodeDocument::Folder { name, children } => {
                    self.insert_node(FileNode {
                        id: id.clone(),
                        name,
                        parent_id: parent,
                        body: NodeBody::Folder { children: Vec::new() },
                    });
                    for child in children.into_iter().rev() {
                        let child_id = self.fresh_id();
                        pending.push((child, child_id, Some(id.clone())));
                    }
                }
            }
            if let Some(pid) = attach_to {
                self.push_child(&pid, &id);
            }
        }
        top
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeKind, NodePatch};
    use std::collections::HashSet;

    /// Helper: W with roots `src/{index.js, lib/}` and `README.md`.
    fn sample() -> (Session, String) {
        let mut session = Session::new();
        let ws_id = session.create_workspace("W");
        let src = session.create_node(None, "src", NodeKind::Folder, None).unwrap();
        let index = session
            .create_node(Some(&src), "index.js", NodeKind::File, None)
            .unwrap();
        session.update_node(&index, NodePatch::content("x=1"));
        session.create_node(Some(&src), "lib", NodeKind::Folder, None).unwrap();
        let readme = session
            .create_node(None, "README.md", NodeKind::File, Some("markdown"))
            .unwrap();
        session.update_node(&readme, NodePatch::content("# W"));
        (session, ws_id)
    }

    #[test]
    fn test_export_subtree_strips_ids() {
        let (session, _) = sample();
        let src = session.find_by_path("src").unwrap();
        let doc = session.export_subtree(&src).unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["type"], "folder");
        assert_eq!(json["children"][0]["name"], "index.js");
        assert_eq!(json["children"][0]["content"], "x=1");
        assert_eq!(json["children"][1]["type"], "folder");
        assert!(json.get("id").is_none());
        assert!(json["children"][0].get("parentId").is_none());
    }

    #[test]
    fn test_export_workspace_shape() {
        let (session, ws_id) = sample();
        let doc = session.export_workspace(&ws_id).unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["workspace"]["name"], "W");
        assert!(json["workspace"]["createdAt"].is_i64());
        assert_eq!(json["workspace"]["rootFileIds"].as_array().unwrap().len(), 2);
        assert_eq!(json["nodes"][1]["name"], "README.md");
        assert_eq!(json["nodes"][1]["language"], "markdown");
    }

    #[test]
    fn test_round_trip_is_isomorphic_with_disjoint_ids() {
        let (mut session, ws_id) = sample();
        let old_ids: HashSet<String> = session.nodes().map(|n| n.id.clone()).collect();
        let original = session.export_workspace(&ws_id).unwrap();

        let json = serde_json::to_string(&original).unwrap();
        let new_ws = session.import_workspace(&json).unwrap();

        assert_ne!(new_ws, ws_id);
        assert_eq!(session.active_workspace_id(), Some(new_ws.as_str()));
        let copy = session.export_workspace(&new_ws).unwrap();
        assert_eq!(copy.nodes, original.nodes);
        assert_eq!(copy.workspace.name, original.workspace.name);
        assert_eq!(copy.workspace.created_at, original.workspace.created_at);

        let imported = session.workspace(&new_ws).unwrap().clone();
        for (_, node) in session.walk_workspace(&imported) {
            assert!(!old_ids.contains(&node.id), "imported id collides: {}", node.id);
        }
        assert_eq!(session.node_count(), old_ids.len() * 2);
        session.verify_integrity().unwrap();
    }

    #[test]
    fn test_import_wires_parent_links() {
        let (mut session, ws_id) = sample();
        let json = serde_json::to_string(&session.export_workspace(&ws_id).unwrap()).unwrap();
        session.import_workspace(&json).unwrap();
        let index = session.find_by_path("src/index.js").unwrap();
        let src = session.find_by_path("src").unwrap();
        assert_eq!(session.get_node(&index).unwrap().parent_id.as_deref(), Some(src.as_str()));
        assert_eq!(session.resolve_path(&index).unwrap(), "src/index.js");
    }

    #[test]
    fn test_import_defaults_optional_fields() {
        let mut session = Session::new();
        let json = r#"{
            "workspace": {"name": "Sparse"},
            "nodes": [
                {"type": "folder", "name": "empty"},
                {"type": "file", "name": "a.js"}
            ]
        }"#;
        let ws_id = session.import_workspace(json).unwrap();
        let ws = session.workspace(&ws_id).unwrap();
        assert_eq!(ws.root_file_ids.len(), 2);
        let folder = session.get_node(&ws.root_file_ids[0]).unwrap();
        assert!(folder.children().is_empty());
        let file = session.get_node(&ws.root_file_ids[1]).unwrap();
        assert_eq!(file.content(), Some(""));
        assert_eq!(file.language(), Some(crate::DEFAULT_LANGUAGE));
    }

    #[test]
    fn test_malformed_import_leaves_state_untouched() {
        let (mut session, _) = sample();
        let before = session.clone();
        for bad in [
            "not json",
            r#"{"nodes": []}"#,
            r#"{"workspace": {"name": 5}, "nodes": []}"#,
            r#"{"workspace": {"name": "W"}, "nodes": [{"type": "symlink", "name": "x"}]}"#,
            r#"{"workspace": {"name": "W"}, "nodes": [{"type": "file"}]}"#,
        ] {
            let result = session.import_workspace(bad);
            assert!(
                matches!(result, Err(ForgeError::MalformedDocument(_))),
                "expected MalformedDocument for {bad}"
            );
        }
        assert_eq!(session, before);
    }

    #[test]
    fn test_export_node_file_names() {
        let (session, ws_id) = sample();
        let index = session.find_by_path("src/index.js").unwrap();
        let file = session.export_node_file(&index).unwrap();
        assert_eq!(file.filename, "index.js");
        assert_eq!(file.contents, "x=1");

        let src = session.find_by_path("src").unwrap();
        let folder = session.export_node_file(&src).unwrap();
        assert_eq!(folder.filename, "src.json");
        assert!(NodeDocument::from_json(&folder.contents).is_ok());

        let ws = session.export_workspace_file(&ws_id).unwrap();
        assert_eq!(ws.filename, "W_workspace.json");
    }

    #[test]
    fn test_import_subtree_under_folder() {
        let (mut session, _) = sample();
        let src = session.find_by_path("src").unwrap();
        let lib = session.find_by_path("src/lib").unwrap();
        let exported = session.export_node_file(&src).unwrap();

        let copy = session.import_subtree(&exported.contents, Some(&lib)).unwrap();
        assert_eq!(session.resolve_path(&copy).unwrap(), "src/lib/src");
        assert_eq!(session.get_node(&lib).unwrap().children(), &[copy.clone()]);
        let copied_index = session.find_by_path("src/lib/src/index.js").unwrap();
        assert_eq!(session.get_node(&copied_index).unwrap().content(), Some("x=1"));
        session.verify_integrity().unwrap();
    }

    #[test]
    fn test_import_subtree_rejects_file_parent() {
        let (mut session, _) = sample();
        let readme = session.find_by_path("README.md").unwrap();
        let before = session.clone();
        let result = session.import_subtree(r#"{"type":"file","name":"x"}"#, Some(&readme));
        assert!(matches!(result, Err(ForgeError::ParentNotFolder(_))));
        assert_eq!(session, before);
    }

    #[test]
    fn test_deeply_nested_workspace_round_trips() {
        let mut session = Session::new();
        let ws_id = session.create_workspace("Deep");
        let mut parent = session.create_node(None, "d0", NodeKind::Folder, None).unwrap();
        for depth in 1..200 {
            parent = session
                .create_node(Some(&parent), &format!("d{depth}"), NodeKind::Folder, None)
                .unwrap();
        }
        let leaf = session.create_node(Some(&parent), "leaf.js", NodeKind::File, None).unwrap();
        session.update_node(&leaf, NodePatch::content("bottom"));

        let file = session.export_workspace_file(&ws_id).unwrap();
        let new_ws = session.import_workspace(&file.contents).unwrap();

        let copy = session.export_workspace(&new_ws).unwrap();
        assert_eq!(copy.nodes, session.export_workspace(&ws_id).unwrap().nodes);
        assert_eq!(session.node_count(), 402);
        let leaf_path = session.resolve_path(&leaf).unwrap();
        let copied_leaf = session.find_by_path(&leaf_path).unwrap();
        assert_ne!(copied_leaf, leaf);
        assert_eq!(session.get_node(&copied_leaf).unwrap().content(), Some("bottom"));
        session.verify_integrity().unwrap();
    }

    #[test]
    fn test_trailing_garbage_is_malformed() {
        let result = NodeDocument::from_json(r#"{"type":"file","name":"a"} extra"#);
        assert!(matches!(result, Err(ForgeError::MalformedDocument(_))));
    }

    #[test]
    fn test_export_unknown_workspace() {
        let (session, _) = sample();
        assert!(matches!(
            session.export_workspace("nope"),
            Err(ForgeError::WorkspaceNotFound(_))
        ));
    }
}
