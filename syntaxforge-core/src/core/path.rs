//! Slash-joined logical paths for nodes.
//!
//! Paths are derived from names by walking parent links; they are never
//! stored. Resolving a path back to a node therefore scans the active
//! workspace, and because sibling names may repeat, the first match in
//! display order wins.

use crate::{FileNode, ForgeError, Result, Session, Workspace};

/// Where a path points inside the active workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTarget {
    /// `""` or `"/"`: the workspace's root level, which is not a node.
    Root,
    /// An existing node.
    Node(String),
}

impl PathTarget {
    /// The node ID to use as a parent: `None` for the root level.
    pub fn as_parent(&self) -> Option<&str> {
        match self {
            Self::Root => None,
            Self::Node(id) => Some(id),
        }
    }
}

/// Strips a leading `/`, as paths from the AI service are sometimes absolute.
pub fn normalize_path(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Splits a path into its parent path and final name.
///
/// ```rust
/// use syntaxforge_core::split_path;
///
/// assert_eq!(split_path("/app/src/index.js"), ("app/src", "index.js"));
/// assert_eq!(split_path("README.md"), ("", "README.md"));
/// ```
pub fn split_path(path: &str) -> (&str, &str) {
    let path = normalize_path(path);
    path.rsplit_once('/').unwrap_or(("", path))
}

impl Session {
    /// Returns the slash-joined path of `node_id`, starting at its workspace root.
    ///
    /// A root node resolves to its own name; any other node resolves to its
    /// parent's path, a `/`, and its name.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::NodeNotFound`] if `node_id` (or, in a corrupt
    /// store, one of its ancestors) does not exist, and
    /// [`ForgeError::Integrity`] if the parent chain loops.
    pub fn resolve_path(&self, node_id: &str) -> Result<String> {
        let mut current = self.get_node(node_id)?;
        let mut segments = vec![current.name.as_str()];
        while let Some(parent_id) = current.parent_id.as_deref() {
            if segments.len() > self.node_count() {
                return Err(ForgeError::Integrity(format!("parent chain of {node_id} loops")));
            }
            current = self.get_node(parent_id)?;
            segments.push(current.name.as_str());
        }
        segments.reverse();
        Ok(segments.join("/"))
    }

    /// Every node of `workspace` paired with its path, depth-first in
    /// display order.
    pub fn walk_workspace<'a>(&'a self, workspace: &'a Workspace) -> Vec<(String, &'a FileNode)> {
        let mut out = Vec::new();
        let mut stack: Vec<(String, &str)> = workspace
            .root_file_ids
            .iter()
            .rev()
            .map(|id| (String::new(), id.as_str()))
            .collect();
        while let Some((prefix, id)) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            let path = if prefix.is_empty() {
                node.name.clone()
            } else {
                format!("{prefix}/{}", node.name)
            };
            for child_id in node.children().iter().rev() {
                stack.push((path.clone(), child_id.as_str()));
            }
            out.push((path, node));
            if out.len() > self.node_count() {
                break;
            }
        }
        out
    }

    /// Resolves `path` against the active workspace.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::NoActiveWorkspace`] if no workspace is active,
    /// and [`ForgeError::NodeNotFound`] if no node has this path.
    pub fn resolve_target(&self, path: &str) -> Result<PathTarget> {
        let path = normalize_path(path);
        if path.is_empty() {
            return Ok(PathTarget::Root);
        }
        let workspace = self.active_workspace().ok_or(ForgeError::NoActiveWorkspace)?;
        self.walk_workspace(workspace)
            .into_iter()
            .find(|(p, _)| p == path)
            .map(|(_, node)| PathTarget::Node(node.id.clone()))
            .ok_or_else(|| ForgeError::NodeNotFound(path.to_string()))
    }

    /// Resolves `path` to a node ID in the active workspace.
    ///
    /// # Errors
    ///
    /// As [`Self::resolve_target`]; the root level is reported as
    /// [`ForgeError::NodeNotFound`] because it is not a node.
    pub fn find_by_path(&self, path: &str) -> Result<String> {
        match self.resolve_target(path)? {
            PathTarget::Node(id) => Ok(id),
            PathTarget::Root => Err(ForgeError::NodeNotFound(path.to_string())),
        }
    }
}
