//! The session context: node store, workspace registry, and tree mutations.

use crate::{DeleteResult, FileNode, ForgeError, NodeBody, NodeKind, NodePatch, Result, Workspace};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// All tree state for one application session.
///
/// `Session` owns every [`FileNode`] in a flat id → record map and keeps an
/// ordered registry of [`Workspace`]s that reference their root nodes by id.
/// Every mutation goes through a `Session` method, which keeps folder
/// `children` lists and node `parent_id` links consistent and rejects moves
/// that would create a cycle.
///
/// Its serde form is the persistence snapshot: `workspaces`,
/// `activeWorkspaceId`, and `nodes`. The active file is UI state and is not
/// persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    workspaces: Vec<Workspace>,
    #[serde(default)]
    active_workspace_id: Option<String>,
    #[serde(default)]
    nodes: HashMap<String, FileNode>,
    #[serde(skip)]
    active_file_id: Option<String>,
}

impl Session {
    /// Creates an empty session with no workspaces.
    pub fn new() -> Self {
        Self::default()
    }

    // ── queries ──────────────────────────────────────────────────

    /// Registered workspaces in creation order.
    pub fn workspaces(&self) -> &[Workspace] {
        &self.workspaces
    }

    pub fn workspace(&self, workspace_id: &str) -> Option<&Workspace> {
        self.workspaces.iter().find(|w| w.id == workspace_id)
    }

    pub fn active_workspace_id(&self) -> Option<&str> {
        self.active_workspace_id.as_deref()
    }

    pub fn active_workspace(&self) -> Option<&Workspace> {
        self.active_workspace_id.as_deref().and_then(|id| self.workspace(id))
    }

    pub fn active_file_id(&self) -> Option<&str> {
        self.active_file_id.as_deref()
    }

    pub fn node(&self, node_id: &str) -> Option<&FileNode> {
        self.nodes.get(node_id)
    }

    /// Fetches a node by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::NodeNotFound`] if no node has this ID.
    pub fn get_node(&self, node_id: &str) -> Result<&FileNode> {
        self.nodes
            .get(node_id)
            .ok_or_else(|| ForgeError::NodeNotFound(node_id.to_string()))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &FileNode> {
        self.nodes.values()
    }

    /// The child records of `folder_id` in display order.
    ///
    /// Empty for files and for IDs that do not exist.
    pub fn folder_contents(&self, folder_id: &str) -> Vec<&FileNode> {
        self.nodes
            .get(folder_id)
            .map(|folder| {
                folder
                    .children()
                    .iter()
                    .filter_map(|id| self.nodes.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The workspace whose reachable set contains `node_id`, if any.
    pub fn workspace_of(&self, node_id: &str) -> Option<&Workspace> {
        let mut current = self.nodes.get(node_id)?;
        for _ in 0..=self.nodes.len() {
            match current.parent_id.as_deref() {
                Some(pid) => current = self.nodes.get(pid)?,
                None => return self.workspaces.iter().find(|w| w.has_root(&current.id)),
            }
        }
        None
    }

    /// `node_id` followed by every descendant, depth-first in display order.
    ///
    /// Empty if `node_id` does not exist.
    pub fn subtree_ids(&self, node_id: &str) -> Vec<String> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(node_id) {
            return out;
        }
        let mut seen = HashSet::new();
        let mut stack = vec![node_id.to_string()];
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children().iter().rev().cloned());
                out.push(id);
            }
        }
        out
    }

    // ── workspace registry ───────────────────────────────────────

    /// Registers an empty workspace named `name` and returns its ID.
    ///
    /// The new workspace becomes active if no workspace was active.
    pub fn create_workspace(&mut self, name: &str) -> String {
        let workspace = Workspace::new(name);
        let id = workspace.id.clone();
        self.workspaces.push(workspace);
        if self.active_workspace_id.is_none() {
            self.active_workspace_id = Some(id.clone());
        }
        log::debug!("created workspace {id} ({name})");
        id
    }

    /// Deletes a workspace and every node reachable from its roots.
    ///
    /// If it was the active workspace, the first remaining workspace (if
    /// any) becomes active. A missing `workspace_id` is a no-op.
    pub fn delete_workspace(&mut self, workspace_id: &str) -> DeleteResult {
        let Some(index) = self.workspaces.iter().position(|w| w.id == workspace_id) else {
            log::warn!("delete_workspace: {workspace_id} not found; ignoring");
            return DeleteResult::default();
        };
        let workspace = self.workspaces.remove(index);

        let mut removed = Vec::new();
        for root_id in &workspace.root_file_ids {
            removed.extend(self.subtree_ids(root_id));
        }
        self.remove_nodes(&removed);

        if self.active_workspace_id.as_deref() == Some(workspace_id) {
            self.active_workspace_id = self.workspaces.first().map(|w| w.id.clone());
        }
        log::debug!(
            "deleted workspace {workspace_id} ({} nodes)",
            removed.len()
        );
        DeleteResult::from_removed(removed)
    }

    /// Makes `workspace_id` the target of root-level creates and moves.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::WorkspaceNotFound`] for an unknown ID.
    pub fn set_active_workspace(&mut self, workspace_id: &str) -> Result<()> {
        if self.workspace(workspace_id).is_none() {
            return Err(ForgeError::WorkspaceNotFound(workspace_id.to_string()));
        }
        self.active_workspace_id = Some(workspace_id.to_string());
        Ok(())
    }

    /// Sets or clears the file shown in the editor.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::NodeNotFound`] for an unknown ID.
    pub fn set_active_file(&mut self, node_id: Option<&str>) -> Result<()> {
        if let Some(id) = node_id {
            self.get_node(id)?;
        }
        self.active_file_id = node_id.map(str::to_string);
        Ok(())
    }

    // ── tree mutations ───────────────────────────────────────────

    /// Creates a node under `parent_id`, or as a root of the active workspace
    /// when `parent_id` is `None`, and returns its ID.
    ///
    /// Files start empty with `language` (or the default tag); folders start
    /// with no children. The new ID is appended after existing siblings.
    /// Sibling names are not required to be unique.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::ParentNotFound`] or [`ForgeError::ParentNotFolder`]
    /// if `parent_id` does not name a folder, and
    /// [`ForgeError::NoActiveWorkspace`] for a root create with no active
    /// workspace. Nothing is changed on error.
    pub fn create_node(
        &mut self,
        parent_id: Option<&str>,
        name: &str,
        kind: NodeKind,
        language: Option<&str>,
    ) -> Result<String> {
        match parent_id {
            Some(pid) => {
                self.require_folder(pid)?;
            }
            None => {
                self.active_workspace_index()?;
            }
        }

        let id = self.fresh_id();
        self.nodes.insert(
            id.clone(),
            FileNode {
                id: id.clone(),
                name: name.to_string(),
                parent_id: parent_id.map(str::to_string),
                body: NodeBody::empty(kind, language),
            },
        );
        self.attach(&id, parent_id)?;

        log::debug!("created {kind:?} {id} ({name})");
        Ok(id)
    }

    /// Deletes `node_id` and all of its descendants.
    ///
    /// The node is detached from its parent folder or from its workspace's
    /// roots, and the active file is cleared if it was removed. A missing
    /// `node_id` is a no-op that reports nothing removed.
    pub fn delete_node(&mut self, node_id: &str) -> DeleteResult {
        let Some(node) = self.nodes.get(node_id) else {
            log::warn!("delete_node: {node_id} not found; ignoring");
            return DeleteResult::default();
        };
        let parent_id = node.parent_id.clone();

        let removed = self.subtree_ids(node_id);
        self.remove_nodes(&removed);
        self.detach(node_id, parent_id.as_deref());

        log::debug!("deleted {node_id} ({} nodes)", removed.len());
        DeleteResult::from_removed(removed)
    }

    /// Merges `patch` into the node's name and file payload.
    ///
    /// Kind and parent cannot be changed here. A missing `node_id` is a
    /// logged no-op; content or language sent to a folder is ignored.
    pub fn update_node(&mut self, node_id: &str, patch: NodePatch) {
        let Some(node) = self.nodes.get_mut(node_id) else {
            log::warn!("update_node: {node_id} not found; ignoring");
            return;
        };
        if patch.is_empty() {
            return;
        }
        let NodePatch { name, content, language } = patch;
        if let Some(name) = name {
            node.name = name;
        }
        match &mut node.body {
            NodeBody::File { content: c, language: l } => {
                if let Some(content) = content {
                    *c = content;
                }
                if let Some(language) = language {
                    *l = language;
                }
            }
            NodeBody::Folder { .. } => {
                if content.is_some() || language.is_some() {
                    log::warn!("update_node: {node_id} is a folder; ignoring file fields");
                }
            }
        }
    }

    /// Renames a node. Duplicate sibling names are allowed.
    pub fn rename_node(&mut self, node_id: &str, new_name: &str) {
        self.update_node(node_id, NodePatch::rename(new_name));
    }

    /// Moves `node_id` (with its subtree) under `new_parent_id`, or to the
    /// roots of the active workspace when `new_parent_id` is `None`.
    ///
    /// The node is appended after the new siblings. Moving a node to the
    /// parent it already has, or moving a node that no longer exists, is a
    /// no-op. All checks run before any state changes, so on error the tree
    /// is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::CycleDetected`] if `new_parent_id` is the node
    /// itself or one of its descendants, [`ForgeError::ParentNotFound`] or
    /// [`ForgeError::ParentNotFolder`] for an invalid destination, and
    /// [`ForgeError::NoActiveWorkspace`] for a root move with no active
    /// workspace.
    pub fn move_node(&mut self, node_id: &str, new_parent_id: Option<&str>) -> Result<()> {
        let Some(node) = self.nodes.get(node_id) else {
            log::warn!("move_node: {node_id} not found; ignoring");
            return Ok(());
        };
        if node.parent_id.as_deref() == new_parent_id {
            return Ok(());
        }
        let old_parent_id = node.parent_id.clone();

        match new_parent_id {
            Some(pid) => {
                self.require_folder(pid)?;
                if self.is_self_or_ancestor(node_id, pid) {
                    return Err(ForgeError::CycleDetected(format!(
                        "{node_id} cannot be moved under its own descendant {pid}"
                    )));
                }
            }
            None => {
                self.active_workspace_index()?;
            }
        }

        self.detach(node_id, old_parent_id.as_deref());
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.parent_id = new_parent_id.map(str::to_string);
        }
        self.attach(node_id, new_parent_id)?;

        log::debug!("moved {node_id} from {old_parent_id:?} to {new_parent_id:?}");
        Ok(())
    }

    // ── integrity ────────────────────────────────────────────────

    /// Checks every tree invariant over the whole store.
    ///
    /// - every folder child exists and points back at the folder, and every
    ///   non-root node is listed by its parent;
    /// - root nodes are listed by exactly one workspace;
    /// - walking from all workspace roots reaches every node exactly once,
    ///   which rules out cycles and shared nodes.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::Integrity`] describing the first violation found.
    pub fn verify_integrity(&self) -> Result<()> {
        let fail = |msg: String| Err(ForgeError::Integrity(msg));

        for node in self.nodes.values() {
            for child_id in node.children() {
                match self.nodes.get(child_id) {
                    None => return fail(format!("{} lists missing child {child_id}", node.id)),
                    Some(child) if child.parent_id.as_deref() != Some(node.id.as_str()) => {
                        return fail(format!("{child_id} does not point back at {}", node.id));
                    }
                    Some(_) => {}
                }
            }
            match node.parent_id.as_deref() {
                Some(pid) => {
                    let listed = self
                        .nodes
                        .get(pid)
                        .is_some_and(|p| p.children().iter().any(|c| c == &node.id));
                    if !listed {
                        return fail(format!("{} is not listed by its parent {pid}", node.id));
                    }
                }
                None => {
                    let owners = self.workspaces.iter().filter(|w| w.has_root(&node.id)).count();
                    if owners != 1 {
                        return fail(format!("root {} is listed by {owners} workspaces", node.id));
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        for workspace in &self.workspaces {
            for root_id in &workspace.root_file_ids {
                match self.nodes.get(root_id) {
                    None => {
                        return fail(format!(
                            "workspace {} lists missing root {root_id}",
                            workspace.id
                        ));
                    }
                    Some(root) if root.parent_id.is_some() => {
                        return fail(format!("workspace root {root_id} has a parent"));
                    }
                    Some(_) => {}
                }
                let mut stack = vec![root_id.as_str()];
                while let Some(id) = stack.pop() {
                    if !seen.insert(id) {
                        return fail(format!("{id} is reachable more than once"));
                    }
                    if let Some(node) = self.nodes.get(id) {
                        stack.extend(node.children().iter().map(String::as_str));
                    }
                }
            }
        }
        if seen.len() != self.nodes.len() {
            return fail(format!(
                "{} nodes are unreachable from any workspace",
                self.nodes.len() - seen.len()
            ));
        }
        Ok(())
    }

    // ── internals ────────────────────────────────────────────────

    /// A node ID not present in the store.
    pub(crate) fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
    }

    pub(crate) fn insert_node(&mut self, node: FileNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Adds a fully built workspace to the registry and activates it.
    pub(crate) fn register_workspace(&mut self, workspace: Workspace) {
        self.active_workspace_id = Some(workspace.id.clone());
        self.workspaces.push(workspace);
    }

    pub(crate) fn push_child(&mut self, parent_id: &str, child_id: &str) {
        if let Some(children) = self.nodes.get_mut(parent_id).and_then(FileNode::children_mut) {
            children.push(child_id.to_string());
        }
    }

    pub(crate) fn push_root(&mut self, workspace_index: usize, node_id: &str) {
        if let Some(workspace) = self.workspaces.get_mut(workspace_index) {
            workspace.root_file_ids.push(node_id.to_string());
        }
    }

    pub(crate) fn active_workspace_index(&self) -> Result<usize> {
        let active = self
            .active_workspace_id
            .as_deref()
            .ok_or(ForgeError::NoActiveWorkspace)?;
        self.workspaces
            .iter()
            .position(|w| w.id == active)
            .ok_or(ForgeError::NoActiveWorkspace)
    }

    pub(crate) fn require_folder(&self, parent_id: &str) -> Result<&FileNode> {
        let parent = self
            .nodes
            .get(parent_id)
            .ok_or_else(|| ForgeError::ParentNotFound(parent_id.to_string()))?;
        if !parent.is_folder() {
            return Err(ForgeError::ParentNotFolder(parent.name.clone()));
        }
        Ok(parent)
    }

    /// True if `candidate` is `node_id` or lies below it, found by walking
    /// parent links up from `candidate`.
    fn is_self_or_ancestor(&self, node_id: &str, candidate: &str) -> bool {
        let mut current = Some(candidate);
        // Bounded by the store size so corrupt data cannot loop forever.
        for _ in 0..=self.nodes.len() {
            match current {
                Some(id) if id == node_id => return true,
                Some(id) => current = self.nodes.get(id).and_then(|n| n.parent_id.as_deref()),
                None => return false,
            }
        }
        true
    }

    /// Appends `node_id` to its new parent's children, or to the active
    /// workspace's roots when `parent_id` is `None`.
    fn attach(&mut self, node_id: &str, parent_id: Option<&str>) -> Result<()> {
        match parent_id {
            Some(pid) => {
                let children = self
                    .nodes
                    .get_mut(pid)
                    .and_then(FileNode::children_mut)
                    .ok_or_else(|| ForgeError::ParentNotFolder(pid.to_string()))?;
                children.push(node_id.to_string());
            }
            None => {
                let index = self.active_workspace_index()?;
                self.push_root(index, node_id);
            }
        }
        Ok(())
    }

    /// Removes `node_id` from its parent's children, or from whichever
    /// workspace lists it as a root.
    fn detach(&mut self, node_id: &str, parent_id: Option<&str>) {
        match parent_id {
            Some(pid) => {
                if let Some(children) = self.nodes.get_mut(pid).and_then(FileNode::children_mut) {
                    children.retain(|c| c != node_id);
                }
            }
            None => {
                for workspace in &mut self.workspaces {
                    workspace.root_file_ids.retain(|r| r != node_id);
                }
            }
        }
    }

    fn remove_nodes(&mut self, ids: &[String]) {
        for id in ids {
            self.nodes.remove(id);
        }
        if let Some(active) = &self.active_file_id {
            if ids.contains(active) {
                self.active_file_id = None;
            }
        }
    }
}


#[cfg(test)]
mod invariants {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Step {
        CreateWorkspace,
        SwitchWorkspace(usize),
        DeleteWorkspace(usize),
        Create { parent: Option<usize>, kind: NodeKind },
        Delete(usize),
        Move { node: usize, parent: Option<usize> },
        Rename(usize),
    }

    fn step_strategy() -> impl Strategy<Value = Step> {
        let pick = 0usize..16;
        let kind = prop_oneof![Just(NodeKind::File), Just(NodeKind::Folder)];
        prop_oneof![
            1 => Just(Step::CreateWorkspace),
            1 => pick.clone().prop_map(Step::SwitchWorkspace),
            1 => pick.clone().prop_map(Step::DeleteWorkspace),
            6 => (proptest::option::of(pick.clone()), kind)
                .prop_map(|(parent, kind)| Step::Create { parent, kind }),
            2 => pick.clone().prop_map(Step::Delete),
            4 => (pick.clone(), proptest::option::of(pick.clone()))
                .prop_map(|(node, parent)| Step::Move { node, parent }),
            1 => pick.prop_map(Step::Rename),
        ]
    }

    /// Picks an existing node by index into a sorted ID list, so runs are
    /// reproducible despite random UUIDs.
    fn nth_node(session: &Session, n: usize) -> Option<String> {
        let mut ids: Vec<&String> = session.nodes.keys().collect();
        ids.sort();
        ids.get(n % ids.len().max(1)).map(|id| (*id).clone())
    }

    fn nth_workspace(session: &Session, n: usize) -> Option<String> {
        let len = session.workspaces.len();
        (len > 0).then(|| session.workspaces[n % len].id.clone())
    }

    fn apply(session: &mut Session, step: &Step) {
        match step {
            Step::CreateWorkspace => {
                session.create_workspace("ws");
            }
            Step::SwitchWorkspace(n) => {
                if let Some(id) = nth_workspace(session, *n) {
                    session.set_active_workspace(&id).unwrap();
                }
            }
            Step::DeleteWorkspace(n) => {
                if let Some(id) = nth_workspace(session, *n) {
                    session.delete_workspace(&id);
                }
            }
            Step::Create { parent, kind } => {
                let parent = parent.and_then(|n| nth_node(session, n));
                let _ = session.create_node(parent.as_deref(), "n", *kind, None);
            }
            Step::Delete(n) => {
                if let Some(id) = nth_node(session, *n) {
                    session.delete_node(&id);
                }
            }
            Step::Move { node, parent } => {
                let Some(id) = nth_node(session, *node) else { return };
                let parent = parent.and_then(|n| nth_node(session, n));
                let before = session.clone();
                if session.move_node(&id, parent.as_deref()).is_err() {
                    assert_eq!(*session, before, "failed move must not change state");
                }
            }
            Step::Rename(n) => {
                if let Some(id) = nth_node(session, *n) {
                    session.rename_node(&id, "renamed");
                }
            }
        }
    }

    proptest! {
        #[test]
        fn tree_invariants_hold_after_any_sequence(
            steps in proptest::collection::vec(step_strategy(), 1..60)
        ) {
            let mut session = Session::new();
            for step in &steps {
                apply(&mut session, step);
                prop_assert!(session.verify_integrity().is_ok(), "after {:?}", step);
            }
            for node in session.nodes() {
                let path = session.resolve_path(&node.id).unwrap();
                prop_assert!(path.ends_with(&node.name));
            }
        }
    }
}
