//! Workspace records held by the session's registry.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named forest of trees living in the node store.
///
/// A workspace references its root nodes by id; it does not own their
/// lifetime. Deleting a workspace walks from these roots to release every
/// descendant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    /// Root node ids in display order.
    #[serde(default)]
    pub root_file_ids: Vec<String>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl Workspace {
    /// Creates an empty workspace with a fresh id, stamped with the current time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            root_file_ids: Vec::new(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn has_root(&self, node_id: &str) -> bool {
        self.root_file_ids.iter().any(|id| id == node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_workspace_is_empty() {
        let ws = Workspace::new("W");
        assert_eq!(ws.name, "W");
        assert!(ws.root_file_ids.is_empty());
        assert!(ws.created_at > 0);
        assert_ne!(ws.id, Workspace::new("W").id);
    }

    #[test]
    fn test_workspace_serializes_camel_case() {
        let mut ws = Workspace::new("W");
        ws.root_file_ids.push("r1".to_string());
        let json = serde_json::to_string(&ws).unwrap();
        assert!(json.contains("\"rootFileIds\":[\"r1\"]"));
        assert!(json.contains("\"createdAt\""));
        assert!(ws.has_root("r1"));
    }
}
