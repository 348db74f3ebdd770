//! Result type for cascading node and workspace removal.
//!
//! Deleting a node always removes its whole subtree. The returned
//! [`DeleteResult`] tells the front-end which ids vanished so it can drop
//! open editor tabs and selection state pointing at them.
//!
//! `DeleteResult` fields serialize in camelCase (`deletedCount`,
//! `removedIds`), consistent with every other type that crosses into the
//! front-end.
//!
//! ## Examples
//!
//! ```rust
//! use syntaxforge_core::DeleteResult;
//!
//! let result = DeleteResult {
//!     deleted_count: 2,
//!     removed_ids: vec!["a".to_string(), "b".to_string()],
//! };
//! let json = serde_json::to_string(&result).unwrap();
//! assert!(json.contains("deletedCount"));
//! assert!(json.contains("removedIds"));
//! ```

use serde::{Deserialize, Serialize};

/// The outcome of a delete performed on a [`Session`](super::session::Session).
///
/// A delete against an id that no longer exists is a no-op and reports a
/// count of zero.
///
/// # Examples
///
/// ```rust
/// use syntaxforge_core::DeleteResult;
///
/// let nothing = DeleteResult::default();
/// assert!(nothing.is_noop());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// The total number of nodes removed from the store.
    pub deleted_count: usize,

    /// IDs of every removed node, the deleted node first, descendants depth-first.
    pub removed_ids: Vec<String>,
}

impl DeleteResult {
    pub(crate) fn from_removed(removed_ids: Vec<String>) -> Self {
        Self { deleted_count: removed_ids.len(), removed_ids }
    }

    /// True when nothing was removed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.deleted_count == 0
    }
}
