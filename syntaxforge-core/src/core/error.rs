//! Error types for the SyntaxForge core library.

use thiserror::Error;

/// All errors that can occur within the SyntaxForge core library.
///
/// Operations against a stale node id (delete, update, rename, and move of a
/// node that no longer exists) are not errors; they degrade to logged no-ops.
/// The variants below cover structural violations, which always fail before
/// any state is touched.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// The requested parent node does not exist.
    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    /// The requested parent exists but is a file, so it cannot hold children.
    #[error("Parent is not a folder: {0}")]
    ParentNotFolder(String),

    /// A root-level operation was requested while no workspace is active.
    #[error("No active workspace")]
    NoActiveWorkspace,

    /// A node ID or path was requested that does not exist.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A content update targeted a folder.
    #[error("Not a file: {0}")]
    NotAFile(String),

    /// A workspace ID was requested that is not registered.
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    /// A move would make a node its own ancestor.
    #[error("Move would create a cycle: {0}")]
    CycleDetected(String),

    /// An import document is missing required fields or has mismatched types.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// The stored node graph violates one of the tree invariants.
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// A SQLite operation on the snapshot store failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// State could not be serialized to JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`ForgeError`].
pub type Result<T> = std::result::Result<T, ForgeError>;

impl ForgeError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ParentNotFound(_) => "The target folder no longer exists".to_string(),
            Self::ParentNotFolder(name) => format!("'{name}' is a file, not a folder"),
            Self::NoActiveWorkspace => "Create or select a workspace first".to_string(),
            Self::NodeNotFound(_) => "File no longer exists".to_string(),
            Self::NotAFile(path) => format!("'{path}' is a folder, not a file"),
            Self::WorkspaceNotFound(_) => "Workspace no longer exists".to_string(),
            Self::CycleDetected(_) => "A folder cannot be moved into itself".to_string(),
            Self::MalformedDocument(e) => format!("Could not import file: {e}"),
            Self::Integrity(e) => format!("Workspace data is inconsistent: {e}"),
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }
}
