//! Core library for SyntaxForge, a browser-style code editor's workspace tree.
//!
//! The primary entry point is [`Session`], which owns every file and folder
//! node together with the registry of [`Workspace`]s. All tree mutations go
//! through `Session` methods so that parent links, folder child lists, and
//! workspace root lists never drift apart.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use self::core::{
    delete::DeleteResult,
    error::{ForgeError, Result},
    export::{ExportFile, NodeDocument, WorkspaceDocument, WorkspaceMeta},
    node::{
        language_for_filename, FileNode, NodeBody, NodeKind, NodePatch, DEFAULT_LANGUAGE,
        LANGUAGES,
    },
    operation::{
        AiResponse, ApplyReport, ContextEntry, FileOperation, OperationOutcome, OperationStatus,
    },
    path::{normalize_path, split_path, PathTarget},
    session::Session,
    storage::{Storage, STORAGE_KEY},
    workspace::Workspace,
};
