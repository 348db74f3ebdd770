//! Internal domain modules for the SyntaxForge core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod delete;
pub mod error;
pub mod export;
pub mod node;
pub mod operation;
pub mod path;
pub mod session;
pub mod storage;
pub mod workspace;

#[doc(inline)]
pub use delete::DeleteResult;
#[doc(inline)]
pub use error::{ForgeError, Result};
#[doc(inline)]
pub use export::{ExportFile, NodeDocument, WorkspaceDocument, WorkspaceMeta};
#[doc(inline)]
pub use node::{
    language_for_filename, FileNode, NodeBody, NodeKind, NodePatch, DEFAULT_LANGUAGE, LANGUAGES,
};
#[doc(inline)]
pub use operation::{
    AiResponse, ApplyReport, ContextEntry, FileOperation, OperationOutcome, OperationStatus,
};
#[doc(inline)]
pub use path::{normalize_path, split_path, PathTarget};
#[doc(inline)]
pub use session::Session;
#[doc(inline)]
pub use storage::{Storage, STORAGE_KEY};
#[doc(inline)]
pub use workspace::Workspace;
