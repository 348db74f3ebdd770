//! Bulk import of files from disk into the active workspace.
//!
//! Files are read concurrently and each one becomes a node as soon as its
//! read completes, so nodes appear in completion order rather than argument
//! order. Unreadable files are reported and skipped.

use std::path::{Path, PathBuf};

use anyhow::Context;
use syntaxforge_core::{language_for_filename, NodeKind, NodePatch, Session};
use tokio::task::JoinSet;

/// Result of a bulk import.
#[derive(Debug, Default)]
pub struct ImportSummary {
    /// IDs of the created file nodes, in creation order.
    pub created: Vec<String>,
    /// Files that could not be read or added, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

/// Reads every file in `paths` and adds it under `parent_id`, or at the
/// active workspace's root level when `parent_id` is `None`.
///
/// The language is guessed from each file's extension, falling back to
/// `default_language`.
pub fn import_files(
    session: &mut Session,
    paths: &[PathBuf],
    parent_id: Option<&str>,
    default_language: &str,
) -> anyhow::Result<ImportSummary> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start import runtime")?;

    runtime.block_on(async {
        let mut reads = JoinSet::new();
        for path in paths {
            let path = path.clone();
            reads.spawn(async move {
                let content = tokio::fs::read_to_string(&path).await;
                (path, content)
            });
        }

        let mut summary = ImportSummary::default();
        while let Some(joined) = reads.join_next().await {
            let (path, content) = joined.context("File read task panicked")?;
            let content = match content {
                Ok(content) => content,
                Err(e) => {
                    log::warn!("skipping {}: {e}", path.display());
                    summary.failed.push((path, e.to_string()));
                    continue;
                }
            };
            let name = file_name(&path);
            let language = language_for_filename(&name).unwrap_or(default_language);
            match session.create_node(parent_id, &name, NodeKind::File, Some(language)) {
                Ok(id) => {
                    session.update_node(&id, NodePatch::content(content));
                    log::info!("imported {} as {name}", path.display());
                    summary.created.push(id);
                }
                Err(e) => {
                    log::warn!("could not add {}: {e}", path.display());
                    summary.failed.push((path, e.user_message()));
                }
            }
        }
        Ok::<_, anyhow::Error>(summary)
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_imports_files_with_content_and_language() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.py");
        let b = dir.path().join("notes.txt");
        fs::write(&a, "print('a')").unwrap();
        fs::write(&b, "hello").unwrap();

        let mut session = Session::new();
        session.create_workspace("W");
        let src = session.create_node(None, "src", NodeKind::Folder, None).unwrap();

        let summary = import_files(&mut session, &[a, b], Some(&src), "rust").unwrap();
        assert_eq!(summary.created.len(), 2);
        assert!(summary.failed.is_empty());

        let py = session.find_by_path("src/a.py").unwrap();
        let py = session.get_node(&py).unwrap();
        assert_eq!(py.content(), Some("print('a')"));
        assert_eq!(py.language(), Some("python"));
        let txt = session.find_by_path("src/notes.txt").unwrap();
        assert_eq!(session.get_node(&txt).unwrap().language(), Some("rust"));
        session.verify_integrity().unwrap();
    }

    #[test]
    fn test_missing_file_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("ok.js");
        fs::write(&good, "1").unwrap();
        let missing = dir.path().join("missing.js");

        let mut session = Session::new();
        session.create_workspace("W");
        let summary =
            import_files(&mut session, &[missing.clone(), good], None, "javascript").unwrap();
        assert_eq!(summary.created.len(), 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, missing);
        assert!(session.find_by_path("ok.js").is_ok());
    }

    #[test]
    fn test_without_workspace_every_file_fails() {
        let dir = TempDir::new().unwrap();
        let f = dir.path().join("a.js");
        fs::write(&f, "1").unwrap();

        let mut session = Session::new();
        let summary = import_files(&mut session, &[f], None, "javascript").unwrap();
        assert!(summary.created.is_empty());
        assert_eq!(summary.failed.len(), 1);
    }
}
