//! Subcommand definitions and their execution against a loaded session.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use clap::Subcommand;
use syntaxforge_core::{
    language_for_filename, split_path, AiResponse, ExportFile, ForgeError, NodeKind, NodePatch,
    OperationStatus, Session, Storage, LANGUAGES,
};

use crate::import_files::import_files;
use crate::settings::{load_settings_from, save_settings_to, AppSettings};

/// Settings in effect for one invocation.
pub struct Context {
    /// Effective settings, including any command-line overrides.
    pub settings: AppSettings,
    /// Where `config set` writes.
    pub settings_path: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create, list, select, and delete workspaces.
    #[command(subcommand)]
    Workspace(WorkspaceCommand),
    /// Edit files and folders in the active workspace.
    #[command(subcommand)]
    Node(NodeCommand),
    /// Write a node or workspace out to disk.
    #[command(subcommand)]
    Export(ExportCommand),
    /// Bring exported documents or plain files into the active workspace.
    #[command(subcommand)]
    Import(ImportCommand),
    /// Exchange data with the AI assistant.
    #[command(subcommand)]
    Ai(AiCommand),
    /// Show or change saved settings.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum WorkspaceCommand {
    /// Create an empty workspace.
    New { name: String },
    /// List workspaces; the active one is marked with `*`.
    List,
    /// Make a workspace active, by name or ID.
    Use { workspace: String },
    /// Delete a workspace and all of its files, by name or ID.
    Delete { workspace: String },
}

#[derive(Debug, Subcommand)]
pub enum NodeCommand {
    /// Create an empty file; the parent folder must already exist.
    AddFile {
        path: String,
        /// Language tag; guessed from the extension when omitted.
        #[arg(long)]
        language: Option<String>,
    },
    /// Create an empty folder; the parent folder must already exist.
    AddFolder { path: String },
    /// Replace a file's content from `--content`, `--from`, or stdin.
    Write {
        path: String,
        #[arg(long, conflicts_with = "from")]
        content: Option<String>,
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,
        #[arg(long)]
        language: Option<String>,
    },
    /// Print a file's content.
    Cat { path: String },
    /// Rename a file or folder in place.
    Rename { path: String, new_name: String },
    /// Move a node into a folder, or to the root level when no destination is given.
    Move {
        path: String,
        #[arg(default_value = "")]
        destination: String,
    },
    /// Delete a file, or a folder with everything in it.
    Delete { path: String },
    /// Print the path of a node given its ID.
    Path { id: String },
    /// Print the active workspace as an indented tree.
    Tree,
}

#[derive(Debug, Subcommand)]
pub enum ExportCommand {
    /// Export one node: a file as its raw content, a folder as JSON.
    Node {
        path: String,
        #[arg(long, default_value = ".", value_name = "DIR")]
        out: PathBuf,
    },
    /// Export a whole workspace (the active one by default) as JSON.
    Workspace {
        #[arg(long)]
        workspace: Option<String>,
        #[arg(long, default_value = ".", value_name = "DIR")]
        out: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum ImportCommand {
    /// Import a workspace export as a new, active workspace.
    Workspace { file: PathBuf },
    /// Import a folder export into the active workspace.
    Node {
        file: PathBuf,
        #[arg(long, value_name = "FOLDER")]
        into: Option<String>,
    },
    /// Add files from disk to the active workspace.
    Files {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long, value_name = "FOLDER")]
        into: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum AiCommand {
    /// Print the active workspace as AI context JSON.
    Context,
    /// Apply the operations of a saved AI response.
    Apply { response: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective settings.
    Show,
    /// Change saved settings.
    Set {
        #[arg(long, value_name = "DIR")]
        data_directory: Option<String>,
        #[arg(long)]
        default_language: Option<String>,
    },
}

/// Runs one command: loads the session, executes, and saves the snapshot if
/// the command changed anything.
pub fn run(command: Command, ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    if let Command::Config(cmd) = command {
        return run_config(cmd, ctx, out);
    }

    fs::create_dir_all(&ctx.settings.data_directory).with_context(|| {
        format!("Failed to create data directory {}", ctx.settings.data_directory)
    })?;
    let storage = Storage::open(ctx.settings.database_path())?;
    let mut session = storage.load_session()?;

    if execute(command, &mut session, &ctx.settings, out)? {
        storage.save_session(&session)?;
    }
    Ok(())
}

/// Executes a session command. Returns whether the session was changed.
pub fn execute(
    command: Command,
    session: &mut Session,
    settings: &AppSettings,
    out: &mut dyn Write,
) -> anyhow::Result<bool> {
    match command {
        Command::Workspace(cmd) => workspace(cmd, session, out),
        Command::Node(cmd) => node(cmd, session, settings, out),
        Command::Export(cmd) => export(cmd, session, out).map(|()| false),
        Command::Import(cmd) => import(cmd, session, settings, out),
        Command::Ai(cmd) => ai(cmd, session, out),
        Command::Config(_) => bail!("config commands do not operate on a session"),
    }
}

fn workspace(
    cmd: WorkspaceCommand,
    session: &mut Session,
    out: &mut dyn Write,
) -> anyhow::Result<bool> {
    match cmd {
        WorkspaceCommand::New { name } => {
            let id = session.create_workspace(&name);
            writeln!(out, "Created workspace {name} ({id})")?;
        }
        WorkspaceCommand::List => {
            let active = session.active_workspace_id();
            for w in session.workspaces() {
                let marker = if Some(w.id.as_str()) == active { "*" } else { " " };
                writeln!(out, "{marker} {}\t{}\t{} roots", w.name, w.id, w.root_file_ids.len())?;
            }
            return Ok(false);
        }
        WorkspaceCommand::Use { workspace } => {
            let id = find_workspace(session, &workspace)?;
            session.set_active_workspace(&id)?;
            writeln!(out, "Active workspace: {workspace}")?;
        }
        WorkspaceCommand::Delete { workspace } => {
            let id = find_workspace(session, &workspace)?;
            let result = session.delete_workspace(&id);
            writeln!(out, "Deleted workspace {workspace} ({} nodes)", result.deleted_count)?;
        }
    }
    Ok(true)
}

fn node(
    cmd: NodeCommand,
    session: &mut Session,
    settings: &AppSettings,
    out: &mut dyn Write,
) -> anyhow::Result<bool> {
    match cmd {
        NodeCommand::AddFile { path, language } => {
            let (parent_path, name) = split_path(&path);
            let parent = session.resolve_target(parent_path)?;
            let language = language
                .as_deref()
                .or_else(|| language_for_filename(name))
                .unwrap_or(&settings.default_language);
            warn_unknown_language(language, out)?;
            let id = session.create_node(parent.as_parent(), name, NodeKind::File, Some(language))?;
            writeln!(out, "{id}")?;
        }
        NodeCommand::AddFolder { path } => {
            let (parent_path, name) = split_path(&path);
            let parent = session.resolve_target(parent_path)?;
            let id = session.create_node(parent.as_parent(), name, NodeKind::Folder, None)?;
            writeln!(out, "{id}")?;
        }
        NodeCommand::Write { path, content, from, language } => {
            if let Some(language) = &language {
                warn_unknown_language(language, out)?;
            }
            let id = session.find_by_path(&path)?;
            if session.get_node(&id)?.is_folder() {
                return Err(ForgeError::NotAFile(path).into());
            }
            let content = match (content, from) {
                (Some(content), _) => content,
                (None, Some(file)) => read_text(&file)?,
                (None, None) => {
                    std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
                }
            };
            session.update_node(&id, NodePatch { name: None, content: Some(content), language });
        }
        NodeCommand::Cat { path } => {
            let id = session.find_by_path(&path)?;
            match session.get_node(&id)?.content() {
                Some(content) => write!(out, "{content}")?,
                None => return Err(ForgeError::NotAFile(path).into()),
            }
            return Ok(false);
        }
        NodeCommand::Rename { path, new_name } => {
            let id = session.find_by_path(&path)?;
            session.rename_node(&id, &new_name);
        }
        NodeCommand::Move { path, destination } => {
            let id = session.find_by_path(&path)?;
            let target = session.resolve_target(&destination)?;
            session.move_node(&id, target.as_parent())?;
        }
        NodeCommand::Delete { path } => {
            let id = session.find_by_path(&path)?;
            let result = session.delete_node(&id);
            writeln!(out, "Deleted {path} ({} nodes)", result.deleted_count)?;
        }
        NodeCommand::Path { id } => {
            writeln!(out, "{}", session.resolve_path(&id)?)?;
            return Ok(false);
        }
        NodeCommand::Tree => {
            write_tree(session, out)?;
            return Ok(false);
        }
    }
    Ok(true)
}

fn export(cmd: ExportCommand, session: &Session, out: &mut dyn Write) -> anyhow::Result<()> {
    let (file, dir) = match cmd {
        ExportCommand::Node { path, out: dir } => {
            let id = session.find_by_path(&path)?;
            (session.export_node_file(&id)?, dir)
        }
        ExportCommand::Workspace { workspace, out: dir } => {
            let id = match workspace {
                Some(key) => find_workspace(session, &key)?,
                None => session
                    .active_workspace_id()
                    .ok_or(ForgeError::NoActiveWorkspace)?
                    .to_string(),
            };
            (session.export_workspace_file(&id)?, dir)
        }
    };
    let written = write_export(&file, &dir)?;
    writeln!(out, "Exported {}", written.display())?;
    Ok(())
}

fn import(
    cmd: ImportCommand,
    session: &mut Session,
    settings: &AppSettings,
    out: &mut dyn Write,
) -> anyhow::Result<bool> {
    match cmd {
        ImportCommand::Workspace { file } => {
            let id = session.import_workspace(&read_text(&file)?)?;
            writeln!(out, "Imported workspace {id}")?;
            Ok(true)
        }
        ImportCommand::Node { file, into } => {
            let parent = session.resolve_target(into.as_deref().unwrap_or(""))?;
            let id = session.import_subtree(&read_text(&file)?, parent.as_parent())?;
            writeln!(out, "Imported {}", session.resolve_path(&id)?)?;
            Ok(true)
        }
        ImportCommand::Files { paths, into } => {
            let parent = session.resolve_target(into.as_deref().unwrap_or(""))?;
            let parent = parent.as_parent().map(str::to_string);
            let summary =
                import_files(session, &paths, parent.as_deref(), &settings.default_language)?;
            for (path, reason) in &summary.failed {
                writeln!(out, "Skipped {}: {reason}", path.display())?;
            }
            writeln!(out, "Imported {} files", summary.created.len())?;
            Ok(!summary.created.is_empty())
        }
    }
}

fn ai(cmd: AiCommand, session: &mut Session, out: &mut dyn Write) -> anyhow::Result<bool> {
    match cmd {
        AiCommand::Context => {
            let context = session.workspace_context()?;
            writeln!(out, "{}", serde_json::to_string_pretty(&context)?)?;
            Ok(false)
        }
        AiCommand::Apply { response } => {
            let response = AiResponse::from_json(&read_text(&response)?)?;
            let report = session.apply_response(&response)?;
            for outcome in &report.outcomes {
                match &outcome.status {
                    OperationStatus::Applied => {
                        writeln!(out, "applied  {} {}", outcome.operation, outcome.path)?;
                    }
                    OperationStatus::Skipped { reason } => {
                        writeln!(out, "skipped  {} {}: {reason}", outcome.operation, outcome.path)?;
                    }
                }
            }
            if !response.explanation.is_empty() {
                writeln!(out, "{}", response.explanation)?;
            }
            Ok(report.applied_count() > 0)
        }
    }
}

fn run_config(cmd: ConfigCommand, ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show => {
            writeln!(out, "{}", serde_json::to_string_pretty(&ctx.settings)?)?;
        }
        ConfigCommand::Set { data_directory, default_language } => {
            // Start from the saved file so command-line overrides are not persisted.
            let mut saved = load_settings_from(&ctx.settings_path);
            if let Some(dir) = data_directory {
                saved.data_directory = dir;
            }
            if let Some(language) = default_language {
                saved.default_language = language;
            }
            save_settings_to(&ctx.settings_path, &saved)?;
            writeln!(out, "Saved {}", ctx.settings_path.display())?;
        }
    }
    Ok(())
}

/// Language tags outside the editor's picker are accepted, with a notice.
fn warn_unknown_language(language: &str, out: &mut dyn Write) -> std::io::Result<()> {
    if !LANGUAGES.contains(&language) {
        writeln!(out, "note: '{language}' is not a known language; saving it as given")?;
    }
    Ok(())
}

/// Looks a workspace up by exact ID, then by name.
fn find_workspace(session: &Session, key: &str) -> anyhow::Result<String> {
    session
        .workspace(key)
        .or_else(|| session.workspaces().iter().find(|w| w.name == key))
        .map(|w| w.id.clone())
        .ok_or_else(|| ForgeError::WorkspaceNotFound(key.to_string()).into())
}

fn write_tree(session: &Session, out: &mut dyn Write) -> anyhow::Result<()> {
    let workspace = session.active_workspace().ok_or(ForgeError::NoActiveWorkspace)?;
    writeln!(out, "{}", workspace.name)?;
    for root_id in &workspace.root_file_ids {
        write_subtree(session, root_id, 1, out)?;
    }
    Ok(())
}

fn write_subtree(
    session: &Session,
    id: &str,
    depth: usize,
    out: &mut dyn Write,
) -> std::io::Result<()> {
    let Some(node) = session.node(id) else {
        return Ok(());
    };
    let suffix = if node.is_folder() { "/" } else { "" };
    writeln!(out, "{}{}{suffix}", "  ".repeat(depth), node.name)?;
    for child_id in node.children() {
        write_subtree(session, child_id, depth + 1, out)?;
    }
    Ok(())
}

fn write_export(file: &ExportFile, dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(&file.filename);
    fs::write(&path, &file.contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
