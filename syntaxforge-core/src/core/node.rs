use serde::{Deserialize, Serialize};

/// Language tag given to files created without an explicit one.
pub const DEFAULT_LANGUAGE: &str = "javascript";

/// Language tags offered by the editor's language picker.
pub const LANGUAGES: &[&str] = &[
    "javascript", "typescript", "python", "java", "cpp", "csharp", "go", "rust", "ruby", "php",
    "swift", "kotlin", "dart", "html", "css", "sql", "shell", "json", "yaml", "markdown", "c",
    "lua",
];

pub(crate) fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// Whether a node is a file or a folder. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// Kind-specific payload of a node.
///
/// Keeping content and children in separate variants means a file can never
/// carry children and a folder can never carry content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeBody {
    File {
        #[serde(default)]
        content: String,
        #[serde(default = "default_language")]
        language: String,
    },
    Folder {
        /// Child ids in display order.
        #[serde(default)]
        children: Vec<String>,
    },
}

impl NodeBody {
    /// An empty body of the given kind.
    pub fn empty(kind: NodeKind, language: Option<&str>) -> Self {
        match kind {
            NodeKind::File => Self::File {
                content: String::new(),
                language: language.map_or_else(default_language, str::to_string),
            },
            NodeKind::Folder => Self::Folder { children: Vec::new() },
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::File { .. } => NodeKind::File,
            Self::Folder { .. } => NodeKind::Folder,
        }
    }
}

/// A file or folder record in the node store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub id: String,
    pub name: String,
    /// Containing folder, or `None` for a workspace root.
    pub parent_id: Option<String>,
    #[serde(flatten)]
    pub body: NodeBody,
}

impl FileNode {
    pub fn kind(&self) -> NodeKind {
        self.body.kind()
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.body, NodeBody::Folder { .. })
    }

    /// Child ids in display order; always empty for files.
    pub fn children(&self) -> &[String] {
        match &self.body {
            NodeBody::Folder { children } => children,
            NodeBody::File { .. } => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<String>> {
        match &mut self.body {
            NodeBody::Folder { children } => Some(children),
            NodeBody::File { .. } => None,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match &self.body {
            NodeBody::File { content, .. } => Some(content),
            NodeBody::Folder { .. } => None,
        }
    }

    pub fn language(&self) -> Option<&str> {
        match &self.body {
            NodeBody::File { language, .. } => Some(language),
            NodeBody::Folder { .. } => None,
        }
    }
}

/// A partial update merged into an existing node by
/// [`Session::update_node`](super::session::Session::update_node).
///
/// Only the name and the file payload can change this way; kind and parent
/// are changed by dedicated operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl NodePatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), ..Self::default() }
    }

    pub fn language(language: impl Into<String>) -> Self {
        Self { language: Some(language.into()), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.content.is_none() && self.language.is_none()
    }
}

/// Guesses a language tag from a file name's extension.
///
/// Returns `None` when the extension is missing or not one of [`LANGUAGES`].
pub fn language_for_filename(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    let lang = match ext.to_ascii_lowercase().as_str() {
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" => "python",
        "java" => "java",
        "cpp" | "cc" | "cxx" | "hpp" => "cpp",
        "cs" => "csharp",
        "go" => "go",
        "rs" => "rust",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "dart" => "dart",
        "html" | "htm" => "html",
        "css" => "css",
        "sql" => "sql",
        "sh" | "bash" | "zsh" => "shell",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "md" | "markdown" => "markdown",
        "c" | "h" => "c",
        "lua" => "lua",
        _ => return None,
    };
    Some(lang)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_node_serializes_flat() {
        let node = FileNode {
            id: "n1".to_string(),
            name: "index.js".to_string(),
            parent_id: None,
            body: NodeBody::File {
                content: "x=1".to_string(),
                language: "javascript".to_string(),
            },
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["parentId"], serde_json::Value::Null);
        assert_eq!(json["content"], "x=1");
        assert!(json.get("children").is_none());
    }

    #[test]
    fn test_folder_without_children_field_defaults_to_empty() {
        let node: FileNode =
            serde_json::from_str(r#"{"id":"f","name":"src","type":"folder","parentId":null}"#)
                .unwrap();
        assert!(node.is_folder());
        assert!(node.children().is_empty());
        assert_eq!(node.content(), None);
    }

    #[test]
    fn test_file_without_language_gets_default() {
        let node: FileNode = serde_json::from_str(
            r#"{"id":"a","name":"a.txt","type":"file","parentId":"f","content":"hi"}"#,
        )
        .unwrap();
        assert_eq!(node.language(), Some(DEFAULT_LANGUAGE));
        assert_eq!(node.parent_id.as_deref(), Some("f"));
    }

    #[test]
    fn test_empty_body_respects_kind() {
        assert_eq!(NodeBody::empty(NodeKind::Folder, Some("rust")).kind(), NodeKind::Folder);
        match NodeBody::empty(NodeKind::File, Some("rust")) {
            NodeBody::File { language, content } => {
                assert_eq!(language, "rust");
                assert!(content.is_empty());
            }
            NodeBody::Folder { .. } => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_patch_emptiness() {
        assert!(NodePatch::default().is_empty());
        assert!(!NodePatch::rename("x").is_empty());
        assert!(!NodePatch::language("go").is_empty());
    }

    #[test]
    fn test_language_for_filename() {
        assert_eq!(language_for_filename("main.RS"), Some("rust"));
        assert_eq!(language_for_filename("app.tsx"), Some("typescript"));
        assert_eq!(language_for_filename("Makefile"), None);
        assert_eq!(language_for_filename("notes.xyz"), None);
        for lang in ["javascript", "rust", "shell", "markdown"] {
            assert!(LANGUAGES.contains(&lang));
        }
    }
}
