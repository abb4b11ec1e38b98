//! Core Data Structures
//!
//! Types for command classification, intent parsing and the response envelope
//! handed back to front ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntentId(pub Uuid);

impl IntentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IntentId {
    fn default() -> Self {
        Self::new()
    }
}

/// User intent parsed from an utterance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub id: IntentId,
    pub command: Command,
    pub confidence: f32, // 0.0 - 1.0
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Intent {
    pub fn new(command: Command, confidence: f32) -> Self {
        Self {
            id: IntentId::new(),
            command,
            confidence: confidence.clamp(0.0, 1.0),
            timestamp: Utc::now(),
        }
    }

    /// Unrecognised input, routed to the chat fallback
    pub fn unknown() -> Self {
        Self::new(Command::Unknown, 0.0)
    }
}

/// Parsed command, one variant per intent tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Command {
    CreateFile {
        path: String,
        content: String,
        kind: Option<FileKind>,
    },
    WriteFile {
        path: String,
        content: String,
    },
    AppendFile {
        path: String,
        content: String,
    },
    OpenFile {
        target: FileTarget,
    },
    SearchFile {
        query: String,
        domain: Option<FileDomain>,
    },
    ListDirectory {
        path: String,
    },
    MovePath {
        source: String,
        destination: String,
    },
    CopyPath {
        source: String,
        destination: String,
    },
    DeletePath {
        path: String,
    },
    ReadFile {
        path: String,
    },
    OpenApp {
        app: String,
    },
    CloseApp {
        app: String,
    },
    OpenWeb {
        target: WebTarget,
    },
    SearchWeb {
        query: String,
    },
    /// Ask the model for text and insert it into a document
    GenerateAppendText {
        topic: String,
        path: String,
        cell: Option<String>,
    },
    /// Question or small talk for the model
    Chat {
        prompt: String,
    },
    OpenBrowser,
    RefreshApps,
    SwitchModel {
        model: String,
    },
    DesktopPath,
    DesktopListing,
    /// Pronoun or ordinal follow-up on the last result set
    ContextReference {
        reference: Reference,
    },
    ResetContext,
    /// Ambiguous - needs clarification
    Ambiguous {
        possibilities: Vec<Command>,
        question: String,
    },
    Unknown,
}

impl Command {
    /// Stable snake_case tag, as used in logs and JSON output
    pub fn tag(&self) -> &'static str {
        match self {
            Command::CreateFile { .. } => "create_file",
            Command::WriteFile { .. } => "write_file",
            Command::AppendFile { .. } => "append_file",
            Command::OpenFile { .. } => "open_file",
            Command::SearchFile { .. } => "search_file",
            Command::ListDirectory { .. } => "list_directory",
            Command::MovePath { .. } => "move_path",
            Command::CopyPath { .. } => "copy_path",
            Command::DeletePath { .. } => "delete_path",
            Command::ReadFile { .. } => "read_file",
            Command::OpenApp { .. } => "open_app",
            Command::CloseApp { .. } => "close_app",
            Command::OpenWeb { .. } => "open_web",
            Command::SearchWeb { .. } => "search_web",
            Command::GenerateAppendText { .. } => "generate_append_text",
            Command::Chat { .. } => "chat",
            Command::OpenBrowser => "open_browser",
            Command::RefreshApps => "refresh_apps",
            Command::SwitchModel { .. } => "switch_model",
            Command::DesktopPath => "desktop_path",
            Command::DesktopListing => "desktop_listing",
            Command::ContextReference { .. } => "context_reference",
            Command::ResetContext => "reset_context",
            Command::Ambiguous { .. } => "ambiguous",
            Command::Unknown => "unknown",
        }
    }
}

/// What an `open_file` intent points at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum FileTarget {
    /// Explicit path typed by the user
    Path { path: String },
    /// Search terms; the best local match gets opened
    Query {
        query: String,
        domain: Option<FileDomain>,
    },
}

/// What an `open_web` intent points at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum WebTarget {
    Url { url: String },
    Query { query: String },
}

/// Follow-up reference into the stored result list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reference {
    /// "его", "её", "их": always the first result
    Pronoun,
    /// Zero-based index from an ordinal word
    Ordinal(usize),
    /// "последний"
    Last,
    /// One-based number typed by the user
    Number(usize),
}

/// Category of file searched by the file scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileDomain {
    Documents,
    Images,
    Audio,
    Video,
    Archives,
}

impl FileDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileDomain::Documents => "documents",
            FileDomain::Images => "images",
            FileDomain::Audio => "audio",
            FileDomain::Video => "video",
            FileDomain::Archives => "archives",
        }
    }
}

/// Target file format resolved from keywords or the path extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Text,
    Markdown,
    Csv,
    Json,
    Word,
    Excel,
    PowerPoint,
    Pdf,
}

impl FileKind {
    /// Canonical extension, including the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Text => ".txt",
            FileKind::Markdown => ".md",
            FileKind::Csv => ".csv",
            FileKind::Json => ".json",
            FileKind::Word => ".docx",
            FileKind::Excel => ".xlsx",
            FileKind::PowerPoint => ".pptx",
            FileKind::Pdf => ".pdf",
        }
    }

    /// Recognise an extension such as `.DOCX` or `doc`
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        match ext.as_str() {
            "txt" | "text" | "log" => Some(FileKind::Text),
            "md" | "markdown" => Some(FileKind::Markdown),
            "csv" => Some(FileKind::Csv),
            "json" => Some(FileKind::Json),
            "doc" | "docx" | "rtf" => Some(FileKind::Word),
            "xls" | "xlsx" => Some(FileKind::Excel),
            "ppt" | "pptx" => Some(FileKind::PowerPoint),
            "pdf" => Some(FileKind::Pdf),
            _ => None,
        }
    }

    /// Formats the default file tools can write without a document codec
    pub fn is_plain_text(&self) -> bool {
        matches!(
            self,
            FileKind::Text | FileKind::Markdown | FileKind::Csv | FileKind::Json
        )
    }
}

/// Kind of the result set remembered between turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    #[default]
    None,
    File,
    App,
    Web,
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResultKind::None => "none",
            ResultKind::File => "file",
            ResultKind::App => "app",
            ResultKind::Web => "web",
        };
        f.write_str(name)
    }
}

/// Parse result from the intent engine
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub intent: Intent,
    pub alternatives: Vec<Intent>,
    pub needs_clarification: bool,
}

impl ParseResult {
    pub fn single(intent: Intent) -> Self {
        Self {
            intent,
            alternatives: vec![],
            needs_clarification: false,
        }
    }
}

/// Uniform reply for every processed turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub reply: String,
    pub ok: bool,
    pub requires_confirmation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl ResponseEnvelope {
    pub fn success(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            ok: true,
            requires_confirmation: false,
            items: None,
            data: None,
        }
    }

    pub fn failure(reply: impl Into<String>) -> Self {
        Self {
            ok: false,
            ..Self::success(reply)
        }
    }

    /// Operation is parked until the user answers yes or no
    pub fn confirmation(reply: impl Into<String>) -> Self {
        Self {
            ok: false,
            requires_confirmation: true,
            ..Self::success(reply)
        }
    }

    pub fn with_items(mut self, items: Vec<String>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_data(mut self, key: &str, value: Value) -> Self {
        self.data
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value);
        self
    }
}
