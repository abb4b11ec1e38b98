//! Session state and the confirmation gate
//!
//! A file operation that needs confirmation is parked as a typed
//! [`FileOperation`]; replaying it with `confirmed = true` completes it.

use crate::config::Vocabulary;
use crate::tools::{FileOps, FileReport, ToolError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-conversation flags
#[derive(Debug, Clone)]
pub struct Session {
    /// Run out-of-allow-list operations without asking
    pub auto_confirm: bool,
    /// Model used for chat and text generation
    pub model: String,
    pub pending: Option<PendingAction>,
}

impl Session {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            auto_confirm: false,
            model: model.into(),
            pending: None,
        }
    }

    pub fn with_auto_confirm(mut self, auto_confirm: bool) -> Self {
        self.auto_confirm = auto_confirm;
        self
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new("llama3.1:8b")
    }
}

/// Operation waiting for a yes/no answer
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    /// "удаление: C:\..." shown in prompts and on cancel
    pub description: String,
    pub operation: FileOperation,
}

/// Replayable file operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FileOperation {
    Create { path: String, content: String },
    Write { path: String, content: String },
    Append { path: String, content: String },
    Insert {
        path: String,
        text: String,
        cell: Option<String>,
    },
    Move { source: String, destination: String },
    Copy { source: String, destination: String },
    Delete { path: String },
    List { path: String },
    Read { path: String },
}

/// Result of a file operation
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Report(FileReport),
    Listing { path: PathBuf, items: Vec<String> },
    Content { path: PathBuf, text: String },
}

impl FileOperation {
    /// Russian action name used in confirmation prompts
    pub fn action(&self) -> &'static str {
        match self {
            FileOperation::Create { .. } => "создание файла",
            FileOperation::Write { .. } => "запись файла",
            FileOperation::Append { .. } => "добавление в файл",
            FileOperation::Insert { .. } => "вставка текста",
            FileOperation::Move { .. } => "перемещение",
            FileOperation::Copy { .. } => "копирование",
            FileOperation::Delete { .. } => "удаление",
            FileOperation::List { .. } => "просмотр каталога",
            FileOperation::Read { .. } => "чтение файла",
        }
    }

    pub fn run(&self, files: &dyn FileOps, confirmed: bool) -> Result<FileOutcome, ToolError> {
        let outcome = match self {
            FileOperation::Create { path, content } => {
                FileOutcome::Report(files.create(path, content, confirmed)?)
            }
            FileOperation::Write { path, content } => {
                FileOutcome::Report(files.write(path, content, confirmed)?)
            }
            FileOperation::Append { path, content } => {
                FileOutcome::Report(files.append(path, content, confirmed)?)
            }
            FileOperation::Insert { path, text, cell } => {
                FileOutcome::Report(files.insert(path, text, cell.as_deref(), confirmed)?)
            }
            FileOperation::Move {
                source,
                destination,
            } => FileOutcome::Report(files.move_path(source, destination, confirmed)?),
            FileOperation::Copy {
                source,
                destination,
            } => FileOutcome::Report(files.copy_path(source, destination, confirmed)?),
            FileOperation::Delete { path } => FileOutcome::Report(files.delete(path, confirmed)?),
            FileOperation::List { path } => {
                let (path, items) = files.list(path, confirmed)?;
                FileOutcome::Listing { path, items }
            }
            FileOperation::Read { path } => {
                let (path, text) = files.read(path, confirmed)?;
                FileOutcome::Content { path, text }
            }
        };
        Ok(outcome)
    }

    /// User-facing reply for a finished operation
    pub fn format(&self, outcome: &FileOutcome, preview_chars: usize) -> String {
        match outcome {
            FileOutcome::Report(report) => {
                let size = format!("size={} байт", report.size);
                let exists = format!("exists={}", py_bool(report.exists));
                match self {
                    FileOperation::Create { .. } => {
                        format!("Создан файл: {} ({}, {})", report.path, exists, size)
                    }
                    FileOperation::Write { .. } => {
                        format!("Записано в: {} ({}, {})", report.path, exists, size)
                    }
                    FileOperation::Append { .. } => {
                        format!("Добавлено в: {} ({}, {})", report.path, exists, size)
                    }
                    FileOperation::Insert { cell: Some(cell), .. } => {
                        format!("Текст вставлен в ячейку {} файла {} ({}, {})", cell, report.path, exists, size)
                    }
                    FileOperation::Insert { .. } => {
                        format!("Текст вставлен в: {} ({}, {})", report.path, exists, size)
                    }
                    FileOperation::Move { .. } => format!("Перемещено в: {} ({})", report.path, exists),
                    FileOperation::Copy { .. } => format!("Скопировано в: {} ({})", report.path, exists),
                    FileOperation::Delete { .. } => format!("Удалено: {} ({})", report.path, exists),
                    FileOperation::List { .. } | FileOperation::Read { .. } => {
                        format!("{}: {} ({})", self.action(), report.path, exists)
                    }
                }
            }
            FileOutcome::Listing { path, items } => {
                let listing = if items.is_empty() {
                    "(пусто)".to_string()
                } else {
                    items.join(", ")
                };
                format!("Каталог: {} -> {}", path.display(), listing)
            }
            FileOutcome::Content { text, .. } => {
                format!("Содержимое файла:\n{}", preview(text, preview_chars))
            }
        }
    }
}

/// First `limit` characters, with an ellipsis when cut
pub fn preview(text: &str, limit: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Flags in replies are printed the way the desktop client expects them
fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// How a message answers a pending confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Affirmative,
    Negative,
    Other,
}

impl Reply {
    pub fn classify(message: &str, vocabulary: &Vocabulary) -> Self {
        let text = message
            .trim()
            .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?'))
            .to_lowercase();

        if vocabulary.affirmative.iter().any(|w| *w == text) {
            Reply::Affirmative
        } else if vocabulary.negative.iter().any(|w| *w == text) {
            Reply::Negative
        } else {
            Reply::Other
        }
    }
}
