//! External collaborators
//!
//! The router only talks to these traits. Each has a default implementation
//! in a submodule; tests substitute recording fakes.

pub mod apps;
pub mod fs;
pub mod llm;
pub mod search;
pub mod web;

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Collaborator failure
#[derive(Debug, Error)]
pub enum ToolError {
    /// Path outside the allow-list; retry with `confirmed = true`
    #[error("Операция '{action}' требует подтверждения для пути: {}", .path.display())]
    ConfirmationRequired { path: PathBuf, action: String },

    #[error("Путь не найден: {}", .0.display())]
    NotFound(PathBuf),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Неизвестное приложение: {0}")]
    UnknownApp(String),

    #[error("Не получилось запустить {app}: {reason}")]
    Launch { app: String, reason: String },

    #[error("Не удалось найти запущенное приложение: {0}")]
    NotRunning(String),

    #[error("Формат не поддерживается: {0}")]
    Unsupported(String),

    #[error("Сетевая ошибка: {0}")]
    Network(String),

    #[error("Модель недоступна: {0}")]
    Model(String),
}

impl ToolError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            return ToolError::NotFound(path.into());
        }
        ToolError::Io {
            path: path.into(),
            source,
        }
    }
}

/// What a file operation did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Created,
    Overwritten,
    Appended,
    Inserted,
    Moved,
    Copied,
    Deleted,
}

/// Post-condition report of a mutating file operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: String,
    pub exists: bool,
    pub size: u64,
    pub status: FileStatus,
    /// Target was re-checked on disk after the operation
    pub verified: bool,
    /// Operation went through the confirmation gate
    pub requires_confirmation: bool,
}

/// File system access gated by an allow-list
pub trait FileOps: Send + Sync {
    /// Expand `~`, environment variables and relative paths
    fn resolve(&self, raw: &str) -> PathBuf;

    /// Outside the allow-list
    fn requires_confirmation(&self, path: &Path) -> bool;

    fn create(&self, path: &str, content: &str, confirmed: bool) -> Result<FileReport, ToolError>;
    fn write(&self, path: &str, content: &str, confirmed: bool) -> Result<FileReport, ToolError>;
    fn append(&self, path: &str, content: &str, confirmed: bool) -> Result<FileReport, ToolError>;

    /// Insert text into a document, optionally at a spreadsheet cell
    fn insert(
        &self,
        path: &str,
        text: &str,
        cell: Option<&str>,
        confirmed: bool,
    ) -> Result<FileReport, ToolError>;

    fn move_path(&self, source: &str, destination: &str, confirmed: bool)
        -> Result<FileReport, ToolError>;
    fn copy_path(&self, source: &str, destination: &str, confirmed: bool)
        -> Result<FileReport, ToolError>;
    fn delete(&self, path: &str, confirmed: bool) -> Result<FileReport, ToolError>;

    /// Sorted entry names of a directory
    fn list(&self, path: &str, confirmed: bool) -> Result<(PathBuf, Vec<String>), ToolError>;
    fn read(&self, path: &str, confirmed: bool) -> Result<(PathBuf, String), ToolError>;

    /// Hand a path to the desktop shell
    fn open(&self, path: &str) -> Result<PathBuf, ToolError>;

    fn desktop_dir(&self) -> PathBuf;
}

/// Application launch and close
pub trait AppLauncher: Send + Sync {
    /// Configured key for a name or alias
    fn resolve(&self, name: &str) -> Option<String>;

    /// Returns a human-readable confirmation
    fn launch(&self, app: &str) -> Result<String, ToolError>;
    fn close(&self, app: &str) -> Result<String, ToolError>;

    /// Re-check installed apps and index shortcuts; returns how many are launchable
    fn refresh(&self) -> Result<usize, ToolError>;
}

/// One web search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebHit {
    pub title: String,
    pub url: String,
}

pub trait WebSearch: Send + Sync {
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebHit>, ToolError>;

    /// Open in the system browser; returns the normalized URL
    fn open(&self, url: &str) -> Result<String, ToolError>;
}

pub trait LocalSearch: Send + Sync {
    /// Paths ordered best first; `extensions` empty means any
    fn search(
        &self,
        query: &str,
        extensions: &[String],
        max_results: usize,
    ) -> Result<Vec<String>, ToolError>;
}

pub trait LlmChat: Send + Sync {
    fn generate(&self, prompt: &str, model: &str) -> Result<String, ToolError>;
}

/// Desktop shell "open with default handler"
pub trait Shell: Send + Sync {
    fn open(&self, target: &str) -> io::Result<()>;
}

/// Real shell via the `open` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl Shell for SystemShell {
    fn open(&self, target: &str) -> io::Result<()> {
        log::info!("shell open: {}", target);
        open::that(target)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err = ToolError::io(
            "/missing",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, ToolError::NotFound(_)));

        let err = ToolError::io(
            "/locked",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, ToolError::Io { .. }));
    }

    #[test]
    fn test_report_serializes_status() {
        let report = FileReport {
            path: "/tmp/a.txt".to_string(),
            exists: true,
            size: 3,
            status: FileStatus::Appended,
            verified: true,
            requires_confirmation: false,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "appended");
        assert_eq!(json["verified"], true);
    }
}
