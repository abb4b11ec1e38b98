//! File operations behind an allow-list
//!
//! Paths inside an allow-listed directory are handled directly; anything else
//! fails with `ConfirmationRequired` until the caller retries with
//! `confirmed = true`. Only plain-text formats are written; office documents
//! are reported as unsupported.

use super::{FileOps, FileReport, FileStatus, Shell, SystemShell, ToolError};
use crate::config::PathsConfig;
use crate::types::FileKind;
use regex::{Captures, Regex};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

pub struct FsFileOps {
    allowlist: Vec<PathBuf>,
    base_dir: PathBuf,
    desktop: PathBuf,
    shell: Arc<dyn Shell>,
    env_var: Regex,
}

impl FsFileOps {
    pub fn new(allowlist: Vec<PathBuf>, base_dir: PathBuf) -> Self {
        let desktop = dirs::desktop_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Desktop")))
            .unwrap_or_else(|| base_dir.clone());

        let mut ops = Self {
            allowlist: Vec::new(),
            base_dir: PathBuf::new(),
            desktop,
            shell: Arc::new(SystemShell),
            env_var: Regex::new(r"%([A-Za-z_][A-Za-z0-9_]*)%|\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
                .expect("static env pattern"),
        };
        ops.base_dir = ops.absolutize(&ops.expand(&base_dir.to_string_lossy()));
        ops.allowlist = allowlist
            .iter()
            .map(|dir| ops.resolve(&dir.to_string_lossy()))
            .collect();
        log::debug!("fs: allow-list {:?}", ops.allowlist);
        ops
    }

    pub fn from_config(paths: &PathsConfig) -> Self {
        Self::new(paths.allowlist.clone(), paths.base_dir())
    }

    pub fn with_shell(mut self, shell: Arc<dyn Shell>) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_desktop(mut self, desktop: PathBuf) -> Self {
        self.desktop = desktop;
        self
    }

    pub fn allowlist(&self) -> &[PathBuf] {
        &self.allowlist
    }

    /// `%VAR%`, `$VAR`, `${VAR}` and a leading `~`; unknown variables stay as typed
    fn expand(&self, raw: &str) -> PathBuf {
        let expanded = self.env_var.replace_all(raw.trim(), |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        });

        let text = expanded.as_ref();
        if text == "~" {
            return dirs::home_dir().unwrap_or_else(|| PathBuf::from(text));
        }
        if let Some(rest) = text.strip_prefix("~/").or_else(|| text.strip_prefix("~\\")) {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(text)
    }

    /// Join onto the base directory and fold `.` / `..` without touching disk
    fn absolutize(&self, path: &Path) -> PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };

        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                other => normalized.push(other.as_os_str()),
            }
        }
        normalized
    }

    fn guard(&self, path: &Path, action: &str, confirmed: bool) -> Result<(), ToolError> {
        if self.requires_confirmation(path) && !confirmed {
            log::warn!("fs: '{}' on {} needs confirmation", action, path.display());
            return Err(ToolError::ConfirmationRequired {
                path: path.to_path_buf(),
                action: action.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_text(&self, path: &Path) -> Result<(), ToolError> {
        let kind = path
            .extension()
            .and_then(|ext| FileKind::from_extension(&ext.to_string_lossy()));
        match kind {
            Some(kind) if !kind.is_plain_text() => Err(ToolError::Unsupported(format!(
                "{} ({})",
                path.display(),
                kind.extension()
            ))),
            _ => Ok(()),
        }
    }

    fn ensure_parent(&self, path: &Path) -> Result<(), ToolError> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| ToolError::io(parent, e))
            }
            _ => Ok(()),
        }
    }

    fn report(&self, path: &Path, status: FileStatus) -> FileReport {
        let metadata = fs::metadata(path).ok();
        let exists = metadata.is_some();
        let verified = match status {
            FileStatus::Deleted => !exists,
            _ => exists,
        };

        FileReport {
            path: path.display().to_string(),
            exists,
            size: metadata.map_or(0, |m| m.len()),
            status,
            verified,
            requires_confirmation: self.requires_confirmation(path),
        }
    }

    fn write_text(&self, path: &Path, content: &str) -> Result<(), ToolError> {
        self.ensure_parent(path)?;
        fs::write(path, content).map_err(|e| ToolError::io(path, e))
    }

    fn append_text(&self, path: &Path, content: &str) -> Result<(), ToolError> {
        self.ensure_parent(path)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ToolError::io(path, e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| ToolError::io(path, e))
    }

    /// Directory destinations receive the source under its own name
    fn destination_for(&self, source: &Path, destination: PathBuf) -> PathBuf {
        match source.file_name() {
            Some(name) if destination.is_dir() => destination.join(name),
            _ => destination,
        }
    }

    fn copy_tree(&self, source: &Path, destination: &Path) -> Result<(), ToolError> {
        for entry in WalkDir::new(source) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(source).to_path_buf();
                ToolError::io(path, e.into())
            })?;
            let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
            let target = destination.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(|e| ToolError::io(&target, e))?;
            } else {
                fs::copy(entry.path(), &target).map_err(|e| ToolError::io(entry.path(), e))?;
            }
        }
        Ok(())
    }

    fn insert_cell(&self, path: &Path, text: &str, cell: &str) -> Result<(), ToolError> {
        let (row, col) = parse_cell(cell)
            .ok_or_else(|| ToolError::Unsupported(format!("ячейка {}", cell)))?;

        let existing = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(ToolError::io(path, e)),
        };

        let mut rows: Vec<Vec<String>> = existing.lines().map(split_csv_line).collect();
        if rows.len() <= row {
            rows.resize(row + 1, Vec::new());
        }
        if rows[row].len() <= col {
            rows[row].resize(col + 1, String::new());
        }
        rows[row][col] = text.trim().to_string();

        let mut out = rows
            .iter()
            .map(|cells| cells.iter().map(|c| quote_csv(c)).collect::<Vec<_>>().join(","))
            .collect::<Vec<_>>()
            .join("\n");
        out.push('\n');
        self.write_text(path, &out)
    }
}

impl FileOps for FsFileOps {
    fn resolve(&self, raw: &str) -> PathBuf {
        let cleaned = raw.trim().trim_matches('"');
        self.absolutize(&self.expand(cleaned))
    }

    fn requires_confirmation(&self, path: &Path) -> bool {
        !self.allowlist.iter().any(|allowed| path.starts_with(allowed))
    }

    fn create(&self, path: &str, content: &str, confirmed: bool) -> Result<FileReport, ToolError> {
        let target = self.resolve(path);
        self.guard(&target, "создание файла", confirmed)?;
        self.ensure_text(&target)?;

        let existed = target.exists();
        self.write_text(&target, content)?;
        log::info!("fs: created {}", target.display());

        let status = if existed {
            FileStatus::Overwritten
        } else {
            FileStatus::Created
        };
        Ok(self.report(&target, status))
    }

    fn write(&self, path: &str, content: &str, confirmed: bool) -> Result<FileReport, ToolError> {
        let target = self.resolve(path);
        self.guard(&target, "запись файла", confirmed)?;
        self.ensure_text(&target)?;

        let existed = target.exists();
        self.write_text(&target, content)?;
        log::info!("fs: wrote {} bytes to {}", content.len(), target.display());

        let status = if existed {
            FileStatus::Overwritten
        } else {
            FileStatus::Created
        };
        Ok(self.report(&target, status))
    }

    fn append(&self, path: &str, content: &str, confirmed: bool) -> Result<FileReport, ToolError> {
        let target = self.resolve(path);
        self.guard(&target, "добавление в файл", confirmed)?;
        self.ensure_text(&target)?;

        self.append_text(&target, content)?;
        log::info!("fs: appended {} bytes to {}", content.len(), target.display());
        Ok(self.report(&target, FileStatus::Appended))
    }

    fn insert(
        &self,
        path: &str,
        text: &str,
        cell: Option<&str>,
        confirmed: bool,
    ) -> Result<FileReport, ToolError> {
        let target = self.resolve(path);
        self.guard(&target, "вставка текста", confirmed)?;
        self.ensure_text(&target)?;

        match cell {
            Some(cell) => {
                let is_csv = target
                    .extension()
                    .and_then(|ext| FileKind::from_extension(&ext.to_string_lossy()))
                    == Some(FileKind::Csv);
                if !is_csv {
                    return Err(ToolError::Unsupported(format!(
                        "ячейки есть только в таблицах: {}",
                        target.display()
                    )));
                }
                self.insert_cell(&target, text, cell)?;
            }
            None => {
                let needs_break = fs::read_to_string(&target)
                    .map(|current| !current.is_empty() && !current.ends_with('\n'))
                    .unwrap_or(false);
                let mut block = String::new();
                if needs_break {
                    block.push('\n');
                }
                block.push_str(text.trim_end());
                block.push('\n');
                self.append_text(&target, &block)?;
            }
        }

        log::info!("fs: inserted text into {}", target.display());
        Ok(self.report(&target, FileStatus::Inserted))
    }

    fn move_path(
        &self,
        source: &str,
        destination: &str,
        confirmed: bool,
    ) -> Result<FileReport, ToolError> {
        let src = self.resolve(source);
        let dst = self.resolve(destination);
        self.guard(&src, "перемещение", confirmed)?;
        self.guard(&dst, "перемещение", confirmed)?;

        if !src.exists() {
            return Err(ToolError::NotFound(src));
        }
        let dst = self.destination_for(&src, dst);
        self.ensure_parent(&dst)?;

        if fs::rename(&src, &dst).is_err() {
            // rename fails across volumes
            if src.is_dir() {
                self.copy_tree(&src, &dst)?;
                fs::remove_dir_all(&src).map_err(|e| ToolError::io(&src, e))?;
            } else {
                fs::copy(&src, &dst).map_err(|e| ToolError::io(&src, e))?;
                fs::remove_file(&src).map_err(|e| ToolError::io(&src, e))?;
            }
        }

        log::info!("fs: moved {} -> {}", src.display(), dst.display());
        Ok(self.report(&dst, FileStatus::Moved))
    }

    fn copy_path(
        &self,
        source: &str,
        destination: &str,
        confirmed: bool,
    ) -> Result<FileReport, ToolError> {
        let src = self.resolve(source);
        let dst = self.resolve(destination);
        self.guard(&src, "копирование", confirmed)?;
        self.guard(&dst, "копирование", confirmed)?;

        if !src.exists() {
            return Err(ToolError::NotFound(src));
        }
        let dst = self.destination_for(&src, dst);
        self.ensure_parent(&dst)?;

        if src.is_dir() {
            self.copy_tree(&src, &dst)?;
        } else {
            fs::copy(&src, &dst).map_err(|e| ToolError::io(&src, e))?;
        }

        log::info!("fs: copied {} -> {}", src.display(), dst.display());
        Ok(self.report(&dst, FileStatus::Copied))
    }

    fn delete(&self, path: &str, confirmed: bool) -> Result<FileReport, ToolError> {
        let target = self.resolve(path);
        self.guard(&target, "удаление", confirmed)?;

        if target.is_dir() {
            fs::remove_dir_all(&target).map_err(|e| ToolError::io(&target, e))?;
        } else if target.exists() {
            fs::remove_file(&target).map_err(|e| ToolError::io(&target, e))?;
        } else {
            log::warn!("fs: nothing to delete at {}", target.display());
            return Err(ToolError::NotFound(target));
        }

        log::info!("fs: deleted {}", target.display());
        Ok(self.report(&target, FileStatus::Deleted))
    }

    fn list(&self, path: &str, confirmed: bool) -> Result<(PathBuf, Vec<String>), ToolError> {
        let target = self.resolve(path);
        self.guard(&target, "просмотр каталога", confirmed)?;

        if !target.is_dir() {
            return Err(ToolError::NotFound(target));
        }
        let mut items = fs::read_dir(&target)
            .map_err(|e| ToolError::io(&target, e))?
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        items.sort();

        Ok((target, items))
    }

    fn read(&self, path: &str, confirmed: bool) -> Result<(PathBuf, String), ToolError> {
        let target = self.resolve(path);
        self.guard(&target, "чтение файла", confirmed)?;
        self.ensure_text(&target)?;

        let text = fs::read_to_string(&target).map_err(|e| ToolError::io(&target, e))?;
        Ok((target, text))
    }

    fn open(&self, path: &str) -> Result<PathBuf, ToolError> {
        let target = self.resolve(path);
        if !target.exists() {
            return Err(ToolError::NotFound(target));
        }
        self.shell
            .open(&target.to_string_lossy())
            .map_err(|e| ToolError::io(&target, e))?;
        Ok(target)
    }

    fn desktop_dir(&self) -> PathBuf {
        self.desktop.clone()
    }
}

/// Sheet bounds: 1 048 576 rows, columns up to XFD
const MAX_ROWS: usize = 1 << 20;
const MAX_COLUMNS: usize = 1 << 14;

/// "B3" -> (row 2, column 1); `None` outside the sheet bounds
fn parse_cell(cell: &str) -> Option<(usize, usize)> {
    let cell = cell.trim();
    let split = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(split);
    if letters.is_empty() || letters.len() > 3 || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let col = letters
        .to_ascii_uppercase()
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + usize::from(b - b'A' + 1));
    let row: usize = digits.parse().ok()?;
    if row == 0 || row > MAX_ROWS || col > MAX_COLUMNS {
        return None;
    }
    Some((row - 1, col - 1))
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cells.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    cells.push(current);
    cells
}

fn quote_csv(cell: &str) -> String {
    if cell.contains(&[',', '"', '\n'][..]) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::RecordingShell;
    use tempfile::TempDir;

    fn setup() -> (TempDir, TempDir, FsFileOps) {
        let allowed = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let ops = FsFileOps::new(vec![allowed.path().to_path_buf()], allowed.path().to_path_buf())
            .with_desktop(allowed.path().to_path_buf());
        (allowed, outside, ops)
    }

    #[test]
    fn test_create_inside_allowlist() {
        let (dir, _outside, ops) = setup();

        let report = ops.create("записка.txt", "привет", false).unwrap();

        assert_eq!(report.status, FileStatus::Created);
        assert!(report.exists && report.verified);
        assert_eq!(report.size, "привет".len() as u64);
        assert!(!report.requires_confirmation);
        assert_eq!(
            fs::read_to_string(dir.path().join("записка.txt")).unwrap(),
            "привет"
        );

        let report = ops.write("записка.txt", "новый", false).unwrap();
        assert_eq!(report.status, FileStatus::Overwritten);
    }

    #[test]
    fn test_outside_allowlist_needs_confirmation() {
        let (_dir, outside, ops) = setup();
        let target = outside.path().join("x.txt");
        let raw = target.to_string_lossy().to_string();

        let err = ops.create(&raw, "", false).unwrap_err();
        assert!(matches!(err, ToolError::ConfirmationRequired { .. }));
        assert!(!target.exists());

        let report = ops.create(&raw, "", true).unwrap();
        assert!(report.requires_confirmation);
        assert!(target.exists());
    }

    #[test]
    fn test_append_keeps_leading_space() {
        let (dir, _outside, ops) = setup();
        ops.write("note.txt", "начало", false).unwrap();

        let report = ops.append("note.txt", " +доп", false).unwrap();

        assert_eq!(report.status, FileStatus::Appended);
        assert_eq!(
            fs::read_to_string(dir.path().join("note.txt")).unwrap(),
            "начало +доп"
        );
    }

    #[test]
    fn test_office_formats_unsupported() {
        let (_dir, _outside, ops) = setup();
        let err = ops.create("отчёт.docx", "текст", false).unwrap_err();
        assert!(matches!(err, ToolError::Unsupported(_)));
    }

    #[test]
    fn test_move_copy_delete_and_list() {
        let (dir, _outside, ops) = setup();
        ops.create("a.txt", "1", false).unwrap();
        fs::create_dir(dir.path().join("archive")).unwrap();

        let report = ops.copy_path("a.txt", "b.txt", false).unwrap();
        assert_eq!(report.status, FileStatus::Copied);

        let report = ops.move_path("b.txt", "archive", false).unwrap();
        assert_eq!(report.status, FileStatus::Moved);
        assert!(dir.path().join("archive/b.txt").exists());

        let (_, items) = ops.list(".", false).unwrap();
        assert_eq!(items, vec!["a.txt".to_string(), "archive".to_string()]);

        let report = ops.delete("archive", false).unwrap();
        assert_eq!(report.status, FileStatus::Deleted);
        assert!(!report.exists && report.verified);

        assert!(matches!(
            ops.delete("archive", false),
            Err(ToolError::NotFound(_))
        ));
    }

    #[test]
    fn test_copy_directory_tree() {
        let (dir, _outside, ops) = setup();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("src/nested/deep.txt"), "x").unwrap();

        ops.copy_path("src", "dst", false).unwrap();
        assert!(dir.path().join("dst/nested/deep.txt").exists());
    }

    #[test]
    fn test_insert_plain_and_cell() {
        let (dir, _outside, ops) = setup();
        ops.write("notes.md", "# Заметки", false).unwrap();

        ops.insert("notes.md", "Абзац про море", None, false).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("notes.md")).unwrap(),
            "# Заметки\nАбзац про море\n"
        );

        ops.insert("table.csv", "текст, с запятой", Some("B2"), false)
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("table.csv")).unwrap(),
            "\n,\"текст, с запятой\"\n"
        );

        assert!(matches!(
            ops.insert("notes.md", "x", Some("A1"), false),
            Err(ToolError::Unsupported(_))
        ));
    }

    #[test]
    fn test_resolve_normalizes() {
        let (dir, _outside, ops) = setup();
        assert_eq!(ops.resolve("./a/../b.txt"), dir.path().join("b.txt"));
        assert_eq!(ops.resolve("\"c.txt\""), dir.path().join("c.txt"));
    }

    #[test]
    fn test_open_goes_through_shell() {
        let (dir, _outside, ops) = setup();
        let shell = Arc::new(RecordingShell::default());
        let ops = ops.with_shell(shell.clone());
        fs::write(dir.path().join("a.txt"), "").unwrap();

        let opened = ops.open("a.txt").unwrap();

        assert_eq!(opened, dir.path().join("a.txt"));
        assert_eq!(shell.opened.lock().len(), 1);
        assert!(matches!(ops.open("missing.txt"), Err(ToolError::NotFound(_))));
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("A1"), Some((0, 0)));
        assert_eq!(parse_cell("b3"), Some((2, 1)));
        assert_eq!(parse_cell("AA10"), Some((9, 26)));
        assert_eq!(parse_cell("A0"), None);
        assert_eq!(parse_cell("12"), None);
        assert_eq!(parse_cell("XFD1048576"), Some((1_048_575, 16_383)));
        assert_eq!(parse_cell("A1048577"), None);
        assert_eq!(parse_cell("XFE1"), None);
        assert_eq!(parse_cell("AAAA1"), None);
        assert_eq!(parse_cell("A999999999999999999999999"), None);
    }

    #[test]
    fn test_insert_cell_outside_sheet_is_rejected() {
        let (dir, _outside, ops) = setup();

        assert!(matches!(
            ops.insert("big.csv", "x", Some("A999999999"), false),
            Err(ToolError::Unsupported(_))
        ));
        assert!(!dir.path().join("big.csv").exists());
    }
}
