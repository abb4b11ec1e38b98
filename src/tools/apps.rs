//! Application launcher
//!
//! Starts configured programs as child processes and closes them by
//! executable name using `sysinfo`. `refresh` also indexes Start Menu
//! shortcuts; discovered names become aliases and launch through the shell.

use super::{AppLauncher, Shell, SystemShell, ToolError};
use crate::config::AppEntry;
use crate::scorers::AppAliases;
use parking_lot::RwLock;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use sysinfo::System;
use walkdir::WalkDir;

const SHORTCUT_EXTENSIONS: [&str; 4] = ["lnk", "appref-ms", "url", "desktop"];
const MAX_SHORTCUTS: usize = 5000;

pub struct ProcessLauncher {
    apps: BTreeMap<String, AppEntry>,
    aliases: Arc<AppAliases>,
    installed: RwLock<BTreeSet<String>>,
    /// Shortcut name -> shortcut file, from the last `refresh`
    shortcuts: RwLock<BTreeMap<String, PathBuf>>,
    shortcut_dirs: Vec<PathBuf>,
    shell: Arc<dyn Shell>,
    env_var: Regex,
}

impl ProcessLauncher {
    pub fn new(apps: BTreeMap<String, AppEntry>, aliases: Arc<AppAliases>) -> Self {
        Self {
            apps,
            aliases,
            installed: RwLock::new(BTreeSet::new()),
            shortcuts: RwLock::new(BTreeMap::new()),
            shortcut_dirs: default_shortcut_dirs(),
            shell: Arc::new(SystemShell),
            env_var: Regex::new(r"%([A-Za-z_][A-Za-z0-9_]*)%").expect("static env pattern"),
        }
    }

    pub fn with_shortcut_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.shortcut_dirs = dirs;
        self
    }

    pub fn with_shell(mut self, shell: Arc<dyn Shell>) -> Self {
        self.shell = shell;
        self
    }

    /// Configured keys found installed by the last `refresh`
    pub fn installed(&self) -> Vec<String> {
        self.installed.read().iter().cloned().collect()
    }

    /// Shortcut names indexed by the last `refresh`
    pub fn shortcuts(&self) -> Vec<String> {
        self.shortcuts.read().keys().cloned().collect()
    }

    fn scan_shortcuts(&self) -> BTreeMap<String, PathBuf> {
        let mut found = BTreeMap::new();

        for root in &self.shortcut_dirs {
            if !root.is_dir() {
                log::debug!("apps: no shortcut directory {}", root.display());
                continue;
            }
            let files = WalkDir::new(root)
                .follow_links(false)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file() && is_shortcut(entry.path()));

            for entry in files {
                let Some(stem) = entry.path().file_stem() else {
                    continue;
                };
                let name = stem.to_string_lossy().trim().to_lowercase();
                if name.is_empty() || name.contains("uninstall") || name.contains("удалить") {
                    continue;
                }
                found.entry(name).or_insert_with(|| entry.path().to_path_buf());
                if found.len() >= MAX_SHORTCUTS {
                    log::warn!("apps: shortcut index capped at {}", MAX_SHORTCUTS);
                    return found;
                }
            }
        }
        found
    }

    fn entry(&self, app: &str) -> Result<(&String, &AppEntry), ToolError> {
        let key = self
            .resolve(app)
            .ok_or_else(|| ToolError::UnknownApp(app.to_string()))?;
        self.apps
            .get_key_value(&key)
            .ok_or(ToolError::UnknownApp(key))
    }

    /// Executable path for a configured command, if it can be found
    fn locate(&self, command: &str) -> Option<PathBuf> {
        let expanded = self.env_var.replace_all(command, |caps: &Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        });
        let candidate = PathBuf::from(expanded.as_ref());

        if candidate.components().count() > 1 || candidate.is_absolute() {
            return candidate.is_file().then_some(candidate);
        }

        let search_path = std::env::var_os("PATH")?;
        std::env::split_paths(&search_path)
            .flat_map(|dir| {
                let exe = dir.join(&candidate);
                let with_ext = dir.join(format!("{}.exe", candidate.display()));
                [exe, with_ext]
            })
            .find(|path| path.is_file())
    }
}

impl AppLauncher for ProcessLauncher {
    fn resolve(&self, name: &str) -> Option<String> {
        let name = name.trim().to_lowercase();
        if self.apps.contains_key(&name) {
            return Some(name);
        }
        self.aliases
            .resolve(&name)
            .filter(|key| self.apps.contains_key(key) || self.shortcuts.read().contains_key(key))
    }

    fn launch(&self, app: &str) -> Result<String, ToolError> {
        let key = self
            .resolve(app)
            .ok_or_else(|| ToolError::UnknownApp(app.to_string()))?;

        let shortcut = if self.apps.contains_key(&key) {
            None
        } else {
            self.shortcuts.read().get(&key).cloned()
        };
        if let Some(shortcut) = shortcut {
            self.shell
                .open(&shortcut.to_string_lossy())
                .map_err(|e| ToolError::Launch {
                    app: key.clone(),
                    reason: e.to_string(),
                })?;
            log::info!("apps: launched {} via {}", key, shortcut.display());
            return Ok(format!("Приложение '{}' запущено", key));
        }

        let (key, entry) = self.entry(&key)?;

        let executable = self.locate(&entry.command).ok_or_else(|| ToolError::Launch {
            app: entry.title.clone(),
            reason: "приложение не установлено".to_string(),
        })?;

        Command::new(&executable)
            .args(&entry.args)
            .spawn()
            .map_err(|e| ToolError::Launch {
                app: entry.title.clone(),
                reason: e.to_string(),
            })?;

        log::info!("apps: launched {} ({})", key, executable.display());
        Ok(format!("Приложение '{}' запущено", entry.title))
    }

    fn close(&self, app: &str) -> Result<String, ToolError> {
        let (key, entry) = self.entry(app)?;
        let target = entry.process_name.to_lowercase();

        let mut system = System::new_all();
        system.refresh_all();

        let mut closed = 0usize;
        for process in system.processes().values() {
            let matches = process
                .exe()
                .and_then(|exe| exe.file_name())
                .map_or(false, |name| name.to_string_lossy().to_lowercase() == target);
            if matches && process.kill() {
                closed += 1;
            }
        }

        if closed == 0 {
            log::warn!("apps: no running process for {}", key);
            return Err(ToolError::NotRunning(entry.title.clone()));
        }

        log::info!("apps: closed {} process(es) of {}", closed, key);
        Ok(format!("Приложение '{}' закрыто", entry.title))
    }

    fn refresh(&self) -> Result<usize, ToolError> {
        let found: BTreeSet<String> = self
            .apps
            .iter()
            .filter(|(_, entry)| self.locate(&entry.command).is_some())
            .map(|(key, _)| key.clone())
            .collect();
        log::info!("apps: {} of {} configured apps installed", found.len(), self.apps.len());

        let shortcuts = self.scan_shortcuts();
        let mut added = 0usize;
        for name in shortcuts.keys() {
            if self.aliases.resolve(name).is_none() && self.aliases.register(name, name) {
                added += 1;
            }
        }
        log::info!("apps: {} shortcut(s) indexed, {} new alias(es)", shortcuts.len(), added);

        let shortcut_only = shortcuts
            .keys()
            .filter(|name| self.apps.get(*name).is_none() && !found.contains(*name))
            .count();
        let count = found.len() + shortcut_only;

        *self.installed.write() = found;
        *self.shortcuts.write() = shortcuts;
        Ok(count)
    }
}

fn is_shortcut(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map_or(false, |ext| SHORTCUT_EXTENSIONS.contains(&ext.as_str()))
}

/// User and common Start Menu program folders, plus XDG application entries
fn default_shortcut_dirs() -> Vec<PathBuf> {
    let mut found = Vec::new();

    let roaming = std::env::var_os("APPDATA")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join("AppData").join("Roaming")));
    if let Some(roaming) = roaming {
        found.push(roaming.join(r"Microsoft\Windows\Start Menu\Programs"));
    }
    let program_data = std::env::var_os("PROGRAMDATA")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"));
    found.push(program_data.join(r"Microsoft\Windows\Start Menu\Programs"));

    if let Some(data) = dirs::data_dir() {
        found.push(data.join("applications"));
    }
    found
}
