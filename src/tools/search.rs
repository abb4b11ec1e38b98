//! Local file search
//!
//! Walks the allow-listed directories and ranks file names by fuzzy
//! similarity to the query, newest first among equal scores.

use super::{LocalSearch, ToolError};
use crate::similarity::StringSimilarity;
use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

pub struct WalkSearch {
    roots: Vec<PathBuf>,
    max_depth: usize,
    min_score: f32,
    similarity: Arc<dyn StringSimilarity>,
}

struct Candidate {
    path: PathBuf,
    score: f32,
    modified: SystemTime,
}

impl WalkSearch {
    pub fn new(
        roots: Vec<PathBuf>,
        max_depth: usize,
        min_score: f32,
        similarity: Arc<dyn StringSimilarity>,
    ) -> Self {
        Self {
            roots,
            max_depth,
            min_score,
            similarity,
        }
    }

    fn score(&self, name: &str, baseline: &str, tokens: &[&str]) -> f32 {
        if name.contains(baseline) {
            return 1.0;
        }
        tokens
            .iter()
            .map(|token| self.similarity.partial_ratio(name, token))
            .fold(self.similarity.partial_ratio(name, baseline), f32::max)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

impl LocalSearch for WalkSearch {
    fn search(
        &self,
        query: &str,
        extensions: &[String],
        max_results: usize,
    ) -> Result<Vec<String>, ToolError> {
        let baseline = query.trim().to_lowercase();
        if baseline.is_empty() {
            return Ok(vec![]);
        }
        let spaced = baseline.replace('_', " ");
        let tokens: Vec<&str> = spaced.split_whitespace().collect();
        let extensions: Vec<String> = extensions.iter().map(|e| e.to_lowercase()).collect();

        let mut found = Vec::new();
        for root in self.roots.iter().filter(|root| root.is_dir()) {
            let walker = WalkDir::new(root)
                .max_depth(self.max_depth)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file());

            for entry in walker {
                let name = entry.file_name().to_string_lossy().to_lowercase();
                if !extensions.is_empty() && !extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
                    continue;
                }

                let score = self.score(&name, &baseline, &tokens);
                if score < self.min_score {
                    continue;
                }

                let modified = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                found.push(Candidate {
                    path: entry.into_path(),
                    score,
                    modified,
                });
            }
        }

        found.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.modified.cmp(&a.modified))
        });
        log::debug!("search: {} match(es) for '{}'", found.len(), baseline);

        Ok(found
            .into_iter()
            .take(max_results)
            .map(|c| c.path.display().to_string())
            .collect())
    }
}
