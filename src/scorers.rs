//! Domain Scorers - heuristic app / file / web confidence
//!
//! Each scorer looks at the normalized utterance and returns a score in
//! `[0, 1]` plus the search terms it would use. The policy arbiter decides
//! between them.

use crate::config::{AgentConfig, FileDomainEntry, Thresholds};
use crate::normalizer::Normalized;
use crate::similarity::StringSimilarity;
use crate::types::FileDomain;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

/// Alias table mapping spoken names to application keys.
///
/// Shared by the scorer and the explicit open/close patterns. Applications
/// discovered at runtime are added with [`AppAliases::register`].
pub struct AppAliases {
    entries: RwLock<Vec<(String, String)>>,
    similarity: Arc<dyn StringSimilarity>,
}

impl AppAliases {
    /// Configured aliases first, extra aliases never override them
    pub fn from_config(config: &AgentConfig, similarity: Arc<dyn StringSimilarity>) -> Self {
        let mut entries: Vec<(String, String)> = Vec::new();
        let mut seen = HashSet::new();

        let configured = config.apps.iter().flat_map(|(key, app)| {
            std::iter::once(key.as_str())
                .chain(app.aliases.iter().map(String::as_str))
                .map(move |alias| (alias, key.as_str()))
        });
        let extra = config
            .vocabulary
            .app_extra_aliases
            .iter()
            .flat_map(|(key, aliases)| aliases.iter().map(move |alias| (alias.as_str(), key.as_str())));

        for (alias, key) in configured.chain(extra) {
            let alias = alias.trim().to_lowercase();
            if alias.is_empty() || !seen.insert(alias.clone()) {
                continue;
            }
            entries.push((alias, key.to_string()));
        }

        Self {
            entries: RwLock::new(entries),
            similarity,
        }
    }

    /// Add an alias unless it is already taken; returns whether it was added
    pub fn register(&self, alias: &str, key: &str) -> bool {
        let alias = alias.trim().to_lowercase();
        let mut entries = self.entries.write();
        if alias.is_empty() || entries.iter().any(|(known, _)| *known == alias) {
            return false;
        }
        entries.push((alias, key.to_string()));
        true
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Scorer semantics: substring hits score by alias length, everything
    /// else by partial similarity over aliases longer than three characters.
    /// Below `min_score` there is no app.
    pub fn score(&self, lowered: &str, thresholds: &Thresholds) -> Option<(String, f32)> {
        let entries = self.entries.read();
        let mut best: Option<(&str, f32)> = None;

        for (alias, key) in entries.iter() {
            let length = alias.chars().count();
            let score = if lowered.contains(alias.as_str()) {
                if length > 2 {
                    thresholds.app_alias_long
                } else {
                    thresholds.app_alias_short
                }
            } else if length > 3 {
                self.similarity.partial_ratio(lowered, alias)
            } else {
                continue;
            };

            if best.map_or(true, |(_, b)| score > b) {
                best = Some((key.as_str(), score));
            }
        }

        match best {
            Some((key, score)) if score >= thresholds.app_min_score => {
                Some((key.to_string(), score))
            }
            _ => None,
        }
    }

    /// Matcher semantics: any alias contained in the text wins outright,
    /// otherwise the best fuzzy match over aliases longer than three
    /// characters, if it reaches `min`.
    pub fn best_match(&self, text: &str, min: f32) -> Option<String> {
        let lowered = text.trim().to_lowercase();
        if lowered.is_empty() {
            return None;
        }

        let entries = self.entries.read();
        if let Some((_, key)) = entries
            .iter()
            .find(|(alias, _)| lowered.contains(alias.as_str()))
        {
            return Some(key.clone());
        }

        let mut best: Option<(&str, f32)> = None;
        for (alias, key) in entries.iter() {
            if alias.chars().count() <= 3 {
                continue;
            }
            let score = self.similarity.partial_ratio(&lowered, alias);
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((key.as_str(), score));
            }
        }

        best.filter(|(_, score)| *score >= min)
            .map(|(key, _)| key.to_string())
    }

    /// Exact alias or key lookup
    pub fn resolve(&self, name: &str) -> Option<String> {
        let name = name.trim().to_lowercase();
        self.entries
            .read()
            .iter()
            .find(|(alias, key)| *alias == name || *key == name)
            .map(|(_, key)| key.clone())
    }
}

/// Phrase-level cues that steer the arbiter
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Signals {
    /// "найди", "поищи", ...
    pub explicit_search: bool,
    /// "в интернете", "в гугле", ...
    pub explicit_web: bool,
}

/// Output of all three scorers
#[derive(Debug, Clone, PartialEq)]
pub struct Scores {
    pub app_key: Option<String>,
    pub app: f32,

    pub file: f32,
    pub file_domain: FileDomain,
    /// Local search query built from the file terms
    pub file_query: String,

    pub web: f32,
    pub web_query: String,
}

pub struct Scorers {
    aliases: Arc<AppAliases>,
    thresholds: Thresholds,
    file_domains: Vec<FileDomainEntry>,
    generic_file_words: HashSet<String>,
    web_keywords: HashSet<String>,
    search_markers: Vec<String>,
    negative_search_markers: Vec<String>,
    web_search_hints: Vec<String>,
    url_marker: Regex,
    domain_like: Regex,
}

impl Scorers {
    pub fn new(config: &AgentConfig, aliases: Arc<AppAliases>) -> Self {
        let vocabulary = &config.vocabulary;

        Self {
            aliases,
            thresholds: config.thresholds.clone(),
            file_domains: config.file_domains.clone(),
            generic_file_words: vocabulary.generic_file_words.iter().cloned().collect(),
            web_keywords: vocabulary.web_keywords.iter().cloned().collect(),
            search_markers: vocabulary.search_markers.clone(),
            negative_search_markers: vocabulary.negative_search_markers.clone(),
            web_search_hints: vocabulary.web_search_hints.clone(),
            url_marker: Regex::new(r"https?://|www\.").expect("static url pattern"),
            domain_like: Regex::new(r"\b[a-z0-9-]+\.[a-z]{2,}\b").expect("static domain pattern"),
        }
    }

    /// Search and web cues; negative markers cancel both
    pub fn signals(&self, normalized: &Normalized) -> Signals {
        let text = normalized.lowered.as_str();
        if contains_any(text, &self.negative_search_markers) {
            return Signals::default();
        }

        Signals {
            explicit_search: contains_any(text, &self.search_markers),
            explicit_web: contains_any(text, &self.web_search_hints),
        }
    }

    /// Run all scorers; `explicit_web` floors the web score
    pub fn score(&self, normalized: &Normalized, explicit_web: bool) -> Scores {
        let (app_key, app) = match self.aliases.score(&normalized.lowered, &self.thresholds) {
            Some((key, score)) => (Some(key), score),
            None => (None, 0.0),
        };
        let (file, file_terms, file_domain) = self.score_file(normalized);
        let (web, web_terms) = self.score_web(normalized, explicit_web);

        Scores {
            app_key,
            app,
            file,
            file_domain,
            file_query: fallback_query(&file_terms, normalized),
            web,
            web_query: fallback_query(&web_terms, normalized),
        }
    }

    fn score_file(&self, normalized: &Normalized) -> (f32, Vec<String>, FileDomain) {
        let t = &self.thresholds;
        let mut best = (0.0f32, Vec::new(), FileDomain::Documents);

        for entry in &self.file_domains {
            let hits: Vec<&String> = normalized
                .tokens
                .iter()
                .filter(|token| entry.keywords.contains(*token))
                .collect();
            let ext_hits = entry
                .extensions
                .iter()
                .filter(|ext| normalized.lowered.contains(ext.as_str()))
                .count();

            let mut score = if !hits.is_empty() {
                t.file_hit_base + hits.len().min(t.max_counted_hits) as f32 * t.file_hit_step
            } else if ext_hits > 0 {
                t.file_ext_only
            } else {
                continue;
            };
            score += ext_hits.min(t.max_counted_hits) as f32 * t.file_ext_step;

            let mut terms: Vec<String> = normalized
                .keywords
                .iter()
                .filter(|kw| !self.generic_file_words.contains(kw.as_str()))
                .cloned()
                .collect();
            if terms.is_empty() {
                terms = if hits.is_empty() {
                    normalized.keywords.clone()
                } else {
                    hits.into_iter().cloned().collect()
                };
            }
            terms.extend(entry.default_terms.iter().cloned());

            if score > best.0 {
                best = (score, merge_terms(terms), entry.domain);
            }
        }

        best
    }

    fn score_web(&self, normalized: &Normalized, explicit_web: bool) -> (f32, Vec<String>) {
        let t = &self.thresholds;
        let hits: Vec<&String> = normalized
            .tokens
            .iter()
            .filter(|token| self.web_keywords.contains(token.as_str()))
            .collect();

        let mut score = 0.0f32;
        if !hits.is_empty() {
            score = t.web_hit_base + hits.len().min(t.max_counted_hits) as f32 * t.web_hit_step;
        }
        if explicit_web {
            score = score.max(t.web_hint_floor);
        }
        if self.url_marker.is_match(&normalized.lowered) {
            score = score.max(t.web_url_floor);
        }
        if self.domain_like.is_match(&normalized.lowered) {
            score = score.max(t.web_domain_floor);
        }
        if score == 0.0 {
            return (0.0, vec![]);
        }

        let mut terms: Vec<String> = normalized
            .keywords
            .iter()
            .filter(|kw| !hits.contains(kw))
            .cloned()
            .collect();
        if terms.is_empty() {
            terms = normalized.keywords.clone();
        }
        (score, merge_terms(terms))
    }
}

fn contains_any(text: &str, phrases: &[String]) -> bool {
    phrases.iter().any(|phrase| text.contains(phrase.as_str()))
}

/// Trim, drop empties and duplicates, keep first-seen order
fn merge_terms(terms: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    terms
        .into_iter()
        .map(|term| term.trim().to_string())
        .filter(|term| !term.is_empty() && seen.insert(term.clone()))
        .collect()
}

/// Terms, else keywords, else tokens, else the whole text
fn fallback_query(terms: &[String], normalized: &Normalized) -> String {
    let candidates: [&[String]; 3] = [terms, &normalized.keywords, &normalized.tokens];
    let parts = candidates
        .into_iter()
        .find(|list| !list.is_empty());

    match parts {
        Some(list) => list.join(" "),
        None => normalized.lowered.clone(),
    }
}
