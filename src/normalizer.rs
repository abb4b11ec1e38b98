//! Normalizer - lower-casing, tokenization and keyword extraction

use crate::config::Vocabulary;
use regex::Regex;
use std::collections::HashSet;

/// Normalized view of an utterance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// Trimmed, lower-cased text
    pub lowered: String,
    /// `[\w-]+` word tokens in order
    pub tokens: Vec<String>,
    /// Tokens without stop words and pure numbers
    pub keywords: Vec<String>,
}

impl Normalized {
    pub fn is_empty(&self) -> bool {
        self.lowered.is_empty()
    }
}

pub struct Normalizer {
    word: Regex,
    stop_words: HashSet<String>,
}

impl Normalizer {
    pub fn new(vocabulary: &Vocabulary) -> Self {
        Self {
            word: Regex::new(r"[\w-]+").expect("static word pattern"),
            stop_words: vocabulary.stop_words.iter().cloned().collect(),
        }
    }

    /// Never fails; empty input gives empty outputs
    pub fn normalize(&self, text: &str) -> Normalized {
        let lowered = text.trim().to_lowercase();
        let tokens = self.tokenize(&lowered);
        let keywords = tokens
            .iter()
            .filter(|token| !self.is_stop_word(token))
            .filter(|token| !token.chars().all(|c| c.is_ascii_digit()))
            .cloned()
            .collect();

        Normalized {
            lowered,
            tokens,
            keywords,
        }
    }

    pub fn tokenize(&self, lowered: &str) -> Vec<String> {
        self.word
            .find_iter(lowered)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }
}
