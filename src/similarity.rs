//! String similarity
//!
//! Ratios are in `[0, 1]` and computed over grapheme clusters so Cyrillic and
//! combined characters count as one unit each.

use crate::config::SimilarityBackend;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Pluggable similarity measure
pub trait StringSimilarity: Send + Sync {
    /// Whole-string similarity
    fn ratio(&self, a: &str, b: &str) -> f32;

    /// Best similarity of the shorter string against any equally long window
    /// of the longer one
    fn partial_ratio(&self, a: &str, b: &str) -> f32 {
        let (short, long) = if a.graphemes(true).count() <= b.graphemes(true).count() {
            (a, b)
        } else {
            (b, a)
        };

        let short_len = short.graphemes(true).count();
        if short_len == 0 {
            return if long.is_empty() { 1.0 } else { 0.0 };
        }

        let long_graphemes: Vec<&str> = long.graphemes(true).collect();
        if long_graphemes.len() == short_len {
            return self.ratio(short, long);
        }

        let mut best = 0.0f32;
        for start in 0..=(long_graphemes.len() - short_len) {
            let window: String = long_graphemes[start..start + short_len].concat();
            best = best.max(self.ratio(short, &window));
            if best >= 1.0 {
                break;
            }
        }
        best
    }
}

/// `2 * LCS / (len_a + len_b)`, the matching-blocks ratio
#[derive(Debug, Default, Clone, Copy)]
pub struct LcsRatio;

impl StringSimilarity for LcsRatio {
    fn ratio(&self, a: &str, b: &str) -> f32 {
        let a: Vec<&str> = a.graphemes(true).collect();
        let b: Vec<&str> = b.graphemes(true).collect();
        let total = a.len() + b.len();
        if total == 0 {
            return 1.0;
        }

        // single-row LCS table
        let mut row = vec![0usize; b.len() + 1];
        for ga in &a {
            let mut diagonal = 0;
            for (j, gb) in b.iter().enumerate() {
                let above = row[j + 1];
                row[j + 1] = if ga == gb {
                    diagonal + 1
                } else {
                    above.max(row[j])
                };
                diagonal = above;
            }
        }

        (2 * row[b.len()]) as f32 / total as f32
    }
}

/// Normalized Levenshtein distance from `strsim`
#[derive(Debug, Default, Clone, Copy)]
pub struct LevenshteinRatio;

impl StringSimilarity for LevenshteinRatio {
    fn ratio(&self, a: &str, b: &str) -> f32 {
        strsim::normalized_levenshtein(a, b) as f32
    }
}

/// Build the configured backend
pub fn from_backend(backend: SimilarityBackend) -> Arc<dyn StringSimilarity> {
    match backend {
        SimilarityBackend::Lcs => Arc::new(LcsRatio),
        SimilarityBackend::Levenshtein => Arc::new(LevenshteinRatio),
    }
}
