//! Lexical word-overlap matcher.
//!
//! Complements vector search with exact keyword lookups: part numbers, error
//! codes, and torque figures embed poorly but match exactly. A chunk's score
//! is the fraction of distinct query words that appear in it, so scores are
//! always in [0, 1] and directly comparable to the semantic leg.

use super::types::{ChunkId, ChunkRecord};
use std::collections::HashSet;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

/// Cross-language synonym table for query expansion.
///
/// Manuals are predominantly English while operators often query in Spanish.
/// A query word on the left also counts as matched when any word on the
/// right appears in the chunk. Expansion widens matching only; it never adds
/// to the query-word denominator, so scores stay in [0, 1].
const EXPANSION_TERMS: &[(&str, &[&str])] = &[
    ("aceite", &["oil", "lubricant"]),
    ("filtro", &["filter"]),
    ("cambiar", &["change", "replace", "replacement"]),
    ("cambio", &["change", "replacement"]),
    ("motor", &["engine"]),
    ("frenos", &["brake", "brakes"]),
    ("freno", &["brake"]),
    ("refrigerante", &["coolant"]),
    ("bateria", &["battery"]),
    ("batería", &["battery"]),
    ("presion", &["pressure"]),
    ("presión", &["pressure"]),
    ("neumatico", &["tire", "tyre"]),
    ("neumático", &["tire", "tyre"]),
    ("llanta", &["tire", "tyre", "wheel"]),
    ("bujia", &["spark", "plug"]),
    ("bujía", &["spark", "plug"]),
    ("correa", &["belt"]),
    ("mantenimiento", &["maintenance", "service"]),
    ("intervalo", &["interval"]),
    ("par", &["torque"]),
    ("apriete", &["torque", "tightening"]),
];

/// Splits text into lowercase word tokens.
///
/// Uses Unicode word segmentation (UAX #29) rather than ASCII whitespace
/// splitting so accented and non-Latin queries tokenize sensibly.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.unicode_words().map(|w| w.to_lowercase())
}

/// In-memory lexical index: one lowercase word set per chunk.
///
/// Built from the chunk metadata table at load time; cheap enough that it is
/// never persisted. Queries take `&self` and share no mutable state.
pub struct LexicalMatcher {
    /// Word sets in chunk-id order, paired with the id for tie-break sorting
    chunks: Vec<(ChunkId, HashSet<String>)>,
}

impl LexicalMatcher {
    /// Builds the matcher from chunk records.
    pub fn new(chunks: &[ChunkRecord]) -> Self {
        let chunks = chunks
            .iter()
            .map(|c| (c.id, tokenize(&c.text).collect()))
            .collect();
        Self { chunks }
    }

    /// Scores chunks by word overlap with the query.
    ///
    /// Score is `|matched query words| / |distinct query words|`. A query
    /// word counts as matched when the chunk contains the word itself or any
    /// of its [`EXPANSION_TERMS`] synonyms. Only chunks with a non-zero
    /// score are returned, sorted by descending score with ties broken by
    /// ascending chunk id, truncated to `k`.
    ///
    /// A query with no word tokens (empty, punctuation-only) matches
    /// nothing.
    pub fn search(&self, query: &str, k: usize) -> Vec<(ChunkId, f32)> {
        if k == 0 {
            return vec![];
        }

        let query_words: HashSet<String> = tokenize(query).collect();
        if query_words.is_empty() {
            return vec![];
        }
        let total = query_words.len() as f32;

        let mut scored: Vec<(ChunkId, f32)> = self
            .chunks
            .iter()
            .filter_map(|(id, words)| {
                let matched = query_words
                    .iter()
                    .filter(|qw| Self::word_matches(qw, words))
                    .count();
                if matched == 0 {
                    None
                } else {
                    Some((*id, matched as f32 / total))
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        debug!(
            query_words = query_words.len(),
            hits = scored.len(),
            "lexical search"
        );
        scored
    }

    fn word_matches(query_word: &str, chunk_words: &HashSet<String>) -> bool {
        if chunk_words.contains(query_word) {
            return true;
        }
        EXPANSION_TERMS
            .iter()
            .find(|(term, _)| *term == query_word)
            .map(|(_, synonyms)| synonyms.iter().any(|s| chunk_words.contains(*s)))
            .unwrap_or(false)
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if no chunks are indexed.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, text: &str) -> ChunkRecord {
        ChunkRecord {
            id: ChunkId::from_u64(id),
            text: text.to_string(),
            page_number: 1,
            start_offset: 0,
            end_offset: text.chars().count(),
        }
    }

    #[test]
    fn test_full_and_partial_overlap() {
        let matcher = LexicalMatcher::new(&[
            record(0, "Replace the oil filter every 10000 km"),
            record(1, "Check the oil level with the dipstick"),
            record(2, "Brake pad wear limits"),
        ]);

        let results = matcher.search("oil filter", 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, ChunkId::from_u64(0));
        assert!((results[0].1 - 1.0).abs() < f32::EPSILON);
        assert_eq!(results[1].0, ChunkId::from_u64(1));
        assert!((results[1].1 - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_case_insensitive() {
        let matcher = LexicalMatcher::new(&[record(0, "OIL Filter replacement")]);
        let results = matcher.search("oil FILTER", 10);
        assert_eq!(results.len(), 1);
        assert!((results[0].1 - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_no_match_returns_empty() {
        let matcher = LexicalMatcher::new(&[record(0, "coolant hose routing")]);
        assert!(matcher.search("transmission fluid", 10).is_empty());
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let matcher = LexicalMatcher::new(&[record(0, "anything at all")]);
        assert!(matcher.search("", 10).is_empty());
        assert!(matcher.search("   !!! ...", 10).is_empty());
    }

    #[test]
    fn test_duplicate_query_words_counted_once() {
        let matcher = LexicalMatcher::new(&[record(0, "torque specification table")]);
        let results = matcher.search("torque torque torque", 10);
        assert_eq!(results.len(), 1);
        assert!((results[0].1 - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_tie_broken_by_ascending_id() {
        let matcher = LexicalMatcher::new(&[
            record(5, "spark plug gap"),
            record(2, "spark plug torque"),
        ]);
        let results = matcher.search("spark plug", 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, ChunkId::from_u64(2));
        assert_eq!(results[1].0, ChunkId::from_u64(5));
    }

    #[test]
    fn test_truncates_to_k() {
        let chunks: Vec<ChunkRecord> = (0..10)
            .map(|i| record(i, "valve clearance adjustment"))
            .collect();
        let matcher = LexicalMatcher::new(&chunks);
        assert_eq!(matcher.search("valve clearance", 3).len(), 3);
        assert!(matcher.search("valve", 0).is_empty());
    }

    #[test]
    fn test_query_expansion_spanish_terms() {
        let matcher = LexicalMatcher::new(&[
            record(0, "Engine oil filter replacement procedure"),
            record(1, "Windshield washer reservoir"),
        ]);

        let results = matcher.search("cambiar filtro aceite", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, ChunkId::from_u64(0));
        // All three Spanish words match via expansion
        assert!((results[0].1 - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_expansion_does_not_inflate_denominator() {
        // "par" expands to "torque" but the score stays a fraction of the
        // two original query words
        let matcher = LexicalMatcher::new(&[record(0, "torque values for cylinder head")]);
        let results = matcher.search("par inexistente", 10);
        assert_eq!(results.len(), 1);
        assert!((results[0].1 - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_accented_query_tokenization() {
        let matcher = LexicalMatcher::new(&[record(0, "battery terminal cleaning")]);
        let results = matcher.search("batería", 10);
        assert_eq!(results.len(), 1);
    }
}
