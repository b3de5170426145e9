//! Word selection over the `feedback_vocab` statistics and the FTS5 query
//! used to score comments against those words.

use std::collections::HashSet;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

const STOPWORDS_EN: &[&str] = &[
    "about", "after", "all", "also", "and", "any", "are", "because", "been", "but", "can",
    "could", "did", "does", "for", "from", "had", "has", "have", "her", "his", "how", "into",
    "its", "just", "not", "now", "one", "our", "out", "she", "should", "some", "than", "that",
    "the", "their", "them", "then", "there", "these", "they", "this", "too", "very", "was",
    "were", "what", "when", "where", "which", "who", "why", "will", "with", "would", "you",
    "your",
];

const STOPWORDS_FR: &[&str] = &[
    "aux", "avec", "ces", "cette", "dans", "des", "elle", "est", "été", "était", "fait", "ils",
    "les", "leur", "mais", "mes", "mon", "nous", "par", "pas", "plus", "pour", "qui", "que",
    "quoi", "sans", "ses", "son", "sont", "sur", "une", "vos", "votre", "vous",
];

static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    STOPWORDS_EN
        .iter()
        .chain(STOPWORDS_FR.iter())
        .copied()
        .collect()
});

/// FTS5 has no stopword support; terms shorter than three characters and
/// common function words are dropped here.
pub fn is_significant(term: &str) -> bool {
    term.chars().count() >= 3 && !STOPWORDS.contains(term)
}

/// Frequencies of one indexed term within a set of comments.
#[derive(Debug, Clone, PartialEq)]
pub struct TermStats {
    pub term: String,
    /// Occurrences across the set.
    pub occurrences: i64,
    /// Comments of the set containing the term.
    pub documents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordScore {
    pub word: String,
    pub count: i64,
    pub score: f64,
}

fn idf(documents: i64, total: usize) -> f64 {
    ((total as f64 + 1.0) / (documents as f64 + 1.0)).ln() + 1.0
}

/// Most significant words of a set of `total` comments: occurrences
/// weighted by smoothed inverse document frequency, ties broken by word.
pub fn top_words(stats: Vec<TermStats>, total: usize, limit: usize) -> Vec<WordScore> {
    let mut words: Vec<WordScore> = stats
        .into_iter()
        .filter(|s| is_significant(&s.term))
        .map(|s| WordScore {
            score: s.occurrences as f64 * idf(s.documents, total),
            word: s.term,
            count: s.occurrences,
        })
        .collect();
    words.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.word.cmp(&b.word))
    });
    words.truncate(limit);
    words
}

/// An FTS5 `MATCH` expression matching any of `words`, or `None` when there
/// is nothing to match.
pub fn match_query(words: &[WordScore]) -> Option<String> {
    if words.is_empty() {
        return None;
    }
    let terms: Vec<String> = words
        .iter()
        .map(|w| format!("\"{}\"", w.word.replace('"', "\"\"")))
        .collect();
    Some(terms.join(" OR "))
}
