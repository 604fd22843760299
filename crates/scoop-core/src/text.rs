//! Text clean-up and the shared normalization used by the lexical index.
//!
//! The full-text index column and every lexical query are produced by
//! [`normalize_terms`]. Stemming happens afterwards inside FTS5 (Porter), so
//! index terms and query terms go through exactly the same pipeline.

use regex::Regex;
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Maximum number of distinct terms sent to FTS5 for one query.
pub const MAX_QUERY_TERMS: usize = 64;

/// Tokens shorter than this (in chars) are dropped.
const MIN_TERM_CHARS: usize = 2;

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few",
    "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "however", "if", "in", "into", "is", "it", "its",
    "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of",
    "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own",
    "said", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those", "through",
    "to", "too", "under", "until", "up", "very", "was", "we", "were", "what", "when", "where",
    "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
    "yourself", "yourselves",
];

/// Collapse runs of whitespace into single spaces and trim the ends.
#[must_use]
pub fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Bracketed numeric citation markers such as `[12]`.
static CITATION_MARKER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\[\d+\]").ok());

/// Markdown `*italic*` and `**bold**` spans; the span text is kept.
static EMPHASIS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\*{1,2}(.+?)\*{1,2}").ok());

fn replace_all<'a>(pattern: &LazyLock<Option<Regex>>, input: &'a str, with: &str) -> Cow<'a, str> {
    match LazyLock::force(pattern) {
        Some(re) => re.replace_all(input, with),
        None => Cow::Borrowed(input),
    }
}

/// Clean raw feed text before it is stored or assessed.
///
/// Removes wrapping quotes and bracketed citation markers such as `[12]`,
/// unwraps markdown emphasis spans, then collapses whitespace. A lone `*`
/// outside an emphasis pair is kept.
#[must_use]
pub fn clean_article_text(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('"').trim();
    let without_citations = replace_all(&CITATION_MARKER, trimmed, "");
    let without_emphasis = replace_all(&EMPHASIS, &without_citations, "$1");
    normalize_whitespace(&without_emphasis)
}

fn is_stopword(term: &str) -> bool {
    STOPWORDS.binary_search(&term).is_ok()
}

/// Case-fold, strip punctuation, and drop stopwords and one-char tokens.
///
/// Returns terms in their original order, duplicates included.
#[must_use]
pub fn normalize_terms(input: &str) -> Vec<String> {
    input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|tok| !tok.is_empty())
        .map(str::to_lowercase)
        .filter(|tok| tok.chars().count() >= MIN_TERM_CHARS && !is_stopword(tok))
        .collect()
}

/// Content of the FTS5 `search_text` column for an article.
#[must_use]
pub fn index_text(input: &str) -> String {
    normalize_terms(input).join(" ")
}

/// Build an FTS5 `MATCH` expression from free text.
///
/// Terms are deduplicated in order of first appearance, capped at
/// [`MAX_QUERY_TERMS`], quoted, and OR-combined so that BM25 ranks partial
/// overlap. Returns `None` when nothing survives normalization.
#[must_use]
pub fn build_match_query(input: &str) -> Option<String> {
    let mut seen = HashSet::new();
    let terms: Vec<String> = normalize_terms(input)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .take(MAX_QUERY_TERMS)
        .map(|t| format!("\"{t}\""))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// Keep the leading `max_tokens` whitespace-delimited tokens of `input`.
#[must_use]
pub fn truncate_leading_tokens(input: &str, max_tokens: usize) -> String {
    input
        .split_whitespace()
        .take(max_tokens)
        .collect::<Vec<&str>>()
        .join(" ")
}

/// First `max_chars` characters of `input`, with an ellipsis when cut.
#[must_use]
pub fn excerpt(input: &str, max_chars: usize) -> String {
    let mut chars = input.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopword_table_is_sorted_for_binary_search() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn clean_article_text_strips_markers() {
        let raw = "  \"The **club** confirmed[1] the  *signing* [23] today.\" ";
        assert_eq!(
            clean_article_text(raw),
            "The club confirmed the signing today."
        );
    }

    #[test]
    fn clean_article_text_keeps_unpaired_asterisks() {
        assert_eq!(clean_article_text("Final score 5 * 3 = 15"), "Final score 5 * 3 = 15");
        assert_eq!(
            clean_article_text("A *bold* claim and a footnote*"),
            "A bold claim and a footnote*"
        );
    }

    #[test]
    fn clean_article_text_keeps_non_numeric_brackets() {
        assert_eq!(clean_article_text("see [note] and [4a]"), "see [note] and [4a]");
    }

    #[test]
    fn normalize_terms_case_folds_and_strips_punctuation() {
        let terms = normalize_terms("Bergvall's ANKLE-sprain, (63 minutes)!");
        assert_eq!(terms, vec!["bergvall", "ankle", "sprain", "63", "minutes"]);
    }

    #[test]
    fn normalize_terms_drops_stopwords_and_single_chars() {
        let terms = normalize_terms("The manager said that a deal is close");
        assert_eq!(terms, vec!["manager", "deal", "close"]);
    }

    #[test]
    fn normalize_terms_handles_unicode_case() {
        assert_eq!(normalize_terms("ÖDEGAARD Müller"), vec!["ödegaard", "müller"]);
    }

    #[test]
    fn build_match_query_dedups_and_quotes() {
        let q = build_match_query("Transfer transfer TRANSFER fee").unwrap();
        assert_eq!(q, "\"transfer\" OR \"fee\"");
    }

    #[test]
    fn build_match_query_never_leaks_fts_syntax() {
        let q = build_match_query("auth* \"quoted\" (paren) NEAR/3 col:val").unwrap();
        for bad in ['*', '(', ')', ':', '/'] {
            assert!(!q.contains(bad), "query leaked {bad}: {q}");
        }
    }

    #[test]
    fn build_match_query_caps_terms() {
        let text: String = (0..200).map(|i| format!("term{i} ")).collect();
        let q = build_match_query(&text).unwrap();
        assert_eq!(q.split(" OR ").count(), MAX_QUERY_TERMS);
    }

    #[test]
    fn build_match_query_empty_when_only_stopwords() {
        assert!(build_match_query("the and of a").is_none());
        assert!(build_match_query("  ...  ").is_none());
    }

    #[test]
    fn index_text_and_query_share_normalization() {
        let raw = "Spurs' midfielder, INJURED!";
        let indexed = index_text(raw);
        let query = build_match_query(raw).unwrap();
        for term in indexed.split(' ') {
            assert!(query.contains(&format!("\"{term}\"")));
        }
    }

    #[test]
    fn truncate_leading_tokens_keeps_prefix() {
        assert_eq!(truncate_leading_tokens("a  b\nc d", 3), "a b c");
        assert_eq!(truncate_leading_tokens("a b", 10), "a b");
    }

    #[test]
    fn excerpt_marks_truncation() {
        assert_eq!(excerpt("abcdef", 3), "abc...");
        assert_eq!(excerpt("abc", 3), "abc");
    }

    proptest::proptest! {
        #[test]
        fn match_query_terms_are_quoted_single_tokens(input in "\\PC{0,200}") {
            if let Some(q) = build_match_query(&input) {
                for term in q.split(" OR ") {
                    proptest::prop_assert!(term.len() >= 2);
                    proptest::prop_assert!(term.starts_with('"') && term.ends_with('"'));
                    let inner = &term[1..term.len() - 1];
                    proptest::prop_assert!(!inner.is_empty());
                    proptest::prop_assert!(!inner.contains('"'));
                    proptest::prop_assert!(!inner.chars().any(char::is_whitespace));
                }
            }
        }
    }
}
