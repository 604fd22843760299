//! Reciprocal Rank Fusion (RRF).
//!
//! ```text
//! rrf_score(d) = sum over rankings i containing d of 1 / (k + rank_i(d))
//! ```
//!
//! - ranks are 1-based; an article absent from a ranking gets nothing from it
//! - only ranks matter, never the source scores, so BM25 and cosine values
//!   never need to be made comparable
//! - output is sorted by descending score, ties by ascending article id
//!
//! An article's contributions are summed smallest-first, which makes the
//! result bit-identical under any permutation of the input rankings.

use std::collections::BTreeMap;

use scoop_core::{ArticleId, FusedCandidate, RankedCandidate};

/// Standard RRF constant.
pub const DEFAULT_RRF_K: usize = 60;

/// Source name of the embedding ranking.
pub const SEMANTIC_SOURCE: &str = "semantic";

/// Source name of the BM25 ranking.
pub const LEXICAL_SOURCE: &str = "lexical";

#[derive(Default)]
struct Accumulator {
    contributions: Vec<f64>,
    source_ranks: BTreeMap<String, usize>,
}

/// Fuse named rankings with RRF.
///
/// If an article appears more than once in the same ranking, its best rank
/// is used. The output is not truncated.
///
/// # Example
///
/// ```
/// use scoop_core::{ArticleId, RankedCandidate};
/// use scoop_search::fusion::rrf_fuse;
///
/// let hit = |id: &str, rank| RankedCandidate {
///     article_id: ArticleId::new_unchecked(id),
///     rank,
///     score: 0.0,
/// };
/// let semantic = vec![hit("a", 1), hit("b", 2)];
/// let lexical = vec![hit("b", 1)];
/// let fused = rrf_fuse(
///     &[("semantic", semantic.as_slice()), ("lexical", lexical.as_slice())],
///     60,
/// );
/// assert_eq!(fused[0].article_id.as_str(), "b");
/// ```
#[must_use]
pub fn rrf_fuse(rankings: &[(&str, &[RankedCandidate])], k: usize) -> Vec<FusedCandidate> {
    let mut per_source: BTreeMap<(&ArticleId, &str), usize> = BTreeMap::new();
    for (source, ranking) in rankings {
        for candidate in *ranking {
            per_source
                .entry((&candidate.article_id, *source))
                .and_modify(|rank| *rank = (*rank).min(candidate.rank))
                .or_insert(candidate.rank);
        }
    }

    let mut by_article: BTreeMap<&ArticleId, Accumulator> = BTreeMap::new();
    for ((article_id, source), rank) in per_source {
        let entry = by_article.entry(article_id).or_default();
        entry.contributions.push(1.0 / (k as f64 + rank as f64));
        entry.source_ranks.insert(source.to_string(), rank);
    }

    let mut fused: Vec<FusedCandidate> = by_article
        .into_iter()
        .map(|(article_id, mut acc)| {
            acc.contributions.sort_by(f64::total_cmp);
            FusedCandidate {
                article_id: article_id.clone(),
                rrf_score: acc.contributions.iter().sum(),
                source_ranks: acc.source_ranks,
            }
        })
        .collect();

    fused.sort_by(|a, b| {
        b.rrf_score
            .total_cmp(&a.rrf_score)
            .then_with(|| a.article_id.cmp(&b.article_id))
    });
    fused
}
