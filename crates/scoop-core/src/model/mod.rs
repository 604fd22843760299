//! Domain types shared by the store, the searchers, and the novelty pipeline.
//!
//! Articles and verdicts are durable and owned by the store. Ranked, fused,
//! and reranked candidates live for the duration of one pipeline request.

mod article;
mod candidate;
mod verdict;

pub use article::{Article, ArticleId, IncomingArticle};
pub use candidate::{FusedCandidate, RankedCandidate, RerankedCandidate};
pub use verdict::{Label, NoveltyVerdict, TopMatch};
