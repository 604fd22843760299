//! Semantic retrieval: embedding providers and cosine KNN.

pub mod embed;
pub mod local;
pub mod remote;
pub mod search;

pub use embed::{EmbedError, Embedder, EmbeddingGateway, RetryPolicy, configured_model_id};
pub use local::HashedEmbedder;
pub use remote::OpenAiEmbeddingClient;
pub use search::{cosine_similarity, knn_search};
