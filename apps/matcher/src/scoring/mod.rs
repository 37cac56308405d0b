// Embedding-based resume scoring and best-of-N resume improvement.
// Keyword extraction and cosine similarity are pure; generation and embedding
// go through the llm_client capability traits.

pub mod improvement;
pub mod keywords;
pub mod prompts;
pub mod similarity;

pub use improvement::{ResumeImprover, ResumeScorer, ScoringResult};
pub use keywords::extract_keywords;
pub use similarity::{cosine_similarity, EmbeddingComparator};
