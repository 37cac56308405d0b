// Structured matching: 22-variable extraction, statistical comparison, reporting.
// All collaborator calls go through the llm_client capability traits.

pub mod analysis;
pub mod extraction;
pub mod power;
pub mod prompts;
pub mod statistics;
pub mod taxonomy;

pub use analysis::{run_matching_analysis, MatchReport, MatchRequest};
pub use statistics::{compare, MatchingResult};
pub use taxonomy::{CategoryWeights, StructuredProfile};
