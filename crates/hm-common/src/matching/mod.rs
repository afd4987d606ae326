pub mod pipeline;
pub mod recency;
pub mod scoring;
pub mod trust;
pub mod weights;

pub use pipeline::{DEFAULT_MAX_RESULTS, RankError, RankingEngine, ScoredCandidate, rank};
pub use scoring::{ConfigError, MatchScore, RankingConfig, ScoringEngine, ScoringResult, score};
pub use weights::{DEFAULT_WEIGHTS, Weights, WeightsError};
