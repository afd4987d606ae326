use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    Candidate,
    matching::{MatchScore, ScoredCandidate},
};

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub ranked_at: DateTime<Utc>,
}

/// One ranked provider: the candidate's own fields plus its score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub candidate: Candidate,
    #[serde(rename = "_score")]
    pub score: f64,
    pub score_breakdown: ScoreBreakdown,
}

/// Per-term sub-scores (each 0.0..=1.0, before weighting).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub expertise: f64,
    pub coverage: f64,
    pub language: f64,
    pub trust: f64,
    pub recency: f64,
    pub price_fit: f64,
}

impl From<&MatchScore> for ScoreBreakdown {
    fn from(value: &MatchScore) -> Self {
        Self {
            expertise: value.expertise.score,
            coverage: value.coverage.score,
            language: value.language.score,
            trust: value.trust.score,
            recency: value.recency.score,
            price_fit: value.price_fit.score,
        }
    }
}

impl From<ScoredCandidate> for SearchResult {
    fn from(value: ScoredCandidate) -> Self {
        Self {
            score_breakdown: ScoreBreakdown::from(&value.breakdown),
            score: value.score,
            candidate: value.candidate,
        }
    }
}

impl SearchResponse {
    pub fn from_ranked(ranked: Vec<ScoredCandidate>, ranked_at: DateTime<Utc>) -> Self {
        Self {
            results: ranked.into_iter().map(SearchResult::from).collect(),
            ranked_at,
        }
    }
}
