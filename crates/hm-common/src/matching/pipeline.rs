use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument};

use super::scoring::{MatchScore, RankingConfig, ScoringEngine};
use crate::{Candidate, Query};

pub const DEFAULT_MAX_RESULTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
    pub breakdown: MatchScore,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankError {
    #[error("max results must be a positive integer")]
    InvalidLimit,
}

pub struct RankingEngine {
    scoring: ScoringEngine,
}

impl Default for RankingEngine {
    fn default() -> Self {
        Self::new(RankingConfig::default())
    }
}

impl RankingEngine {
    pub fn new(config: RankingConfig) -> Self {
        Self {
            scoring: ScoringEngine::new(config),
        }
    }

    pub fn config(&self) -> &RankingConfig {
        self.scoring.config()
    }

    /// Scores every candidate against one `now` snapshot and returns the best `max`.
    ///
    /// Candidates are scored in parallel; equal scores keep their input order.
    /// Only the returned entries are cloned, the input slice is never modified.
    #[instrument(skip_all, fields(pool = candidates.len(), max = max))]
    pub fn rank(
        &self,
        candidates: &[Candidate],
        query: &Query,
        max: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredCandidate>, RankError> {
        if max == 0 {
            return Err(RankError::InvalidLimit);
        }

        // indexed parallel iterators collect in input order
        let mut scored: Vec<(usize, MatchScore)> = candidates
            .par_iter()
            .enumerate()
            .map(|(index, candidate)| {
                (index, self.scoring.calculate_match_score(candidate, query, now))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total.partial_cmp(&a.1.total).unwrap_or(Ordering::Equal));
        scored.truncate(max);

        let ranked: Vec<ScoredCandidate> = scored
            .into_iter()
            .map(|(index, breakdown)| ScoredCandidate {
                candidate: candidates[index].clone(),
                score: breakdown.total,
                breakdown,
            })
            .collect();

        debug!(
            returned = ranked.len(),
            top_score = ranked.first().map(|r| r.score),
            "ranked candidates"
        );

        Ok(ranked)
    }
}

/// Functional entry point over a one-off engine.
pub fn rank(
    candidates: &[Candidate],
    query: &Query,
    max: usize,
    now: DateTime<Utc>,
    config: &RankingConfig,
) -> Result<Vec<ScoredCandidate>, RankError> {
    RankingEngine::new(config.clone()).rank(candidates, query, max, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
    }

    fn base_candidate(id: &str) -> Candidate {
        Candidate {
            id: id.into(),
            trade: "plumber".into(),
            specialties: "leak,pipe".into(),
            district_coverage: "Kwun Tong, Sha Tin".into(),
            languages: "zh-HK,en".into(),
            source: "offline-word-of-mouth".into(),
            rating_avg: "4.0".into(),
            last_active: (now() - Duration::days(10)).to_rfc3339(),
            ..Candidate::default()
        }
    }

    fn query() -> Query {
        Query::for_trade("plumber")
            .with_district("Kwun Tong")
            .with_language("zh-HK")
    }

    fn ids(ranked: &[ScoredCandidate]) -> Vec<&str> {
        ranked.iter().map(|r| r.candidate.id.as_str()).collect()
    }

    #[test]
    fn empty_pool_returns_empty() {
        let ranked = RankingEngine::default().rank(&[], &query(), 5, now()).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn zero_max_is_rejected() {
        let result = RankingEngine::default().rank(&[base_candidate("a")], &query(), 0, now());
        assert_eq!(result, Err(RankError::InvalidLimit));
    }

    #[test]
    fn ranks_by_score_descending() {
        let mut electrician = base_candidate("electrician");
        electrician.trade = "electrician".into();
        let mut far_away = base_candidate("far");
        far_away.district_coverage = "Tuen Mun".into();
        let best = base_candidate("best");

        let ranked = RankingEngine::default()
            .rank(&[electrician, far_away, best], &query(), 5, now())
            .unwrap();

        assert_eq!(ids(&ranked), vec!["best", "far", "electrician"]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn truncates_to_max_and_returns_all_when_pool_is_smaller() {
        let pool: Vec<_> = (0..8).map(|i| base_candidate(&format!("c{i}"))).collect();
        let engine = RankingEngine::default();

        assert_eq!(engine.rank(&pool, &query(), 3, now()).unwrap().len(), 3);
        assert_eq!(engine.rank(&pool, &query(), 8, now()).unwrap().len(), 8);
        assert_eq!(engine.rank(&pool, &query(), 50, now()).unwrap().len(), 8);
    }

    #[test]
    fn ties_keep_input_order() {
        let pool: Vec<_> = ["d", "a", "c", "b"].iter().map(|id| base_candidate(id)).collect();
        let engine = RankingEngine::default();

        let first = engine.rank(&pool, &query(), 4, now()).unwrap();
        let second = engine.rank(&pool, &query(), 4, now()).unwrap();

        assert_eq!(ids(&first), vec!["d", "a", "c", "b"]);
        assert_eq!(first, second);
    }

    #[test]
    fn recent_activity_never_ranks_below_stale() {
        let mut stale = base_candidate("stale");
        stale.last_active = (now() - Duration::days(200)).to_rfc3339();
        let mut fresh = base_candidate("fresh");
        fresh.last_active = (now() - Duration::days(90)).to_rfc3339();

        let ranked = RankingEngine::default()
            .rank(&[stale, fresh], &query(), 2, now())
            .unwrap();

        assert_eq!(ids(&ranked), vec!["fresh", "stale"]);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn input_is_left_untouched() {
        let pool = vec![base_candidate("a"), base_candidate("b")];
        let snapshot = pool.clone();

        let ranked = rank(&pool, &query(), 1, now(), &RankingConfig::default()).unwrap();

        assert_eq!(pool, snapshot);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].candidate, snapshot[0]);
        assert_eq!(ranked[0].score, ranked[0].breakdown.total);
    }

    #[test]
    fn matches_reference_score() {
        let mut candidate = base_candidate("ref");
        candidate.rating_avg = "4.5".into();

        let ranked = RankingEngine::default()
            .rank(&[candidate], &query(), DEFAULT_MAX_RESULTS, now())
            .unwrap();

        assert!((ranked[0].score - 0.94).abs() < 0.001);
    }
}
