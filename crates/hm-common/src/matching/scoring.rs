use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    recency::{RecencyConfig, recency_score},
    trust::{TrustConfig, trust_score},
    weights::{Weights, WeightsError},
};
use crate::{
    Candidate, Query,
    normalize::{contains_ci, non_blank, split_list},
};

const SUBCATEGORY_BONUS: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    pub weights: Weights,
    /// Language used when the query does not name one.
    pub default_language: String,
    pub trust: TrustConfig,
    pub recency: RecencyConfig,
    /// Constant PriceFit value until budgets are compared against price ranges.
    pub neutral_price_fit: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid weight table: {0}")]
    Weights(#[from] WeightsError),
    #[error("neutral_price_fit must be within [0, 1] (got {0})")]
    PriceFitOutOfRange(f64),
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            default_language: crate::DEFAULT_LANGUAGE.to_string(),
            trust: TrustConfig::default(),
            recency: RecencyConfig::default(),
            neutral_price_fit: 0.5,
        }
    }
}

impl RankingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        if !(0.0..=1.0).contains(&self.neutral_price_fit) {
            return Err(ConfigError::PriceFitOutOfRange(self.neutral_price_fit));
        }
        Ok(())
    }

    /// Reads weight overrides plus `HM_DEFAULT_LANGUAGE` and `HM_TRUSTED_SOURCE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            weights: Weights::from_env(),
            ..Self::default()
        };

        if let Some(language) = env_non_blank("HM_DEFAULT_LANGUAGE") {
            config.default_language = language;
        }
        if let Some(source) = env_non_blank("HM_TRUSTED_SOURCE") {
            config.trust.trusted_source = source;
        }

        config.validate()?;
        Ok(config)
    }
}

fn env_non_blank(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringResult {
    /// Sub-score clamped to [0, 1]; this is what gets weighted.
    pub score: f64,
    /// Value before clamping. Expertise can reach 1.5 here.
    pub raw_score: f64,
    pub max_score: f64,
    pub status: &'static str,
    pub details: String,
}

impl ScoringResult {
    fn new(raw: f64, status: &'static str, details: impl Into<String>) -> Self {
        Self {
            score: clamp_unit(raw),
            raw_score: raw,
            max_score: 1.0,
            status,
            details: details.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchScore {
    pub total: f64,
    pub expertise: ScoringResult,
    pub coverage: ScoringResult,
    pub language: ScoringResult,
    pub trust: ScoringResult,
    pub recency: ScoringResult,
    pub price_fit: ScoringResult,
}

/// Single score for one candidate against one query at `now`.
pub fn score(
    candidate: &Candidate,
    query: &Query,
    now: DateTime<Utc>,
    config: &RankingConfig,
) -> f64 {
    ScoringEngine::new(config.clone())
        .calculate_match_score(candidate, query, now)
        .total
}

pub struct ScoringEngine {
    config: RankingConfig,
}

impl ScoringEngine {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Weighted sum of the six sub-scores, each clamped to [0, 1] beforehand.
    pub fn calculate_match_score(
        &self,
        candidate: &Candidate,
        query: &Query,
        now: DateTime<Utc>,
    ) -> MatchScore {
        let expertise = self.score_expertise(candidate, query);
        let coverage = self.score_coverage(candidate, query);
        let language = self.score_language(candidate, query);
        let trust = self.score_trust(candidate);
        let recency = self.score_recency(candidate, now);
        let price_fit = self.score_price_fit(candidate, query);

        let weights = self.config.weights;
        let total = expertise.score * weights.expertise
            + coverage.score * weights.coverage
            + language.score * weights.language
            + trust.score * weights.trust
            + recency.score * weights.recency
            + price_fit.score * weights.price_fit;

        MatchScore {
            total: clamp_unit(total),
            expertise,
            coverage,
            language,
            trust,
            recency,
            price_fit,
        }
    }

    fn score_expertise(&self, candidate: &Candidate, query: &Query) -> ScoringResult {
        let query_trade = query.trade.as_deref().filter(|t| !t.trim().is_empty());
        let trade_match = query_trade == Some(candidate.trade.as_str());
        let subcategory_match = query
            .subcategory
            .as_deref()
            .is_some_and(|sub| contains_ci(&candidate.specialties, sub));

        let raw = if trade_match { 1.0 } else { 0.0 }
            + if subcategory_match { SUBCATEGORY_BONUS } else { 0.0 };

        let (status, details) = match (trade_match, subcategory_match) {
            (true, true) => (
                "PERFECT_MATCH",
                format!("trade and specialty match: {}", candidate.trade),
            ),
            (true, false) => ("MATCH", format!("trade match: {}", candidate.trade)),
            (false, true) => ("PARTIAL_MATCH", "specialty match only".to_string()),
            (false, false) if query_trade.is_none() => {
                ("UNKNOWN", "query names no trade".to_string())
            }
            (false, false) => ("MISS", format!("trade mismatch: {}", candidate.trade)),
        };

        ScoringResult::new(raw, status, details)
    }

    fn score_coverage(&self, candidate: &Candidate, query: &Query) -> ScoringResult {
        let Some(district) = non_blank(query.district.as_deref()) else {
            return ScoringResult::new(0.0, "UNKNOWN", "query names no district");
        };

        let district = district.to_lowercase();
        let covered = split_list(&candidate.district_coverage);
        if covered.iter().any(|d| *d == district) {
            ScoringResult::new(1.0, "MATCH", format!("covers {district}"))
        } else {
            ScoringResult::new(
                0.0,
                "MISS",
                format!("{district} not in {} covered district(s)", covered.len()),
            )
        }
    }

    /// Case-insensitive containment, so `zh-hk` and `ZH-HK` both match a `zh-HK` listing.
    fn score_language(&self, candidate: &Candidate, query: &Query) -> ScoringResult {
        let language =
            non_blank(query.language.as_deref()).unwrap_or(self.config.default_language.as_str());

        if contains_ci(&candidate.languages, language) {
            ScoringResult::new(1.0, "MATCH", format!("speaks {language}"))
        } else {
            ScoringResult::new(0.0, "MISS", format!("does not list {language}"))
        }
    }

    fn score_trust(&self, candidate: &Candidate) -> ScoringResult {
        let score = trust_score(&candidate.source, &candidate.rating_avg, &self.config.trust);
        let status = status_from_score(score);
        let details = if candidate.source == self.config.trust.trusted_source {
            format!("verified referral, rating {:?}", candidate.rating_avg)
        } else {
            format!("source {:?}, rating {:?}", candidate.source, candidate.rating_avg)
        };

        ScoringResult::new(score, status, details)
    }

    fn score_recency(&self, candidate: &Candidate, now: DateTime<Utc>) -> ScoringResult {
        let score = recency_score(&candidate.last_active, now, &self.config.recency);
        let status = if candidate.last_active.trim().is_empty() {
            "UNKNOWN"
        } else {
            status_from_score(score)
        };

        ScoringResult::new(score, status, format!("last active {:?}", candidate.last_active))
    }

    // Extension point: compare a query budget to `candidate.price_range` here.
    fn score_price_fit(&self, _candidate: &Candidate, _query: &Query) -> ScoringResult {
        ScoringResult::new(
            self.config.neutral_price_fit,
            "UNKNOWN",
            "price fit not evaluated; neutral score",
        )
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn status_from_score(score: f64) -> &'static str {
    if score >= 0.9 {
        "PERFECT_MATCH"
    } else if score >= 0.7 {
        "MATCH"
    } else if score >= 0.4 {
        "PARTIAL_MATCH"
    } else {
        "MISS"
    }
}
