use serde::{Deserialize, Serialize};

use crate::normalize::parse_rating;

const RATING_MIN: f64 = 1.0;
const RATING_SPAN: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Provenance tag that earns the trusted base score.
    pub trusted_source: String,
    pub trusted_base: f64,
    pub untrusted_base: f64,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            trusted_source: crate::OFFLINE_WORD_OF_MOUTH.to_string(),
            trusted_base: 1.0,
            untrusted_base: 0.4,
        }
    }
}

/// Rescales a 1..=5 rating onto [0, 1]; out-of-range ratings are clamped.
pub fn rating_to_unit(rating: f64) -> f64 {
    ((rating - RATING_MIN) / RATING_SPAN).clamp(0.0, 1.0)
}

/// Base trust from provenance, averaged with the rescaled rating when one parses.
///
/// An unparsable rating leaves the base value untouched.
pub fn trust_score(source: &str, rating_avg: &str, config: &TrustConfig) -> f64 {
    let base = if source == config.trusted_source {
        config.trusted_base
    } else {
        config.untrusted_base
    };

    match parse_rating(rating_avg) {
        Some(rating) => (base + rating_to_unit(rating)) / 2.0,
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_of_mouth_with_rating_blends() {
        let score = trust_score("offline-word-of-mouth", "4.5", &TrustConfig::default());
        assert!((score - 0.9375).abs() < 1e-9);
    }

    #[test]
    fn other_source_without_rating_keeps_base() {
        let config = TrustConfig::default();
        assert_eq!(trust_score("web-form", "", &config), 0.4);
        assert_eq!(trust_score("web-form", "unknown", &config), 0.4);
        assert_eq!(trust_score("offline-word-of-mouth", "", &config), 1.0);
    }

    #[test]
    fn whitespace_rating_is_absent_not_zero() {
        let config = TrustConfig::default();
        assert_eq!(trust_score("offline-word-of-mouth", "   ", &config), 1.0);
        assert_eq!(trust_score("offline-word-of-mouth", "\t", &config), 1.0);
        assert_eq!(trust_score("web-form", " ", &config), 0.4);
        // an explicit lowest rating does blend
        assert_eq!(trust_score("offline-word-of-mouth", "1", &config), 0.5);
    }

    #[test]
    fn source_match_is_exact() {
        let config = TrustConfig::default();
        assert_eq!(trust_score("Offline-Word-Of-Mouth", "", &config), 0.4);
    }

    #[test]
    fn out_of_range_ratings_stay_bounded() {
        let config = TrustConfig::default();
        assert_eq!(trust_score("web-form", "0", &config), 0.2);
        assert_eq!(trust_score("offline-word-of-mouth", "9", &config), 1.0);
        assert_eq!(rating_to_unit(1.0), 0.0);
        assert_eq!(rating_to_unit(5.0), 1.0);
    }
}
