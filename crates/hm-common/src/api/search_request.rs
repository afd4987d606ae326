use serde::Deserialize;

use crate::{Query, normalize::non_blank};

/// Query-string parameters of a handyman search.
///
/// `max` stays textual so that a malformed value is reported as a contract
/// violation instead of being rejected by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub trade: Option<String>,
    pub district: Option<String>,
    pub language: Option<String>,
    pub subcategory: Option<String>,
    pub max: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchRequestError {
    #[error("max must be a positive integer (got {0:?})")]
    InvalidMax(String),
}

impl SearchRequest {
    /// Trims every field and drops the ones left blank.
    pub fn to_query(&self) -> Query {
        let keep = |value: &Option<String>| non_blank(value.as_deref()).map(str::to_string);

        Query {
            trade: keep(&self.trade),
            subcategory: keep(&self.subcategory),
            district: keep(&self.district),
            language: keep(&self.language),
        }
    }

    /// Resolves `max`: absent or blank means `default`, values above `ceiling` are
    /// clamped, and anything that is not a positive integer is an error.
    pub fn limit(&self, default: usize, ceiling: usize) -> Result<usize, SearchRequestError> {
        let Some(raw) = non_blank(self.max.as_deref()) else {
            return Ok(default.min(ceiling));
        };

        match raw.parse::<usize>() {
            Ok(0) | Err(_) => Err(SearchRequestError::InvalidMax(raw.to_string())),
            Ok(max) => Ok(max.min(ceiling)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(max: Option<&str>) -> SearchRequest {
        SearchRequest {
            max: max.map(str::to_string),
            ..SearchRequest::default()
        }
    }

    #[test]
    fn absent_max_uses_default() {
        assert_eq!(request(None).limit(5, 100), Ok(5));
        assert_eq!(request(Some(" ")).limit(5, 100), Ok(5));
    }

    #[test]
    fn max_is_clamped_to_ceiling() {
        assert_eq!(request(Some("3")).limit(5, 100), Ok(3));
        assert_eq!(request(Some("1000")).limit(5, 100), Ok(100));
    }

    #[test]
    fn non_positive_or_garbled_max_is_rejected() {
        for raw in ["0", "-1", "ten", "2.5"] {
            assert_eq!(
                request(Some(raw)).limit(5, 100),
                Err(SearchRequestError::InvalidMax(raw.to_string()))
            );
        }
    }

    #[test]
    fn blank_optional_fields_are_dropped() {
        let request = SearchRequest {
            trade: Some("plumber".into()),
            district: Some("".into()),
            language: Some("  ".into()),
            subcategory: Some(" leak ".into()),
            max: None,
        };

        let query = request.to_query();
        assert_eq!(query.trade.as_deref(), Some("plumber"));
        assert_eq!(query.district, None);
        assert_eq!(query.language, None);
        assert_eq!(query.subcategory.as_deref(), Some("leak"));
    }

    #[test]
    fn trade_is_trimmed_like_other_fields() {
        let padded = SearchRequest {
            trade: Some("plumber ".into()),
            ..SearchRequest::default()
        };
        let blank = SearchRequest {
            trade: Some("   ".into()),
            ..SearchRequest::default()
        };

        assert_eq!(padded.to_query().trade.as_deref(), Some("plumber"));
        assert_eq!(blank.to_query().trade, None);
    }
}
