pub mod api;
pub mod logging;
pub mod matching;
pub mod normalize;
pub mod run_id;
pub mod source;

use serde::{Deserialize, Deserializer, Serialize};

/// Provenance tag for referrals collected and verified by word of mouth.
pub const OFFLINE_WORD_OF_MOUTH: &str = "offline-word-of-mouth";

/// Default locale used when a query does not name a language.
pub const DEFAULT_LANGUAGE: &str = "zh-HK";

// Service provider record as delivered by the candidate source.
// Every field is raw text; parsing happens in `normalize` at scoring time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Candidate {
    #[serde(deserialize_with = "cell")]
    pub id: String,
    #[serde(deserialize_with = "cell")]
    pub name: String,
    #[serde(deserialize_with = "cell")]
    pub phone: String,
    #[serde(deserialize_with = "cell")]
    pub whatsapp: String,
    #[serde(deserialize_with = "cell")]
    pub trade: String,
    #[serde(deserialize_with = "cell")]
    pub specialties: String,
    #[serde(alias = "districtCoverage", deserialize_with = "cell")]
    pub district_coverage: String,
    #[serde(deserialize_with = "cell")]
    pub languages: String,
    #[serde(alias = "yearsExperience", deserialize_with = "cell")]
    pub years_experience: String,
    #[serde(deserialize_with = "cell")]
    pub availability: String,
    #[serde(alias = "priceRange", deserialize_with = "cell")]
    pub price_range: String,
    #[serde(deserialize_with = "cell")]
    pub source: String,
    #[serde(alias = "ratingAvg", deserialize_with = "cell")]
    pub rating_avg: String,
    #[serde(alias = "ratingCount", deserialize_with = "cell")]
    pub rating_count: String,
    #[serde(alias = "lastActive", deserialize_with = "cell")]
    pub last_active: String,
    #[serde(deserialize_with = "cell")]
    pub notes: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCell {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

/// Accepts text, numbers, booleans or null and keeps the cell as text.
fn cell<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawCell>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawCell::Text(text)) => text,
        Some(RawCell::Number(number)) => number.to_string(),
        Some(RawCell::Flag(flag)) => flag.to_string(),
        None => String::new(),
    })
}

/// A single sheet cell read leniently as text, see [`cell`].
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CellText(String);

impl<'de> Deserialize<'de> for CellText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        cell(deserializer).map(CellText)
    }
}

impl AsRef<str> for CellText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Matching criteria for one ranking request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    pub trade: Option<String>,
    pub subcategory: Option<String>,
    pub district: Option<String>,
    pub language: Option<String>,
}

impl Query {
    pub fn for_trade(trade: impl Into<String>) -> Self {
        Self {
            trade: Some(trade.into()),
            ..Self::default()
        }
    }

    pub fn with_district(mut self, district: impl Into<String>) -> Self {
        self.district = Some(district.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }
}
