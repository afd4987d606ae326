//! Candidate sources.
//!
//! The ranking engine never performs I/O. A source produces the full candidate
//! pool before ranking starts, mapping whatever record shape it reads into
//! [`Candidate`].

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::{Candidate, CellText};

/// Column layout of the provider sheet (data rows start below the header row).
pub const CANDIDATE_COLUMNS: [&str; 16] = [
    "id",
    "name",
    "phone",
    "whatsapp",
    "trade",
    "specialties",
    "district_coverage",
    "languages",
    "years_experience",
    "availability",
    "price_range",
    "source",
    "rating_avg",
    "rating_count",
    "last_active",
    "notes",
];

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read candidates from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid candidate data in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub trait CandidateSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Loads the current pool. Called once per ranking request.
    fn load(&self) -> Result<Vec<Candidate>, SourceError>;
}

/// Maps one positional row onto a candidate. Missing cells become empty
/// strings and cells past the last known column are ignored.
pub fn candidate_from_row<S: AsRef<str>>(row: &[S]) -> Candidate {
    let cell = |index: usize| {
        row.get(index)
            .map(|value| value.as_ref().to_string())
            .unwrap_or_default()
    };

    Candidate {
        id: cell(0),
        name: cell(1),
        phone: cell(2),
        whatsapp: cell(3),
        trade: cell(4),
        specialties: cell(5),
        district_coverage: cell(6),
        languages: cell(7),
        years_experience: cell(8),
        availability: cell(9),
        price_range: cell(10),
        source: cell(11),
        rating_avg: cell(12),
        rating_count: cell(13),
        last_active: cell(14),
        notes: cell(15),
    }
}

pub fn rows_to_candidates<S: AsRef<str>>(rows: &[Vec<S>]) -> Vec<Candidate> {
    rows.iter().map(|row| candidate_from_row(row)).collect()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CandidateFile {
    Records(Vec<Candidate>),
    Sheet { values: Vec<Vec<CellText>> },
}

impl CandidateFile {
    fn into_candidates(self) -> Vec<Candidate> {
        match self {
            CandidateFile::Records(records) => records,
            CandidateFile::Sheet { values } => rows_to_candidates(&values),
        }
    }
}

/// Reads candidates from a JSON file on every load.
///
/// The file holds either an array of candidate objects or a sheet value range
/// shaped as `{ "values": [[...], ...] }` using [`CANDIDATE_COLUMNS`].
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CandidateSource for JsonFileSource {
    fn name(&self) -> &'static str {
        "json_file"
    }

    fn load(&self) -> Result<Vec<Candidate>, SourceError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;

        let file: CandidateFile =
            serde_json::from_str(&raw).map_err(|source| SourceError::Parse {
                path: self.path.clone(),
                source,
            })?;

        let candidates = file.into_candidates();
        debug!(path = %self.path.display(), count = candidates.len(), "loaded candidates");
        Ok(candidates)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    candidates: Vec<Candidate>,
}

impl StaticSource {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }
}

impl CandidateSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    fn load(&self) -> Result<Vec<Candidate>, SourceError> {
        Ok(self.candidates.clone())
    }
}
