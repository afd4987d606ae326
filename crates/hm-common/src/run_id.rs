//! ULID-based identifiers.
//!
//! The process run id is generated once and tags every log line of a ranking
//! run; referral job ids are fresh per request. ULIDs sort by creation time.

use once_cell::sync::Lazy;
use ulid::Ulid;

static RUN_ID: Lazy<String> = Lazy::new(|| Ulid::new().to_string());

/// Process-level run id, stable for the lifetime of the process.
#[inline]
pub fn get() -> &'static str {
    &RUN_ID
}

#[inline]
pub fn generate() -> String {
    Ulid::new().to_string()
}

/// Referral job id: `job_` followed by a fresh ULID.
pub fn referral_job_id() -> String {
    format!("job_{}", generate())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_same_value() {
        let first = get();
        let second = get();
        assert_eq!(first, second);
        assert_eq!(first.len(), 26);
    }

    #[test]
    fn referral_job_ids_are_prefixed_and_unique() {
        let a = referral_job_id();
        let b = referral_job_id();

        assert!(a.starts_with("job_"));
        assert_eq!(a.len(), 4 + 26);
        assert_ne!(a, b);
    }

    #[test]
    fn ids_are_time_ordered() {
        let older = generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let newer = generate();
        assert!(older < newer);
    }
}
