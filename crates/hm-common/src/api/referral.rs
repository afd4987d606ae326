use serde::{Deserialize, Serialize};

use crate::run_id;

/// Referral hand-off. Every field is optional; the body itself may be absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReferralRequest {
    pub handyman_id: Option<String>,
    pub district: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralResponse {
    pub ok: bool,
    pub job_id: String,
}

impl ReferralResponse {
    pub fn accepted() -> Self {
        Self {
            ok: true,
            job_id: run_id::referral_job_id(),
        }
    }
}
