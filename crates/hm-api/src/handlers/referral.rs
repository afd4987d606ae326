use axum::{Json, body::Bytes};
use hm_common::api::referral::{ReferralRequest, ReferralResponse};
use tracing::info;

use crate::error::ApiError;

/// Accepts a referral hand-off and issues a job id. The JSON body is optional.
pub async fn create_referral(body: Bytes) -> Result<Json<ReferralResponse>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ReferralRequest::default()
    } else {
        serde_json::from_slice::<ReferralRequest>(&body)
            .map_err(|err| ApiError::BadRequest(format!("invalid referral body: {err}")))?
    };

    let response = ReferralResponse::accepted();
    info!(
        job_id = %response.job_id,
        handyman_id = request.handyman_id.as_deref().unwrap_or(""),
        district = request.district.as_deref().unwrap_or(""),
        "referral accepted"
    );

    Ok(Json(response))
}
