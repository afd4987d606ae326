pub mod referral;
pub mod search_request;
pub mod search_response;
