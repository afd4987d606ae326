pub mod health;
pub mod referral;
pub mod search;
