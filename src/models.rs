pub mod auth;
pub mod commission;
