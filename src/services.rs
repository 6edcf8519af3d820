pub mod access_scope;
pub mod aggregation;
pub mod auth;
pub mod filter_service;
pub mod manager_names;
pub mod pdf_service;
pub mod report_service;
