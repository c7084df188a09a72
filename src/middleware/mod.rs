pub mod auth;
pub mod json;
pub mod rate_limit;
