pub mod admin;
pub mod auth;
pub mod notifications;
pub mod orders;
