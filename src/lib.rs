// Library entry point for social-api
// Exposes modules for testing

pub mod api;
pub mod config;
pub mod models;
pub mod store;
