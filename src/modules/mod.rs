// Declare all modules
pub mod accounts;
pub mod auth;
pub mod config;
pub mod email;
pub mod registration;
pub mod utils;
pub mod web;

// No re-exports here as they're handled in lib.rs
