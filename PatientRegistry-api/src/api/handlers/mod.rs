pub mod auth;
pub mod health;
pub mod patients;
pub mod search;

// Re-export handlers for easier imports
pub use health::{health_check, root};
