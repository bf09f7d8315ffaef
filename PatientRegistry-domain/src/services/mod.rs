// Domain services
// This module contains business logic implementations.

pub mod auth;
pub mod import;
pub mod patient;
pub mod search;
pub mod stats;

// Re-export service traits and factory functions
pub use auth::{create_user_service, AuthServiceError, UserService, UserServiceTrait};
pub use import::ImportError;
pub use patient::{create_patient_service, PatientService, PatientServiceError, PatientServiceTrait};
pub use search::{create_search_service, SearchService, SearchServiceError, SearchServiceTrait};
