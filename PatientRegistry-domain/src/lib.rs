// PatientRegistry Domain
// This crate contains the business logic for the patient registry

// Runtime configuration
pub mod config;

// Field normalization and validation rules
pub mod validation;

// Domain entities
pub mod entities;

// Services that implement business logic
pub mod services;

// Authentication
pub mod auth;

// Health checks and system status
pub mod health;

// Re-export the repositories from the data crate for convenience
pub use patient_registry_data::repository;

// Testing utilities - only available with mock feature
#[cfg(any(test, feature = "mock"))]
pub mod testing;
