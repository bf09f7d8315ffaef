// PatientRegistry Data
// This crate holds the storage models and the repositories over them

// Repository implementations for data access
pub mod repository;

// Data storage models
pub mod models;
