// Repository module structure
pub mod errors;
mod in_memory;
mod patient;
mod user;

// Re-export commonly used types
pub use errors::RepositoryError;
pub use in_memory::InMemoryStorage;
pub use patient::{PatientRepository, PatientRepositoryTrait};
pub use user::{UserRepository, UserRepositoryTrait};

// Re-export the generated doubles for the domain crate's tests
#[cfg(any(test, feature = "mock"))]
pub use patient::MockPatientRepositoryTrait;
#[cfg(any(test, feature = "mock"))]
pub use user::MockUserRepositoryTrait;
