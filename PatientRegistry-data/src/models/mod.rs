// Storage models. Nested patient documents are kept as JSON values,
// the same way a document column would hold them.
pub mod patient;
pub mod user;

pub use patient::{NewPatient, PatientRecord};
pub use user::{NewUser, UserRecord};
