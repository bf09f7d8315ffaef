// Public entities for the patient registry API
// Request and response bodies owned by the HTTP layer. Patient, search and
// account payloads come from the domain crate.

// Error bodies and their mapping from service errors
pub mod common;

pub use common::ErrorResponse;
