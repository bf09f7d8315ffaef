// Domain entities
// Request and response shapes shared by the services and the API layer.

pub mod patient;
pub mod user;
pub mod search;
pub mod conversions;
