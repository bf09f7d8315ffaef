// PatientRegistry-api lib.rs
//
// HTTP layer of the patient registry: routing, handlers, error bodies
// and the OpenAPI document.

// Public modules
pub mod api;
pub mod entities;
pub mod openapi;
