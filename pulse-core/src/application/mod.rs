//! Application layer: the admission pipeline and its error taxonomy

pub mod admission;
pub mod errors;

pub use admission::{AdmissionOutcome, AdmissionPipeline, AdmissionPolicy, AdmissionRequest};
pub use errors::IngestError;
