//! Request admission: a pure state machine and the driver that feeds it.

pub mod pipeline;
pub mod state;

pub use pipeline::{AdmissionOutcome, AdmissionPipeline, AdmissionRequest};
pub use state::{
    AdmissionContext, AdmissionPolicy, AdmissionState, ClaimOutcome, RateOutcome, StageSignal,
    Step,
};
