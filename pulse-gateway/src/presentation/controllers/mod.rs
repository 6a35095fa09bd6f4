//! Gateway API controllers

pub mod events;
pub mod health;

use std::sync::Arc;

use pulse_core::application::AdmissionPipeline;
use pulse_core::infrastructure::store::AdmissionStore;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: Arc<AdmissionPipeline>,
    /// Probed by the health endpoint
    pub store: Arc<dyn AdmissionStore>,
}

impl GatewayState {
    pub fn new(pipeline: Arc<AdmissionPipeline>, store: Arc<dyn AdmissionStore>) -> Self {
        Self { pipeline, store }
    }
}
