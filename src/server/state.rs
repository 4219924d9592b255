//! Shared state handed to every request handler.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::classifier::ClassifierContext;
use crate::config::ServerConfig;

pub struct AppState {
    /// Model and labels, loaded once before serving
    pub context: Arc<ClassifierContext>,
    /// Bounds the number of forward passes in flight
    pub inference_slots: Arc<Semaphore>,
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
}

impl AppState {
    pub fn new(context: ClassifierContext, config: &ServerConfig) -> Self {
        Self {
            context: Arc::new(context),
            inference_slots: Arc::new(Semaphore::new(config.max_concurrent_inferences.max(1))),
            request_timeout: config.request_timeout,
            body_limit_bytes: config.body_limit_bytes,
        }
    }
}

pub type SharedState = Arc<AppState>;
