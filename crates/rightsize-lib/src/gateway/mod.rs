//! Metrics backend boundary
//!
//! The engine only needs one operation from the backend: run an instant
//! query and hand back the raw response body. Parsing stays on the engine
//! side so every gateway implementation shares the same tolerance rules.

mod http;

pub use http::{HttpGateway, DEFAULT_REQUEST_TIMEOUT};

use crate::error::Result;

pub use async_trait::async_trait;

/// One instant query against the backend, evaluated at the backend's "now"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub expr: String,
    /// Default resolution for subqueries without an explicit step
    pub step: Option<String>,
}

impl QueryOptions {
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            ..Self::default()
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }
}

/// Trait for metrics backend implementations
#[async_trait]
pub trait MetricsGateway: Send + Sync {
    /// Run an instant query and return the raw JSON body
    async fn query(&self, opts: &QueryOptions) -> Result<Vec<u8>>;
}
