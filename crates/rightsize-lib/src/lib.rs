//! Rightsizing engine for Kubernetes container resource requests
//!
//! This crate provides the core functionality for:
//! - Querying a Prometheus-compatible metrics backend
//! - Parsing instant-vector responses into samples
//! - Correlating independently fetched signals per container
//! - Computing rounded memory/CPU recommendations
//! - Classifying each resource dimension with an explainable decision
//! - Ranking and truncating the result set

pub mod calculator;
pub mod correlator;
pub mod decision;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod models;
pub mod observability;
pub mod parser;
pub mod promql;
pub mod ranker;

pub use engine::{EngineConfig, RightsizeEngine, DEFAULT_MAX_CONCURRENCY};
pub use error::{MalformedSample, Result, RightsizeError};
pub use gateway::{HttpGateway, MetricsGateway, QueryOptions};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
