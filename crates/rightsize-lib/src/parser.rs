//! Instant-vector response parsing
//!
//! Normalizes the JSON body of a Prometheus-compatible instant query into a
//! flat list of [`Sample`]s. Malformed entries are dropped individually so a
//! single bad row never discards the rest of the batch.

use crate::error::{MalformedSample, Result, RightsizeError};
use crate::models::Sample;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

const STATUS_SUCCESS: &str = "success";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<ResultEntry>,
}

#[derive(Debug, Deserialize)]
struct ResultEntry {
    #[serde(default)]
    metric: HashMap<String, String>,
    #[serde(default)]
    value: Option<Vec<Value>>,
}

/// Samples parsed from one response plus the number of dropped entries
#[derive(Debug, Clone, Default)]
pub struct ParsedVector {
    pub samples: Vec<Sample>,
    pub dropped: usize,
}

/// Parse a raw instant-query response body.
///
/// Fails only on undecodable JSON or a non-success status. An empty result
/// list is valid and means "no data".
pub fn parse_instant_vector(raw: &[u8]) -> Result<ParsedVector> {
    let resp: QueryResponse = serde_json::from_slice(raw)?;

    if resp.status != STATUS_SUCCESS {
        if let Some(message) = &resp.error {
            debug!(status = %resp.status, error = %message, "Backend reported failure");
        }
        return Err(RightsizeError::BackendStatus {
            status: resp.status,
        });
    }

    let entries = resp.data.unwrap_or_default().result;
    let mut parsed = ParsedVector {
        samples: Vec::with_capacity(entries.len()),
        dropped: 0,
    };

    for entry in entries {
        match sample_value(entry.value.as_deref()) {
            Ok(value) => parsed.samples.push(Sample {
                labels: entry.metric,
                value,
            }),
            Err(reason) => {
                debug!(reason = %reason, labels = ?entry.metric, "Dropping malformed sample");
                parsed.dropped += 1;
            }
        }
    }

    Ok(parsed)
}

/// Extract the float from a `[timestamp, "value"]` pair
fn sample_value(pair: Option<&[Value]>) -> std::result::Result<f64, MalformedSample> {
    let raw = match pair {
        Some(pair) if pair.len() >= 2 => &pair[1],
        _ => return Err(MalformedSample::MissingValue),
    };

    let text = raw.as_str().ok_or(MalformedSample::NonStringValue)?;
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| MalformedSample::InvalidFloat(text.to_string()))?;

    if !value.is_finite() {
        return Err(MalformedSample::NonFinite(value));
    }

    Ok(value)
}
