//! Bounded-concurrency signal fan-out

use super::RightsizeEngine;
use crate::error::{Result, RightsizeError};
use crate::gateway::QueryOptions;
use crate::models::{RightsizeParams, Sample, SignalKind, UnavailableSignal};
use crate::observability::StructuredLogger;
use crate::parser::{parse_instant_vector, ParsedVector};
use crate::promql::query_for;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

/// Outcome of fetching every signal
pub(crate) struct Fetched {
    pub samples: HashMap<SignalKind, Vec<Sample>>,
    pub unavailable: Vec<UnavailableSignal>,
}

impl RightsizeEngine {
    /// Fetch all signals with at most `max_concurrency` queries in flight.
    ///
    /// Returns as soon as a mandatory signal fails; the remaining in-flight
    /// queries are dropped with the stream.
    pub(crate) async fn fetch_all(
        &self,
        params: &RightsizeParams,
        deadline: Instant,
        logger: &StructuredLogger,
    ) -> Result<Fetched> {
        let queries: Vec<(SignalKind, QueryOptions)> = SignalKind::ALL
            .iter()
            .map(|&signal| {
                let expr = query_for(signal, params, &self.config.key_labels);
                (signal, QueryOptions::new(expr).with_step(&params.subquery_step))
            })
            .collect();

        let limit = self.config.max_concurrency.max(1);
        let mut outcomes = stream::iter(queries)
            .map(|(signal, opts)| self.fetch_one(signal, opts, deadline))
            .buffer_unordered(limit);

        let mut fetched = Fetched {
            samples: HashMap::new(),
            unavailable: Vec::new(),
        };

        while let Some((signal, outcome, elapsed)) = outcomes.next().await {
            self.metrics.observe_fetch_latency(signal, elapsed);

            match outcome {
                Ok(parsed) => {
                    if parsed.dropped > 0 {
                        self.metrics.add_dropped_samples(signal, parsed.dropped);
                    }
                    logger.log_signal_fetched(signal, parsed.samples.len(), parsed.dropped, elapsed);
                    fetched.samples.insert(signal, parsed.samples);
                }
                Err(err) => {
                    self.metrics.inc_fetch_failures(signal);

                    if signal.is_mandatory() {
                        return Err(err.for_signal(signal));
                    }

                    debug!(signal = %signal, error = %err, "Best-effort signal failed");
                    fetched.unavailable.push(UnavailableSignal {
                        signal,
                        reason: err.to_string(),
                    });
                }
            }
        }

        fetched.unavailable.sort_by_key(|u| u.signal);
        Ok(fetched)
    }

    async fn fetch_one(
        &self,
        signal: SignalKind,
        opts: QueryOptions,
        deadline: Instant,
    ) -> (SignalKind, Result<ParsedVector>, Duration) {
        let started = Instant::now();

        let outcome = match timeout_at(deadline, self.gateway.query(&opts)).await {
            Ok(Ok(body)) => parse_instant_vector(&body),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(RightsizeError::DeadlineExceeded),
        };

        (signal, outcome, started.elapsed())
    }
}
