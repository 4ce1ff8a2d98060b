//! Bounded-concurrency fan-out over a list of grid points.
//!
//! Each point is fetched independently; a point that cannot be sampled is
//! recorded with the reason and left out of [`SampleReport::samples`]. Only
//! rate limiting (HTTP 429) is retried.

use crate::config::RetryPolicy;
use crate::types::location::LatLon;
use crate::weather_data::error::WeatherDataError;
use futures_util::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::future::Future;

/// What happened when sampling one grid point.
#[derive(Debug, Clone, PartialEq)]
pub enum PointOutcome<T> {
    /// A usable value, obtained on attempt number `attempts`.
    Sampled { point: LatLon, value: T, attempts: u32 },
    /// Upstream answered but had nothing usable for the point.
    NoData { point: LatLon },
    /// Still rate limited after every allowed attempt.
    RateLimited { point: LatLon, attempts: u32 },
    /// Any other error.
    Failed { point: LatLon, reason: String },
}

impl<T> PointOutcome<T> {
    pub fn point(&self) -> LatLon {
        match self {
            PointOutcome::Sampled { point, .. }
            | PointOutcome::NoData { point }
            | PointOutcome::RateLimited { point, .. }
            | PointOutcome::Failed { point, .. } => *point,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            PointOutcome::Sampled { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// All outcomes of one sampling run, in grid order.
#[derive(Debug, Clone)]
pub struct SampleReport<T> {
    pub outcomes: Vec<PointOutcome<T>>,
}

impl<T> SampleReport<T> {
    /// Points with a usable value, in grid order.
    pub fn samples(&self) -> impl Iterator<Item = (LatLon, &T)> + '_ {
        self.outcomes
            .iter()
            .filter_map(|o| o.value().map(|v| (o.point(), v)))
    }

    pub fn sampled(&self) -> usize {
        self.count(|o| matches!(o, PointOutcome::Sampled { .. }))
    }

    pub fn no_data(&self) -> usize {
        self.count(|o| matches!(o, PointOutcome::NoData { .. }))
    }

    pub fn rate_limited(&self) -> usize {
        self.count(|o| matches!(o, PointOutcome::RateLimited { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, PointOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&PointOutcome<T>) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }

    fn log_summary(&self) {
        let total = self.outcomes.len();
        if self.sampled() == total {
            info!("Sampled all {} grid points", total);
        } else {
            warn!(
                "Sampled {}/{} grid points ({} without data, {} rate limited, {} failed)",
                self.sampled(),
                total,
                self.no_data(),
                self.rate_limited(),
                self.failed()
            );
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PointSampler {
    workers: usize,
    retry: RetryPolicy,
}

impl PointSampler {
    /// `workers` is clamped to at least 1.
    pub fn new(workers: usize, retry: RetryPolicy) -> Self {
        Self {
            workers: workers.max(1),
            retry,
        }
    }

    /// Runs `fetch` for every point with at most `workers` requests in flight.
    ///
    /// `fetch` returns `Ok(None)` when the point's data holds no usable value.
    pub async fn sample<T, F, Fut>(&self, points: &[LatLon], fetch: F) -> SampleReport<T>
    where
        F: Fn(LatLon) -> Fut,
        Fut: Future<Output = Result<Option<T>, WeatherDataError>>,
    {
        info!(
            "Sampling {} grid points with {} workers",
            points.len(),
            self.workers
        );
        let outcomes = stream::iter(points.iter().copied())
            .map(|point| self.sample_point(point, &fetch))
            .buffered(self.workers)
            .collect::<Vec<_>>()
            .await;

        let report = SampleReport { outcomes };
        report.log_summary();
        report
    }

    async fn sample_point<T, F, Fut>(&self, point: LatLon, fetch: &F) -> PointOutcome<T>
    where
        F: Fn(LatLon) -> Fut,
        Fut: Future<Output = Result<Option<T>, WeatherDataError>>,
    {
        let max_attempts = self.retry.attempts.max(1);
        let mut attempts = 0;
        loop {
            attempts += 1;
            match fetch(point).await {
                Ok(Some(value)) => {
                    debug!("Sampled {} on attempt {}", point, attempts);
                    return PointOutcome::Sampled {
                        point,
                        value,
                        attempts,
                    };
                }
                Ok(None) => {
                    debug!("No usable sample at {}", point);
                    return PointOutcome::NoData { point };
                }
                Err(e) if e.is_rate_limited() => {
                    if attempts >= max_attempts {
                        warn!("Giving up on {} after {} rate limited attempts", point, attempts);
                        return PointOutcome::RateLimited { point, attempts };
                    }
                    warn!(
                        "Rate limited on {} (attempt {}/{}), retrying in {:?}",
                        point, attempts, max_attempts, self.retry.delay
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) if e.is_data_not_found() => {
                    debug!("No data at {}: {}", point, e);
                    return PointOutcome::NoData { point };
                }
                Err(e) => {
                    warn!("Dropping grid point {}: {}", point, e);
                    return PointOutcome::Failed {
                        point,
                        reason: e.to_string(),
                    };
                }
            }
        }
    }
}
