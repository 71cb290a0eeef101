//! Sliding-window rate limiting over recorded traffic.
//!
//! Traffic points are appended per `[namespace][route][credential]` bucket.
//! Buckets are append-only and time ordered (the traffic channel guarantees
//! non-decreasing arrival per bucket), which lets the window query run as a
//! binary search instead of a scan.
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::config::{Binding, RateConfig, Route, TrafficPoint};

type Bucket = Vec<DateTime<Utc>>;
type CredentialBuckets = HashMap<String, Bucket>;
type RouteBuckets = HashMap<String, CredentialBuckets>;

/// Concurrent traffic store answering rate and quota violation queries.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: RwLock<HashMap<String, RouteBuckets>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one traffic point to its bucket, creating missing tiers.
    pub fn set(&self, point: TrafficPoint) {
        let mut buckets = self.buckets.write();
        let bucket = buckets
            .entry(point.namespace)
            .or_default()
            .entry(point.route_name)
            .or_default()
            .entry(point.credential_name)
            .or_default();
        if bucket.last().is_some_and(|last| *last > point.timestamp) {
            tracing::warn!(
                timestamp = %point.timestamp,
                "traffic point arrived out of order; window counts may be off"
            );
        }
        bucket.push(point.timestamp);
    }

    /// Whether `credential` has exhausted its rate on `route`, using the rate
    /// configured for it in `binding`. A credential with no entry or no rate
    /// in the binding is never limited.
    pub fn is_rate_limit_violated(
        &self,
        route: &Route,
        binding: &Binding,
        credential: &str,
        now: DateTime<Utc>,
    ) -> bool {
        match binding.entry(credential).and_then(|entry| entry.rate) {
            Some(rate) => self.is_violated(route, &rate, credential, now),
            None => false,
        }
    }

    /// Same check with an already resolved rate configuration.
    ///
    /// * `amount < 1` never violates.
    /// * Without a unit the bucket length is compared to the amount (quota).
    /// * Otherwise only timestamps strictly after `now - 1 unit` count.
    ///
    /// A bucket that has never seen traffic is never violated.
    pub fn is_violated(
        &self,
        route: &Route,
        rate: &RateConfig,
        credential: &str,
        now: DateTime<Utc>,
    ) -> bool {
        if rate.amount < 1 {
            return false;
        }

        let buckets = self.buckets.read();
        let Some(bucket) = buckets
            .get(&route.namespace)
            .and_then(|routes| routes.get(&route.name))
            .and_then(|credentials| credentials.get(credential))
        else {
            return false;
        };

        let volume = match rate.unit {
            None => bucket.len(),
            Some(unit) => window_volume(bucket, now - unit.window()),
        };
        volume as i64 >= rate.amount
    }

    /// Number of points recorded in one bucket.
    pub fn bucket_len(&self, namespace: &str, route: &str, credential: &str) -> usize {
        self.buckets
            .read()
            .get(namespace)
            .and_then(|routes| routes.get(route))
            .and_then(|credentials| credentials.get(credential))
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.read().is_empty()
    }
}

/// Count of timestamps strictly after `cutoff` in an ascending bucket.
fn window_volume(bucket: &[DateTime<Utc>], cutoff: DateTime<Utc>) -> usize {
    let first_inside = bucket.partition_point(|ts| *ts <= cutoff);
    bucket.len() - first_inside
}
