//! Traffic publishers feeding the local rate limiter.
//!
//! [`DirectTrafficPublisher`] appends synchronously and suits a single
//! replica. [`ChannelTrafficPublisher`] hands points to a tokio channel that
//! one task drains in order, which is how points replayed from other
//! replicas join the same stream without breaking per-bucket ordering.
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{config::TrafficPoint, core::rate_limiter::RateLimiter, ports::TrafficPublisher};

/// Appends every point straight into the limiter.
pub struct DirectTrafficPublisher {
    limiter: Arc<RateLimiter>,
}

impl DirectTrafficPublisher {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl TrafficPublisher for DirectTrafficPublisher {
    fn publish(&self, point: TrafficPoint) {
        self.limiter.set(point);
    }
}

/// Sends points over an unbounded channel drained by [`run_traffic_sink`].
#[derive(Clone)]
pub struct ChannelTrafficPublisher {
    tx: mpsc::UnboundedSender<TrafficPoint>,
}

impl ChannelTrafficPublisher {
    /// Create a publisher and the receiver to hand to [`run_traffic_sink`].
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TrafficPoint>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TrafficPublisher for ChannelTrafficPublisher {
    fn publish(&self, point: TrafficPoint) {
        if self.tx.send(point).is_err() {
            tracing::warn!("traffic sink has shut down; dropping traffic point");
        }
    }
}

/// Drain `rx` into `limiter` until every sender is dropped.
pub async fn run_traffic_sink(mut rx: mpsc::UnboundedReceiver<TrafficPoint>, limiter: Arc<RateLimiter>) {
    tracing::debug!("traffic sink started");
    while let Some(point) = rx.recv().await {
        limiter.set(point);
    }
    tracing::debug!("traffic sink stopped");
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn point(credential: &str, offset: i64) -> TrafficPoint {
        TrafficPoint {
            namespace: "shop".to_string(),
            route_name: "orders".to_string(),
            credential_name: credential.to_string(),
            timestamp: Utc::now() + Duration::milliseconds(offset),
        }
    }

    #[test]
    fn test_direct_publisher_appends() {
        let limiter = Arc::new(RateLimiter::new());
        let publisher = DirectTrafficPublisher::new(limiter.clone());
        publisher.publish(point("alice", 0));
        publisher.publish(point("alice", 1));
        assert_eq!(limiter.bucket_len("shop", "orders", "alice"), 2);
    }

    #[tokio::test]
    async fn test_channel_publisher_drains_in_order() {
        let limiter = Arc::new(RateLimiter::new());
        let (publisher, rx) = ChannelTrafficPublisher::channel();
        let sink = tokio::spawn(run_traffic_sink(rx, limiter.clone()));

        for i in 0..10 {
            publisher.publish(point("alice", i));
        }
        publisher.publish(point("bob", 0));
        drop(publisher);
        sink.await.unwrap();

        assert_eq!(limiter.bucket_len("shop", "orders", "alice"), 10);
        assert_eq!(limiter.bucket_len("shop", "orders", "bob"), 1);
    }
}
