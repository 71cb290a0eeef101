use crate::config::models::TrafficPoint;

/// TrafficPublisher defines the port that propagates recorded requests to
/// every replica's rate limiter.
///
/// Implementations must preserve timestamp order per
/// (namespace, route, credential) bucket.
pub trait TrafficPublisher: Send + Sync + 'static {
    fn publish(&self, point: TrafficPoint);
}
