//! kroute - the in-memory store core of a Kubernetes-native API gateway.
//!
//! kroute holds the gateway's live configuration and answers the questions
//! asked on every request: which route serves this path and host, which
//! credential a presented value belongs to, whether that credential may use
//! this method here, and whether it has exhausted its rate. The crate follows
//! a **hexagonal architecture**: stores and the request pipeline live in
//! `core`, the seams to the outside world are traits in `ports`, and `adapters`
//! provide file-backed and in-process implementations.
//!
//! # Stores
//! - [`RouteStore`](core::RouteStore): `(path, virtual host)` to route, on a
//!   segment trie with longest-prefix matching
//! - [`PermissionStore`](core::PermissionStore): per-credential rules and
//!   rates grouped by binding, with subpath overrides
//! - [`CredentialStore`](core::CredentialStore): decrypted credential value to
//!   its record, with revision rotation
//! - [`MockRouteStore`](core::MockRouteStore): canned responses by path and
//!   method
//! - [`RateLimiter`](core::RateLimiter): sliding-window traffic buckets
//!
//! Configuration changes arrive as whole-resource
//! [`ResourceEvent`](core::ResourceEvent)s and are applied by
//! [`ResourceEventApplier`](adapters::ResourceEventApplier).
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use kroute::{
//!     adapters::{DirectTrafficPublisher, ResourceEventApplier},
//!     core::{GatewayService, GatewayStores, InboundRequest},
//! };
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let manifest = kroute::config::loader::load_manifest("manifest.yaml").await?;
//! let stores = Arc::new(GatewayStores::new());
//! ResourceEventApplier::new(stores.clone()).load_snapshot(&manifest);
//!
//! let publisher = Arc::new(DirectTrafficPublisher::new(stores.traffic.clone()));
//! let gateway = GatewayService::new(stores, publisher);
//! let request = InboundRequest {
//!     path: "/orders/42",
//!     host: Some("shop.example.com"),
//!     method: "GET",
//!     credential: Some("alice-key"),
//! };
//! println!("{}", gateway.handle(&request, chrono::Utc::now()).as_str());
//! # Ok(()) }
//! ```
//!
//! # Error Handling
//! Store mutations that can be refused return [`StoreError`](core::StoreError)
//! and leave the store unchanged. Loading and watching return
//! `eyre::Result<T>` with context attached through `WrapErr`.
//!
//! # Concurrency
//! Every store sits behind a single `parking_lot::RwLock`, so a multi-step
//! mutation is atomic with respect to readers and lookups never block each
//! other.
pub mod config;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

pub use crate::{
    adapters::{FileResourceSource, PlaintextDecryptor, ResourceEventApplier},
    core::{Decision, GatewayService, GatewayStores, InboundRequest, StoreError},
};
