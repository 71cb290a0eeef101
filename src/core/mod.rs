pub mod credential_store;
pub mod error;
pub mod events;
pub mod gateway;
pub mod mock_store;
pub mod path_trie;
pub mod permission_store;
pub mod rate_limiter;
pub mod route_store;

pub use credential_store::CredentialStore;
pub use error::{StoreError, StoreResult};
pub use events::{Resource, ResourceEvent, diff_manifests};
pub use gateway::{Decision, GatewayService, GatewayStores, InboundRequest};
pub use mock_store::MockRouteStore;
pub use path_trie::PathTrie;
pub use permission_store::{PermissionMatch, PermissionStore};
pub use rate_limiter::RateLimiter;
pub use route_store::RouteStore;
