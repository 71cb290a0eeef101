use thiserror::Error;

/// Errors raised by store writes.
///
/// Misses are never errors: lookups and deletes of absent keys return `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    /// A route update tried to move into a slot owned by another resource
    #[error(
        "route slot {path} (host '{virtual_host}') is owned by {owner_namespace}/{owner_name}"
    )]
    Conflict {
        path: String,
        virtual_host: String,
        owner_namespace: String,
        owner_name: String,
    },

    /// A mock target must carry at least one route
    #[error("mock target {namespace}/{name} has no routes")]
    EmptyMockTarget { namespace: String, name: String },

    /// A credential record must carry at least one revision to be deleted
    #[error("credential {namespace}/{name} has no revisions")]
    NoRevisions { namespace: String, name: String },

    /// An update event paired resources of different kinds
    #[error("cannot update a {old} with a {new}")]
    KindMismatch { old: &'static str, new: &'static str },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
