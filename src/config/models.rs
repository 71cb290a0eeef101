//! Resource and settings data structures for kroute.
//!
//! Resources arrive as whole snapshots (from a manifest file or an external
//! watcher) and map directly to YAML / JSON / TOML documents. Field names are
//! `camelCase` on the wire to match the custom resources they mirror. Defaults
//! keep minimal manifests concise.
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::path::normalize_path;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_reload_debounce_ms() -> u64 {
    2_000
}

/// Process-level settings for the `kroute` binary.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GatewaySettings {
    /// `EnvFilter` directive, e.g. `info` or `kroute=debug`
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON log lines instead of the pretty console format
    pub json_logs: bool,
    /// Manifest holding the route / binding / credential / mock resources
    pub manifest_path: Option<String>,
    /// Quiet period applied to bursts of file change notifications
    #[serde(default = "default_reload_debounce_ms")]
    pub reload_debounce_ms: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            manifest_path: None,
            reload_debounce_ms: default_reload_debounce_ms(),
        }
    }
}

/// A declarative mapping from an inbound (path, virtual host) to a backend.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub name: String,
    pub namespace: String,
    pub source_path: String,
    /// `None` (or empty) occupies the global slot of `source_path`
    #[serde(default)]
    pub source_virtual_host: Option<String>,
    #[serde(default)]
    pub target_path: String,
    pub target_backend: String,
    #[serde(default)]
    pub target_ssl: bool,
    #[serde(default)]
    pub plugins: Vec<String>,
    /// Binding that authorizes callers; `None` makes the route public
    #[serde(default)]
    pub binding: Option<String>,
    /// When set, `target_backend` names a [`MockTarget`] in this namespace
    #[serde(default)]
    pub mock: bool,
}

impl Route {
    /// The virtual host key, with the empty string standing for "global".
    pub fn virtual_host(&self) -> &str {
        self.source_virtual_host.as_deref().unwrap_or("")
    }

    /// Whether two routes belong to the same slot owner.
    pub fn same_owner(&self, other: &Route) -> bool {
        self.name == other.name
            && self.namespace == other.namespace
            && self.virtual_host() == other.virtual_host()
    }

    /// Rewrite a request path for the upstream: the matched source prefix is
    /// replaced by the target path.
    pub fn upstream_path(&self, request_path: &str) -> String {
        let source = normalize_path(&self.source_path);
        let target = normalize_path(&self.target_path);
        let request = normalize_path(request_path);

        let rest = if source == "/" {
            request.as_str()
        } else {
            match request.strip_prefix(&source) {
                Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
                _ => return request,
            }
        };

        match (target.as_str(), rest) {
            ("/", "") => "/".to_string(),
            ("/", rest) => rest.to_string(),
            (target, rest) => format!("{target}{rest}"),
        }
    }
}

/// Authorization rule attached to a credential or one of its subpaths.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Every HTTP method is authorized
    Global,
    /// Only the listed verbs (case-insensitive); an empty list authorizes nothing
    Granular {
        #[serde(default)]
        verbs: Vec<String>,
    },
}

impl Rule {
    /// A granular rule that denies every method.
    pub fn deny_all() -> Self {
        Rule::Granular { verbs: Vec::new() }
    }

    pub fn authorizes(&self, method: &str) -> bool {
        match self {
            Rule::Global => true,
            Rule::Granular { verbs } => verbs.iter().any(|v| v.eq_ignore_ascii_case(method)),
        }
    }
}

/// Time unit of a rate window.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl RateUnit {
    pub fn window(self) -> Duration {
        match self {
            RateUnit::Second => Duration::seconds(1),
            RateUnit::Minute => Duration::minutes(1),
            RateUnit::Hour => Duration::hours(1),
            RateUnit::Day => Duration::days(1),
            RateUnit::Week => Duration::weeks(1),
        }
    }
}

/// Rate configuration of a credential.
///
/// `amount < 1` disables the limit. Without a unit the amount is a plain
/// quota on the total number of recorded requests.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateConfig {
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub unit: Option<RateUnit>,
}

/// A permission override scoped to a path prefix.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SubpathRule {
    pub path: String,
    pub rule: Rule,
}

/// Per-credential permissions inside a binding.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEntry {
    pub credential_name: String,
    pub default_rule: Rule,
    #[serde(default)]
    pub subpaths: Vec<SubpathRule>,
    #[serde(default)]
    pub rate: Option<RateConfig>,
}

/// A named grouping of credential-to-permission mappings in a namespace.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub credentials: Vec<PermissionEntry>,
}

impl Binding {
    pub fn entry(&self, credential_name: &str) -> Option<&PermissionEntry> {
        self.credentials
            .iter()
            .find(|e| e.credential_name == credential_name)
    }
}

/// A credential resource with its decrypted revision values.
///
/// Each revision is one active or rotating secret value; all of them resolve
/// back to this record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub revisions: Vec<String>,
}

fn default_mock_status() -> u16 {
    200
}

/// A canned response.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MockRoute {
    pub path: String,
    #[serde(default = "default_mock_status")]
    pub status_code: u16,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
}

impl MockRoute {
    pub fn serves(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }
}

/// A named set of mock routes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MockTarget {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub routes: Vec<MockRoute>,
}

/// One request attributed to a (namespace, route, credential) bucket.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrafficPoint {
    pub namespace: String,
    pub route_name: String,
    pub credential_name: String,
    pub timestamp: DateTime<Utc>,
}

/// A complete configuration snapshot.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceManifest {
    pub routes: Vec<Route>,
    pub bindings: Vec<Binding>,
    pub credentials: Vec<CredentialRecord>,
    pub mock_targets: Vec<MockTarget>,
}

impl ResourceManifest {
    /// Total number of resources of every kind.
    pub fn len(&self) -> usize {
        self.routes.len() + self.bindings.len() + self.credentials.len() + self.mock_targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
