use std::path::Path;

use config::{Config, File, FileFormat};
use eyre::{Context, Result};
use serde::de::DeserializeOwned;

use crate::config::models::{GatewaySettings, ResourceManifest};

/// Load process settings from a file using the config crate.
/// Supports multiple formats: YAML, JSON, TOML, etc.
pub async fn load_settings(settings_path: &str) -> Result<GatewaySettings> {
    load_settings_sync(settings_path)
}

/// Load process settings synchronously
pub fn load_settings_sync(settings_path: &str) -> Result<GatewaySettings> {
    load_document(settings_path)
}

/// Load a resource manifest from a file.
pub async fn load_manifest(manifest_path: &str) -> Result<ResourceManifest> {
    load_manifest_sync(manifest_path)
}

/// Load a resource manifest synchronously
pub fn load_manifest_sync(manifest_path: &str) -> Result<ResourceManifest> {
    load_document(manifest_path)
}

fn load_document<T: DeserializeOwned>(path: &str) -> Result<T> {
    let path = Path::new(path);

    // Determine file format based on extension
    let format = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Yaml, // Default to YAML
    };

    let built = Config::builder()
        .add_source(File::new(
            path.to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", path.display()))?,
            format,
        ))
        .build()
        .with_context(|| format!("Failed to build config from {}", path.display()))?;

    built
        .try_deserialize()
        .with_context(|| format!("Failed to deserialize {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::config::models::Rule;

    #[tokio::test]
    async fn test_load_yaml_manifest() {
        let yaml_content = r#"
routes:
  - name: orders
    namespace: shop
    sourcePath: /orders
    sourceVirtualHost: shop.example.com
    targetPath: /
    targetBackend: orders:8080
    binding: buyers
bindings:
  - name: buyers
    namespace: shop
    credentials:
      - credentialName: alice
        defaultRule:
          type: granular
          verbs: [GET]
        subpaths:
          - path: /orders/drafts
            rule:
              type: global
credentials:
  - name: alice
    namespace: shop
    revisions: [alice-key]
"#;

        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        write!(temp_file, "{}", yaml_content).unwrap();

        let manifest = load_manifest(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.routes[0].virtual_host(), "shop.example.com");
        let entry = manifest.bindings[0].entry("alice").unwrap();
        assert_eq!(entry.subpaths[0].rule, Rule::Global);
        assert!(manifest.mock_targets.is_empty());
    }

    #[tokio::test]
    async fn test_load_json_settings() {
        let json_content = r#"
{
  "log_level": "kroute=debug",
  "json_logs": true,
  "manifest_path": "/etc/kroute/manifest.yaml"
}
"#;

        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(temp_file, "{}", json_content).unwrap();

        let settings = load_settings(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(settings.log_level, "kroute=debug");
        assert!(settings.json_logs);
        assert_eq!(
            settings.manifest_path.as_deref(),
            Some("/etc/kroute/manifest.yaml")
        );
        assert_eq!(settings.reload_debounce_ms, 2_000);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_manifest_sync("/nonexistent/kroute/manifest.yaml").is_err());
    }
}
