use std::{path::Path, sync::Arc, time::Duration};

use chrono::Utc;
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use kroute::{
    adapters::{
        DirectTrafficPublisher, FileResourceSource, PlaintextDecryptor, ResourceEventApplier,
    },
    config::{GatewaySettings, loader::load_settings},
    core::{Decision, GatewayService, GatewayStores, InboundRequest},
    ports::ResourceSource,
    tracing_setup,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Process settings file
    #[clap(short, long, default_value = "kroute.yaml")]
    settings: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Load a manifest into fresh stores and summarize it
    Check {
        /// Manifest file to check
        #[clap(short, long, default_value = "manifest.yaml")]
        manifest: String,
    },
    /// Dry-run one request against a manifest
    Resolve {
        /// Manifest file to load
        #[clap(short, long, default_value = "manifest.yaml")]
        manifest: String,
        /// Request path
        path: String,
        /// Virtual host; omit to match global routes only
        #[clap(long)]
        host: Option<String>,
        /// HTTP method
        #[clap(short = 'X', long, default_value = "GET")]
        method: String,
        /// Plaintext credential value
        #[clap(short, long)]
        credential: Option<String>,
    },
    /// Load a manifest and keep the stores in sync with it (default)
    Watch {
        /// Manifest file; overrides `manifest_path` from the settings file
        #[clap(short, long)]
        manifest: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Check { manifest }) => check_command(&manifest).await,
        Some(Commands::Resolve {
            manifest,
            path,
            host,
            method,
            credential,
        }) => {
            resolve_command(
                &manifest,
                &path,
                host.as_deref(),
                &method,
                credential.as_deref(),
            )
            .await
        }
        Some(Commands::Watch { manifest }) => watch_command(&args.settings, manifest).await,
        None => watch_command(&args.settings, None).await,
    }
}

/// Load `manifest_path` into a fresh set of stores.
///
/// Returns the stores and the number of resources the stores rejected.
async fn load_into_stores(manifest_path: &str) -> Result<(Arc<GatewayStores>, usize)> {
    let source = FileResourceSource::new(manifest_path, Arc::new(PlaintextDecryptor))
        .with_context(|| format!("Failed to open manifest {manifest_path}"))?;
    let manifest = source.load().await?;

    let stores = Arc::new(GatewayStores::new());
    let failures = ResourceEventApplier::new(stores.clone()).load_snapshot(&manifest);
    Ok((stores, failures))
}

/// Load a manifest into fresh stores and print a summary
async fn check_command(manifest_path: &str) -> Result<()> {
    println!("🔍 Checking manifest: {manifest_path}");

    if !Path::new(manifest_path).exists() {
        eprintln!("❌ Error: Manifest '{manifest_path}' not found");
        std::process::exit(1);
    }

    let source = FileResourceSource::new(manifest_path, Arc::new(PlaintextDecryptor))?;
    let manifest = match source.load().await {
        Ok(manifest) => {
            println!("✅ Manifest parsing: OK");
            manifest
        }
        Err(e) => {
            eprintln!("❌ Manifest parsing failed:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    tracing_setup::init_console_tracing()?;
    let stores = Arc::new(GatewayStores::new());
    let failures = ResourceEventApplier::new(stores.clone()).load_snapshot(&manifest);

    println!();
    println!("📋 Manifest Summary:");
    println!("   • Routes: {}", manifest.routes.len());
    println!("   • Bindings: {}", manifest.bindings.len());
    println!("   • Credentials: {}", manifest.credentials.len());
    println!("   • Mock targets: {}", manifest.mock_targets.len());
    println!("   • Distinct credential values: {}", stores.credentials.len());
    println!();

    if failures > 0 {
        eprintln!("❌ {failures} resource(s) were rejected by the stores (see log above)");
        println!();
        println!("💡 Common fixes:");
        println!("   • Give every route a unique (sourcePath, sourceVirtualHost)");
        println!("   • Give every mock target at least one route");
        println!("   • List at least one revision for every credential");
        std::process::exit(1);
    }

    println!("🎉 Manifest is valid and ready to use!");
    Ok(())
}

/// Resolve one request against a manifest and print the decision
async fn resolve_command(
    manifest_path: &str,
    path: &str,
    host: Option<&str>,
    method: &str,
    credential: Option<&str>,
) -> Result<()> {
    let (stores, failures) = load_into_stores(manifest_path).await?;
    if failures > 0 {
        eprintln!("⚠️  {failures} resource(s) in {manifest_path} were rejected");
    }

    let publisher = Arc::new(DirectTrafficPublisher::new(stores.traffic.clone()));
    let service = GatewayService::new(stores, publisher);
    let request = InboundRequest {
        path,
        host,
        method,
        credential,
    };

    match service.handle(&request, Utc::now()) {
        Decision::Forward {
            route,
            upstream_path,
        } => {
            let scheme = if route.target_ssl { "https" } else { "http" };
            println!(
                "➡️  forward via {}/{}: {scheme}://{}{upstream_path}",
                route.namespace, route.name, route.target_backend
            );
        }
        Decision::Mock(mock) => {
            println!("🧪 mock {}: {}", mock.status_code, mock.body);
        }
        denied => {
            println!("⛔ {}", denied.as_str());
        }
    }
    Ok(())
}

/// Keep a set of stores in sync with a manifest file until Ctrl-C
async fn watch_command(settings_path: &str, manifest_override: Option<String>) -> Result<()> {
    let settings = if Path::new(settings_path).exists() {
        load_settings(settings_path)
            .await
            .with_context(|| format!("Failed to load settings from {settings_path}"))?
    } else {
        GatewaySettings::default()
    };

    tracing_setup::init_tracing_with_settings(&settings)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    let manifest_path = manifest_override
        .or_else(|| settings.manifest_path.clone())
        .ok_or_else(|| eyre!("No manifest given: pass --manifest or set manifest_path"))?;

    tracing::info!("Loading initial manifest from {manifest_path}");

    let source = Arc::new(
        FileResourceSource::new(&manifest_path, Arc::new(PlaintextDecryptor))
            .context("Failed to create manifest source")?,
    );
    let stores = Arc::new(GatewayStores::new());
    let applier = ResourceEventApplier::new(stores.clone());

    let initial = source
        .reload()
        .await
        .with_context(|| format!("Failed to load initial manifest from {manifest_path}"))?;
    let failures = applier.apply_all(initial);
    tracing::info!(
        routes = stores.routes.len(),
        credentials = stores.credentials.len(),
        failures,
        "initial manifest applied"
    );

    let debounce_duration = Duration::from_millis(settings.reload_debounce_ms);
    let mut notify_rx = source.watch();
    let source_for_watcher = source.clone();

    let watcher = tokio::spawn(async move {
        tracing::info!("Manifest watcher task started.");
        let mut last_reload_attempt_time = tokio::time::Instant::now();
        last_reload_attempt_time = last_reload_attempt_time
            .checked_sub(debounce_duration)
            .unwrap_or(last_reload_attempt_time);

        while notify_rx.recv().await.is_some() {
            // Debounce
            if last_reload_attempt_time.elapsed() < debounce_duration {
                tracing::debug!("Debouncing manifest reload event. Still within cooldown period.");
                while notify_rx.try_recv().is_ok() {}
                continue;
            }
            last_reload_attempt_time = tokio::time::Instant::now();

            match source_for_watcher.reload().await {
                Ok(events) => {
                    let failures = applier.apply_all(events);
                    if failures > 0 {
                        tracing::warn!(failures, "some manifest changes were rejected");
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to reload manifest, keeping previous state: {e:#}");
                }
            }
        }
        tracing::info!("Manifest watcher task stopped.");
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");
    watcher.abort();
    Ok(())
}
