mod cli;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ideascore_core::{AnalysisRequest, DomainContext};
use ideascore_runtime::providers::RULE_BASED_PROVIDER_NAME;
use ideascore_runtime::{Manager, ProviderConfig, RuntimeConfig};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Check => {
            info!("Config OK: {} provider(s)", config.providers.len());
            for provider in &config.providers {
                println!("{}", provider.name());
            }
            Ok(())
        }
        Commands::Analyze {
            idea,
            context,
            provider,
            no_fallback,
            stats,
        } => {
            let manager = build_manager(&config)?;
            if let Some(name) = provider {
                manager
                    .set_primary(&name)
                    .with_context(|| format!("Cannot route to provider '{}'", name))?;
            }
            if no_fallback {
                manager.set_fallback_enabled(false);
            }

            let idea = match idea {
                Some(idea) => idea,
                None => read_stdin()?,
            };
            let mut request = AnalysisRequest::new(idea.trim());
            if let Some(path) = context {
                request = request.with_context(load_context(&path)?);
            }

            let result = manager.analyze(&request).await.context("Analysis failed")?;
            print_json(&result)?;

            if stats {
                eprintln!("{}", serde_json::to_string_pretty(&manager.stats())?);
            }
            Ok(())
        }
        Commands::Health { watch: false } => {
            let manager = build_manager(&config)?;
            let health: BTreeMap<_, _> = manager.check_health().await.into_iter().collect();
            print_json(&health)
        }
        Commands::Health { watch: true } => {
            let manager = Arc::new(build_manager(&config)?);
            let Some(handle) = manager.start_configured_health_checks() else {
                bail!("--watch needs manager.health_check_interval in the config");
            };
            let interval = manager.health_check_interval().unwrap_or_default();

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = tokio::time::sleep(interval) => {
                        let health: BTreeMap<_, _> = manager.health_status().into_iter().collect();
                        print_json(&health)?;
                    }
                }
            }

            handle.stop().await;
            info!("Health watch stopped");
            Ok(())
        }
        Commands::Providers => {
            let manager = build_manager(&config)?;
            manager.check_health().await;

            #[derive(Serialize)]
            struct Listing {
                primary: Option<String>,
                fallback_enabled: bool,
                providers: Vec<ideascore_runtime::ProviderStatsSnapshot>,
                caches: BTreeMap<String, ideascore_runtime::CacheStats>,
            }

            print_json(&Listing {
                primary: manager.select_primary().await,
                fallback_enabled: manager.fallback_enabled(),
                providers: manager.stats(),
                caches: manager.cache_stats(),
            })
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            RuntimeConfig::from_yaml_file(path)
                .with_context(|| format!("Failed to load config from {:?}", path))
        }
        None => {
            debug!("No config given, using the rule-based provider only");
            Ok(RuntimeConfig {
                providers: vec![ProviderConfig::RuleBased {
                    name: RULE_BASED_PROVIDER_NAME.to_string(),
                }],
                cache: Default::default(),
                manager: Default::default(),
            })
        }
    }
}

fn build_manager(config: &RuntimeConfig) -> Result<Manager> {
    let manager = Manager::from_config(config).context("Failed to build providers")?;
    debug!("Registered providers: {:?}", manager.provider_names());
    Ok(manager)
}

fn load_context(path: &Path) -> Result<DomainContext> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read context file {:?}", path))?;
    // JSON is a subset of YAML, so one parser covers both
    serde_yaml::from_str(&raw).with_context(|| format!("Invalid context file {:?}", path))
}

fn read_stdin() -> Result<String> {
    let mut idea = String::new();
    std::io::stdin()
        .read_to_string(&mut idea)
        .context("Failed to read idea from stdin")?;
    if idea.trim().is_empty() {
        bail!("No idea given: pass it as an argument or on stdin");
    }
    Ok(idea)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
