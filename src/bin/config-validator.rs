//! # Docflow Configuration Validator
//!
//! Command-line tool for validating Docflow configuration files across environments.
//! Catches configuration issues before the workflow engine starts.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docflow_core::config::{ConfigManager, DocflowConfig, StorageConfig};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate Docflow configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to validate (development, test, production, ...)
    #[arg(short, long, env = "DOCFLOW_ENV", default_value = "development")]
    environment: String,

    /// Configuration directory path (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate all configuration sections
    All,

    /// Validate a single configuration section
    Component {
        /// Section name (engine, dependency, sla, events, notifications, storage, logging)
        name: String,
    },

    /// List environments that have an overlay file
    Environments,

    /// Print the effective configuration with credentials masked
    Show,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::All) | None => validate_all_config(&cli),
        Some(Commands::Component { name }) => validate_component(&cli, name),
        Some(Commands::Environments) => list_environments(&cli),
        Some(Commands::Show) => show_config(&cli),
    };

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {:#}", e);
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> Result<std::sync::Arc<ConfigManager>> {
    ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &cli.environment)
        .with_context(|| format!("loading configuration for '{}'", cli.environment))
}

fn validate_all_config(cli: &Cli) -> Result<()> {
    println!("🔧 Validating Docflow Configuration");
    println!("Environment: {}", cli.environment);

    let manager = load(cli)?;
    println!(
        "Config Directory: {}",
        manager.config_directory().display()
    );
    println!("✅ Configuration loaded and validated");
    println!();

    let config = manager.config();
    validate_engine_config(config)?;
    validate_dependency_config(config)?;
    validate_sla_config(config)?;
    validate_events_config(config)?;
    validate_notifications_config(config)?;
    validate_storage_config(config)?;
    validate_logging_config(config)?;

    println!("\n🎉 All configuration validation checks passed!");
    Ok(())
}

fn validate_component(cli: &Cli, component_name: &str) -> Result<()> {
    println!("🔧 Validating Component: {component_name}");

    let manager = load(cli)?;
    let config = manager.config();

    match component_name.to_lowercase().as_str() {
        "engine" => validate_engine_config(config)?,
        "dependency" => validate_dependency_config(config)?,
        "sla" => validate_sla_config(config)?,
        "events" => validate_events_config(config)?,
        "notifications" => validate_notifications_config(config)?,
        "storage" => validate_storage_config(config)?,
        "logging" => validate_logging_config(config)?,
        _ => bail!("Unknown component: {component_name}"),
    }

    println!("✅ Component '{component_name}' validation passed!");
    Ok(())
}

fn list_environments(cli: &Cli) -> Result<()> {
    let dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("config"));
    println!("📋 Environments in {}:", dir.display());

    let environments = environment_overlays(&dir)?;
    if environments.is_empty() {
        println!("  (none; only built-in defaults and docflow.toml apply)");
    }
    for env in environments {
        println!("  • {env}");
    }
    Ok(())
}

fn show_config(cli: &Cli) -> Result<()> {
    let manager = load(cli)?;
    println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
    Ok(())
}

/// Environment names of `docflow.<env>.toml` files in `dir`
fn environment_overlays(dir: &Path) -> Result<BTreeSet<String>> {
    let mut environments = BTreeSet::new();
    if !dir.is_dir() {
        return Ok(environments);
    }
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(env) = name
            .strip_prefix("docflow.")
            .and_then(|rest| rest.strip_suffix(".toml"))
        {
            environments.insert(env.to_string());
        }
    }
    Ok(environments)
}

// Component validation functions

fn validate_engine_config(config: &DocflowConfig) -> Result<()> {
    println!("⚙️  Validating Engine Configuration...");
    let engine = &config.engine;
    if engine.max_conflict_retries == 0 {
        println!("   ⚠️  Conflict retries disabled; concurrent decisions will surface conflicts");
    }
    println!(
        "   ✅ Conflict retries: {} (backoff {}ms..{}ms)",
        engine.max_conflict_retries, engine.retry_backoff_base_ms, engine.retry_backoff_max_ms
    );
    Ok(())
}

fn validate_dependency_config(config: &DocflowConfig) -> Result<()> {
    println!("🔗 Validating Dependency Configuration...");
    println!(
        "   ✅ Child rejection policy: {}",
        config.dependency.child_rejection_policy
    );
    Ok(())
}

fn validate_sla_config(config: &DocflowConfig) -> Result<()> {
    println!("⏱️  Validating SLA Configuration...");
    let sla = &config.sla;
    if sla.enabled && sla.sweep_interval_seconds > sla.timeout_seconds {
        println!("   ⚠️  Sweep interval exceeds the timeout; overdue reports will lag");
    }
    println!(
        "   ✅ Enabled: {}, timeout {}s, sweep every {}s",
        sla.enabled, sla.timeout_seconds, sla.sweep_interval_seconds
    );
    Ok(())
}

fn validate_events_config(config: &DocflowConfig) -> Result<()> {
    println!("📡 Validating Events Configuration...");
    println!("   ✅ Channel capacity: {}", config.events.channel_capacity);
    Ok(())
}

fn validate_notifications_config(config: &DocflowConfig) -> Result<()> {
    println!("🔔 Validating Notifications Configuration...");
    let timeout_ms = config.notifications.timeout_ms;
    if timeout_ms > 30_000 {
        println!("   ⚠️  Hook timeout above 30s; a stuck transport delays every submission");
    }
    println!("   ✅ Hook timeout: {timeout_ms}ms");
    Ok(())
}

fn validate_storage_config(config: &DocflowConfig) -> Result<()> {
    println!("🗄️  Validating Storage Configuration...");
    match &config.storage {
        StorageConfig::Memory => {
            println!("   ℹ️  In-memory storage; state is lost on restart");
        }
        StorageConfig::Postgres {
            url,
            max_connections,
        } => {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                bail!("storage.url must be a postgres:// URL");
            }
            println!("   ✅ PostgreSQL storage (max {max_connections} connections)");
        }
    }
    Ok(())
}

fn validate_logging_config(config: &DocflowConfig) -> Result<()> {
    println!("📝 Validating Logging Configuration...");
    println!(
        "   ✅ Level: {}, format: {}",
        config.logging.level.as_deref().unwrap_or("environment default"),
        if config.logging.json { "json" } else { "text" }
    );
    Ok(())
}
