mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use mediarelay_core::config::{Config, RelayMode};
use mediarelay_core::{Metadata, SourceUrl};
use mediarelay_fetch::{MediaSource, YtDlp};
use std::path::Path;

fn load_config(path: Option<&Path>) -> Config {
    let mut config = Config::load_or_default(path);
    config.apply_env();
    config
}

async fn start_server(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let mut config = load_config(config_path);

    // CLI flags win over the config file and $PORT
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting mediarelay");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    mediarelay_server::start(config).await?;
    Ok(())
}

async fn resolve(config_path: Option<&Path>, raw_url: &str) -> Result<()> {
    let config = load_config(config_path);
    let url = SourceUrl::parse(Some(raw_url))?;

    let source = YtDlp::new(config.downloader.clone());
    let info = source
        .resolve_metadata(&url)
        .await
        .with_context(|| format!("Failed to resolve {url}"))?;

    let metadata = match config.relay.mode {
        RelayMode::Proxy => Metadata::proxied(info, &url)?,
        RelayMode::Direct => Metadata::direct(info)?,
    };

    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mediarelay=trace,mediarelay_server=trace,mediarelay_fetch=trace,mediarelay_core=debug,tower_http=debug".to_string()
        } else {
            "mediarelay=info,mediarelay_server=info,mediarelay_fetch=info,mediarelay_core=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(cli.config.as_deref(), host, port))
        }
        Commands::Resolve { url } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(resolve(cli.config.as_deref(), &url))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("mediarelay {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let tool = YtDlp::new(config.downloader).check();

    if tool.available {
        print!("✓ {}", tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
        Ok(())
    } else {
        println!("✗ {}", tool.name);
        anyhow::bail!("{} is not installed or not in PATH", tool.name)
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = Config::load(p).with_context(|| format!("Failed to load {:?}", p))?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Downloader: {}", config.downloader.program);
    println!("  Relay mode: {:?}", config.relay.mode);

    for warning in config.validate() {
        println!("  warning: {warning}");
    }

    Ok(())
}
