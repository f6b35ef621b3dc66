// Command line WebFinger lookup

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use webfinger::{Reaction, WebFinger, WebFingerConfig};

#[derive(Parser)]
#[command(name = "webfinger")]
#[command(about = "Discover WebFinger information about an account", long_about = None)]
struct Cli {
    /// Account to look up, e.g. user@example.org
    identifier: String,

    /// Retry the WebFinger request over plain HTTP if HTTPS fails
    #[arg(long)]
    fallback_http: bool,

    /// Accept invalid TLS certificates
    #[arg(long)]
    insecure: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,

    /// Cache documents in this SQLite database
    #[cfg(feature = "sqlite")]
    #[arg(long)]
    cache: Option<std::path::PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = WebFingerConfig {
        fallback_to_http: cli.fallback_http,
        verify_ssl_cert: !cli.insecure,
        timeout: Duration::from_secs(cli.timeout),
        ..Default::default()
    };
    let mut client = WebFinger::new(config).context("failed to set up HTTP client")?;

    #[cfg(feature = "sqlite")]
    if let Some(path) = &cli.cache {
        let store = webfinger::SqliteCacheStore::open(path)
            .with_context(|| format!("failed to open cache {}", path.display()))?;
        client = client.with_cache(Arc::new(store));
    }
    #[cfg(not(feature = "sqlite"))]
    {
        client = client.with_cache(Arc::new(webfinger::MemoryCacheStore::new()));
    }

    if !cli.json {
        println!("Discovering {}", cli.identifier);
    }
    let reaction = client.finger(&cli.identifier).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reaction)?);
    } else {
        print_reaction(&reaction);
    }

    Ok(if reaction.primary_document().is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_reaction(reaction: &Reaction) {
    println!("Information secure? {}", reaction.is_secure());

    if let Some(err) = reaction.error() {
        println!("Error: {err}");
        for cause in err.chain().skip(1) {
            println!("  caused by: {cause}");
        }
    }

    match reaction.openid() {
        Some(provider) => println!("OpenID provider: {provider}"),
        None => println!("No OpenID provider found"),
    }

    for link in reaction.links() {
        println!("Link: {}: {}", link.rel, link.target().unwrap_or_default());
    }
}
