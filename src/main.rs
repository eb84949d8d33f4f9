use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use product_preview::{ApiServerBuilder, Config, PreviewService};

/// Product Preview - link-preview cards for product pages
#[derive(Parser)]
#[command(name = "product-preview", version, about)]
struct Cli {
    /// Port to listen on (overrides `PORT` and the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Preview a single URL and print the JSON result
    Fetch {
        /// Page to preview
        url: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; RUST_LOG wins when set
    let filter = match cli.verbose {
        0 => "info,product_preview=info",
        1 => "info,product_preview=debug",
        2 => "debug",
        _ => "trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    tracing::debug!(?config, "loaded configuration");

    let service = Arc::new(PreviewService::from_config(&config)?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            tracing::info!(
                port = config.server.port,
                cache_ttl_secs = config.cache.ttl.as_secs(),
                "starting product preview server"
            );

            ApiServerBuilder::new(service)
                .port(config.server.port)
                .cors_origins(config.server.cors_origins)
                .build()
                .run()
                .await?;
        }
        Command::Fetch { url } => {
            let result = service.preview_or_empty(Some(&url)).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
