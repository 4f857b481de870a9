//! fhir-synth: synthetic FHIR clinical data generator binary entrypoint.

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fhir_synth::config::Config;
use fhir_synth::startup;

#[derive(Parser)]
#[command(name = "fhir-synth")]
#[command(about = "Generate synthetic clinical data, in prose or FHIR, with retrieval and web tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session on the terminal (default)
    Repl,
    /// Serve the web form and JSON API
    Serve {
        /// Address to bind, overrides BIND_ADDRESS
        #[arg(long)]
        bind: Option<String>,
    },
    /// Build the vector index and write it to INDEX_PATH
    Index,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Logs go to stderr so the REPL output stays readable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    match run(cli.command.unwrap_or(Commands::Repl)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fhir-synth failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    match command {
        Commands::Index => {
            let Some(path) = config.index_path.clone() else {
                return Err("INDEX_PATH must be set to write the index".into());
            };
            let embedder = startup::embedder(&config)?;
            let index = startup::build_index(&config, embedder.as_ref()).await?;
            index.save(&path)?;
            println!(
                "Indexed {} passages with {} into {}",
                index.len(),
                index.embedding_model(),
                path.display()
            );
        }
        Commands::Repl => {
            println!("Loading settings.");
            println!("Initialising agent.");
            let components = startup::initialize(&config).await?;
            let stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            fhir_synth::cli::run_repl(&components, stdin, &mut stdout).await?;
        }
        Commands::Serve { bind } => {
            let components = startup::initialize(&config).await?;
            tracing::info!(
                passages = components.index.len(),
                tools = ?components.pipeline.tool_names(),
                "Components ready"
            );
            tracing::info!("Rate limiting: {} requests/second", config.rate_limit_rps);

            let app = fhir_synth::build_app(components, &config);

            let addr: SocketAddr = bind.unwrap_or_else(|| config.bind_address.clone()).parse()?;
            tracing::info!("Starting fhir-synth web server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            tracing::info!("Server shutdown complete");
        }
    }

    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
