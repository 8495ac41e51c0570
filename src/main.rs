use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spotify_etl::api::{create_auth_router, AuthAppState};
use spotify_etl::config::{load_config, EtlConfig};
use spotify_etl::credentials::{FileTokenStore, TokenStore};
use spotify_etl::oauth::{OAuthExchanger, OAuthProvider, StateManager};
use spotify_etl::pipeline::EtlPipeline;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(about = "Record recently played tracks into a local SQLite store")]
struct Cli {
    /// TOML config file; SPOTIFY_* environment variables override it
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve /login and /callback to obtain an access token
    Serve,
    /// Run one extract-transform-load cycle
    Run,
    /// Exchange an authorization code copied from the redirect URL
    Exchange {
        /// Authorization code
        code: String,
    },
    /// Print the provider authorization URL
    AuthorizeUrl,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spotify_etl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EtlConfig::default(),
    }
    .apply_env();

    let token_store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&config.store.token_path));

    match cli.command {
        Commands::Serve => serve(&config, token_store).await,
        Commands::Run => run(&config, token_store).await,
        Commands::Exchange { code } => exchange(&config, token_store.as_ref(), &code).await,
        Commands::AuthorizeUrl => {
            config.validate_oauth()?;
            // no state: only the serving process can issue one /callback accepts
            println!("{}", OAuthProvider::new(&config.oauth).authorize_url(None));
            Ok(())
        }
    }
}

async fn serve(config: &EtlConfig, token_store: Arc<dyn TokenStore>) -> Result<()> {
    config.validate_oauth()?;

    let state = AuthAppState {
        exchanger: Arc::new(OAuthExchanger::new(&config.oauth)?),
        provider: OAuthProvider::new(&config.oauth),
        token_store,
        state_manager: StateManager::new(config.server.state_expiry_seconds),
    };

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.server.port))
        .await
        .context("Failed to bind callback port")?;
    info!(
        port = config.server.port,
        redirect_uri = %config.oauth.redirect_uri,
        "Authorization endpoint listening, open /login to start"
    );

    axum::serve(listener, create_auth_router(state))
        .await
        .context("Authorization endpoint server error")?;
    Ok(())
}

async fn run(config: &EtlConfig, token_store: Arc<dyn TokenStore>) -> Result<()> {
    let mut pipeline = EtlPipeline::from_config(config, token_store)
        .context("Failed to initialize ETL pipeline")?;
    pipeline.run_once().await?;
    Ok(())
}

async fn exchange(config: &EtlConfig, token_store: &dyn TokenStore, code: &str) -> Result<()> {
    config.validate_oauth()?;

    let credential = OAuthExchanger::new(&config.oauth)?
        .exchange(code)
        .await
        .context("Authorization code exchange failed")?;
    token_store
        .put(&credential)
        .context("Failed to store credential")?;

    info!(expires_at = ?credential.expires_at, "Credential stored");
    Ok(())
}
