use std::path::PathBuf;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;

use feedgate::api::{self, AppState};
use feedgate::cache::FeedCache;
use feedgate::config::Settings;
use feedgate::resolver::ConfigResolver;

#[derive(Parser, Debug)]
#[command(
    name = "feedgate",
    about = "Content portal backend republishing blog, video and podcast feeds"
)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Path to the TOML settings file
    #[arg(short, long, default_value = "feedgate.toml")]
    config: PathBuf,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::load(&args.config).context("Failed to load settings")?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("feedgate/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let state = web::Data::new(AppState {
        cache: FeedCache::new(client.clone(), settings.feed_ttl(), settings.fetch_timeout()),
        resolver: ConfigResolver::new(client, &settings),
    });

    let address = format!("{}:{}", args.bind, args.port);
    tracing::info!(
        address = %address,
        feed_ttl_seconds = settings.feed_ttl_seconds,
        config_url = settings.config_url.as_deref().unwrap_or("<none>"),
        "Starting feedgate"
    );

    HttpServer::new(move || App::new().app_data(state.clone()).configure(api::configure))
        .bind(&address)
        .with_context(|| format!("Failed to bind {address}"))?
        .run()
        .await?;

    Ok(())
}
