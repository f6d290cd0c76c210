use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use fixture_aggregator::config::Config;
use fixture_aggregator::providers::{ApiFootball, SportMonks};
use fixture_aggregator::server::{self, AppState};
use fixture_aggregator::{Aggregator, FixtureProvider, HealthTracker, IdentityResolver, ProviderTag};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let providers = build_providers(&config)?;
    let order: Vec<&str> = providers.iter().map(|p| p.name()).collect();
    info!("Provider order: {}", order.join(" -> "));

    let health = Arc::new(HealthTracker::new(config.health_policy()));
    let resolver = IdentityResolver::new(config.name_matcher());
    let aggregator = Arc::new(
        Aggregator::new(providers, health, resolver)?
            .with_form_lookback(config.form_lookback)
            .with_max_range_days(config.max_range_days),
    );

    for report in aggregator.test_connection().await {
        match report.error {
            None => info!(
                "{} reachable, {} fixtures today",
                report.provider, report.fixtures_today
            ),
            Some(e) => warn!("{} not reachable: {}", report.provider, e),
        }
    }

    let app = server::router(AppState { aggregator });
    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Adapters for every provider with credentials, primary first.
fn build_providers(config: &Config) -> Result<Vec<Arc<dyn FixtureProvider>>> {
    let mut providers: Vec<Arc<dyn FixtureProvider>> = Vec::new();
    for tag in config.provider_order() {
        let Some(key) = config.key_for(tag) else {
            continue;
        };
        let settings = config.client_settings(tag);
        match tag {
            ProviderTag::ApiFootball => {
                providers.push(Arc::new(ApiFootball::new(key, &settings, &config.timezone)?))
            }
            ProviderTag::SportMonks => providers.push(Arc::new(SportMonks::new(key, &settings)?)),
        }
    }
    Ok(providers)
}
