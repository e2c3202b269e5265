mod api;
mod auth;
mod config;
mod oauth;
mod state;
mod user_data;
mod utils;

use std::sync::Arc;

use api::app_router;
use auth::AuthStore;
use catalog::{CatalogClient, DescriptionEnricher};
use config::{apply_env_overrides, config_path_from_env, load_or_create_config, resolve_path};
use oauth::GoogleOAuth;
use reqwest::Client;
use state::AppState;
use tracing::{info, warn};
use user_data::{open_or_create_db, UserDataStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = config_path_from_env();
    let (mut config, created) = load_or_create_config(&config_path)?;
    if created {
        info!("Created default config at {:?}", config_path);
    } else {
        info!("Loaded config from {:?}", config_path);
    }
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    let catalog_settings = config.catalog_settings();
    if !catalog_settings.credentials.is_configured() {
        warn!("Spotify credentials are not set; catalog routes will fail until they are.");
    }
    if config.lastfm_api_key.trim().is_empty() {
        warn!("Last.fm API key is not set; artist descriptions will be empty.");
    }

    let data_path = resolve_path(&config_path, config.data_path.trim());
    let db = Arc::new(open_or_create_db(&data_path)?);
    info!("Opened database at {:?}", data_path);

    let auth = AuthStore::new(Arc::clone(&db), config.session_ttl());
    if let Err(err) = auth.init_tables() {
        warn!("Failed to create auth tables: {}", err);
    }
    match auth.purge_expired_sessions() {
        Ok(0) => {}
        Ok(removed) => info!("Removed {} expired sessions", removed),
        Err(err) => warn!("Failed to purge expired sessions: {}", err),
    }
    let user_data = UserDataStore::new(Arc::clone(&db));
    if let Err(err) = user_data.init_tables() {
        warn!("Failed to create user data tables: {}", err);
    }

    let http = Client::builder().user_agent("bandline/0.1").build()?;
    let oauth = GoogleOAuth::from_config(http.clone(), &config);
    if oauth.is_none() {
        info!("Google login disabled; set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET to enable it.");
    }
    let state = AppState {
        catalog: CatalogClient::from_settings(http.clone(), &catalog_settings),
        enricher: DescriptionEnricher::new(
            http,
            config.lastfm_api_base.clone(),
            config.lastfm_api_key.clone(),
            config.upstream_timeout(),
            config.upstream_retries,
        ),
        oauth,
        auth,
        user_data,
        config: Arc::new(config),
    };

    let port = if state.config.port == 0 { 3000 } else { state.config.port };
    let bind_addr = format!("0.0.0.0:{}", port);
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                warn!("Failed to install terminate signal handler: {}", err);
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", err);
        }
    }

    info!("Shutdown signal received.");
}
