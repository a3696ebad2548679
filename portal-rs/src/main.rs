use portal_rs::api::auth::JwtConfig;
use portal_rs::api::{ApiServer, AppState};
use portal_rs::config::Config;
use portal_rs::mailhost::{DirectAdminClient, MailHost};
use portal_rs::provisioning::Provisioner;
use portal_rs::store::Store;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = if std::path::Path::new("config.toml").exists() {
        Config::from_file("config.toml")?
    } else {
        Config::default()
    };

    // Initialize logging
    let level = config
        .logging
        .level
        .parse::<Level>()
        .unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Starting portal-rs server");
    info!("  Listening on: {}", config.server.listen_addr);
    info!("  Database: {}", config.storage.database_url);
    info!("  Mail host: {}", config.mailhost.base_url);

    // Initialize storage
    let store = Store::connect(&config.storage.database_url).await?;

    // Mail host client
    let host: Arc<dyn MailHost> = Arc::new(DirectAdminClient::new(&config.mailhost)?);
    if !host.test_connection().await {
        warn!("Mail host is unreachable, provisioning will fail until it recovers");
    }

    let provisioner = Provisioner::new(
        store.clone(),
        host.clone(),
        config.provisioning.default_quota_mb,
        config.provisioning.password_length,
    );

    let state = Arc::new(AppState {
        store,
        jwt_config: JwtConfig::new(
            config.auth.jwt_secret.clone(),
            config.auth.token_expiration_hours,
        ),
        provisioner,
        host,
    });

    let server = ApiServer::new(state, config.server.listen_addr.clone());
    server.run().await?;

    Ok(())
}
