use crate::components::{
    CredentialStore, EventLedger, GeminiExtractor, GoogleCalendarPublisher, GoogleOAuthClient,
    InMemoryStore, RedisStore, WhatsAppClient,
};
use crate::config::Config;
use crate::conversation::{Collaborators, ControllerSettings, ConversationController};
use crate::error::{BotResult, Error};
use crate::shutdown;
use crate::web::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Redis when reachable, otherwise a process-local store
async fn open_store(config: &Config) -> (Arc<dyn CredentialStore>, Arc<dyn EventLedger>) {
    let store = match RedisStore::new(&config.redis_url) {
        Ok(store) => store.ping().await.map(|_| store),
        Err(e) => Err(e),
    };

    match store {
        Ok(store) => {
            info!("Connected to Redis at {}", config.redis_url);
            let store = Arc::new(store);
            (store.clone(), store)
        }
        Err(e) => {
            warn!(
                "Failed to connect to Redis: {:?}, falling back to in-memory storage",
                e
            );
            let store = Arc::new(InMemoryStore::new());
            (store.clone(), store)
        }
    }
}

/// Wire the production collaborators into router state
pub async fn build_state(config: &Config) -> BotResult<AppState> {
    let (credentials, ledger) = open_store(config).await;
    let oauth = Arc::new(GoogleOAuthClient::new(config));

    let services = Collaborators {
        messenger: Arc::new(WhatsAppClient::new(config)),
        extractor: Arc::new(GeminiExtractor::new(config)?),
        credentials: Arc::clone(&credentials),
        ledger,
        refresher: oauth.clone(),
        publisher: Arc::new(GoogleCalendarPublisher::new(config)?),
    };
    let controller = ConversationController::new(services, ControllerSettings::from_config(config)?);

    Ok(AppState {
        controller: Arc::new(controller),
        verify_token: config.whatsapp_verify_token.clone(),
        oauth,
        credentials,
    })
}

/// Run the webhook server until a shutdown signal arrives
pub async fn serve(config: Config) -> miette::Result<()> {
    // Set locale from config
    rust_i18n::set_locale(&config.bot_locale);
    info!("Setting locale to {}", config.bot_locale);

    let state = build_state(&config).await?;
    let app = web::router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .map_err(|e| Error::Config(format!("Invalid bind address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(Error::from)?;
    info!("Listening on {}", addr);
    info!("Webhook URL: {}{}", config.public_base_url, web::WEBHOOK_PATH);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::wait_for_signal())
        .await
        .map_err(Error::from)?;

    info!("Server stopped");
    Ok(())
}
