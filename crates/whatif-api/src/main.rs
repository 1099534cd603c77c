use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use whatif_api::{build_router, config::Config, state::AppState};
use whatif_generation::{GenerationGateway, GenerationProvider, GenerationSettings, LlmProvider, ResponseCache};
use whatif_llm::{ApiConfig, ClientFactory, ProviderConfig};
use whatif_persist::{load_manager, JsonFileStore, PersistenceClient};
use whatif_tree::SystemClock;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting what-if timeline server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    // Generation
    let provider = build_provider(&config)?;
    let cache = ResponseCache::new(config.cache.ttl());
    let gateway = GenerationGateway::new(provider).with_cache(cache);

    // Saved timelines
    let persist: Arc<dyn PersistenceClient> = Arc::new(JsonFileStore::new(&config.storage.path));
    let manager = load_manager(persist.as_ref(), Arc::new(SystemClock), config.storage.max_timelines).await?;
    tracing::info!(path = %config.storage.path.display(), timelines = manager.len(), "Timeline storage ready");

    let state = Arc::new(AppState::new(config.clone(), manager, gateway, persist));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// A missing API key still yields a provider; generation requests report it
fn build_provider(config: &Config) -> anyhow::Result<Arc<dyn GenerationProvider>> {
    let provider_type = config.llm.provider;
    let settings = GenerationSettings::from(&config.llm);

    let Some(api_key) = config.api_key() else {
        tracing::warn!(
            "{} is not set; generation requests will fail until it is configured",
            provider_type.api_key_env()
        );
        return Ok(Arc::new(LlmProvider::unconfigured(provider_type).with_settings(settings)));
    };

    let mut api = ApiConfig::new(api_key);
    if let Some(base_url) = &config.llm.base_url {
        api = api.with_base_url(base_url.clone());
    }
    let client = ClientFactory::create_chat_client(ProviderConfig::for_provider(provider_type, api))?;
    tracing::info!(provider = ?provider_type, model = %config.llm.model, "LLM client initialized");

    Ok(Arc::new(LlmProvider::new(client, provider_type).with_settings(settings)))
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        }
        _ => {
            registry.with(tracing_subscriber::fmt::layer().pretty()).init();
        }
    }
}
