mod config;
mod errors;
mod llm_client;
mod models;
mod routes;
mod session;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_config::timeout::TimeoutConfig;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{BackendKind, Config, StoreKind};
use crate::llm_client::{
    AdviceClient, AnthropicBackend, BedrockBackend, InferenceParams, ModelBackend,
};
use crate::routes::build_router;
use crate::session::freshness::FreshnessPolicy;
use crate::session::registry::SessionRegistry;
use crate::session::SessionSettings;
use crate::state::AppState;
use crate::store::{DynamoProfileStore, MemoryProfileStore, ProfileStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing or malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting BeneLinc API v{}", env!("CARGO_PKG_VERSION"));

    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .load()
        .await;
    info!("AWS config loaded (region: {})", config.aws_region);

    // Initialize profile store and run the one-time capability check
    let store = build_store(&config, &sdk_config);
    let store_check_error = match store.check_ready().await {
        Ok(()) => {
            info!("Profile store ready ({})", store.backend_name());
            None
        }
        Err(e) => {
            warn!("Profile store check failed: {e}; sessions will run without persistence until it recovers");
            Some(e.to_string())
        }
    };

    // Initialize advice client
    let advisor = build_advisor(&config, &sdk_config)?;
    info!("Advice client initialized (model: {})", advisor.model_id());

    let sessions = Arc::new(SessionRegistry::new(
        SessionSettings {
            freshness: FreshnessPolicy::default(),
            store_timeout: config.store_timeout,
        },
        config.session_idle,
    ));

    let state = AppState {
        store,
        advisor,
        sessions,
        config: config.clone(),
        store_check_error,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the UI host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_store(config: &Config, sdk_config: &SdkConfig) -> Arc<dyn ProfileStore> {
    match config.store_kind {
        StoreKind::Memory => {
            warn!("Using in-memory profile store; profiles will not survive a restart");
            Arc::new(MemoryProfileStore::new())
        }
        StoreKind::DynamoDb => {
            let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config).timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(config.store_timeout)
                    .build(),
            );
            if let Some(endpoint) = &config.dynamodb_endpoint {
                info!("Using DynamoDB endpoint override {endpoint}");
                builder = builder.endpoint_url(endpoint);
            }
            let client = aws_sdk_dynamodb::Client::from_conf(builder.build());
            Arc::new(DynamoProfileStore::new(client, config.benefits_table.clone()))
        }
    }
}

fn build_advisor(config: &Config, sdk_config: &SdkConfig) -> Result<AdviceClient> {
    let backend: Arc<dyn ModelBackend> = match config.backend_kind {
        BackendKind::Bedrock => {
            let client = aws_sdk_bedrockruntime::Client::new(sdk_config);
            Arc::new(BedrockBackend::new(client, config.bedrock_model_id.clone())?)
        }
        BackendKind::Anthropic => {
            let api_key = config
                .anthropic_api_key
                .clone()
                .context("ANTHROPIC_API_KEY is required for the anthropic backend")?;
            Arc::new(AnthropicBackend::new(api_key, config.anthropic_model.clone())?)
        }
    };

    Ok(AdviceClient::new(
        backend,
        InferenceParams {
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
        },
        config.advice_timeout,
    ))
}
