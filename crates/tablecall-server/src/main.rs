use axum::{routing::get, Json, Router};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod adapters;
mod application;
mod config;
mod models;
mod routes;
mod signature;

use adapters::{OpenAiExtractionProvider, PgCallRepository};
use application::{ExtractionService, WebhookService};
use config::AppConfig;
use signature::SignatureVerifier;
use tablecall::{CallRepository, ClassifierConfig, ExtractionProvider, OutcomeClassifier};

/// Webhook service wired to runtime-selected adapters
pub type AppWebhookService = WebhookService<dyn CallRepository, dyn ExtractionProvider>;

/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub webhook_service: Arc<AppWebhookService>,
}

#[derive(Serialize)]
struct HealthCheck {
    status: String,
    message: String,
    version: String,
}

async fn health_check() -> Json<HealthCheck> {
    Json(HealthCheck {
        status: "ok".to_string(),
        message: "Tablecall is listening for provider webhooks".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[shuttle_runtime::main]
async fn main(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_runtime::Secrets] secrets: shuttle_runtime::SecretStore,
) -> shuttle_axum::ShuttleAxum {
    tracing::info!("📞 Tablecall initializing...");

    let config = AppConfig::from_lookup(|key| secrets.get(key))?;
    tracing::info!("🔐 Webhook signature verification enabled");

    // Run migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run database migrations: {e}"))?;

    tracing::info!("✅ Database migrations completed");

    // Initialize extraction provider if configured
    let provider: Option<Arc<dyn ExtractionProvider>> = match &config.openai_api_key {
        Some(key) => {
            let provider = OpenAiExtractionProvider::new(
                key.clone(),
                config.extraction_model.clone(),
                config.extraction_timeout,
            )
            .map_err(|e| anyhow::anyhow!(e.to_string()))?
            .with_base_url(config.extraction_base_url.clone());
            tracing::info!("🧾 Extraction provider initialized ({})", config.extraction_model);
            Some(Arc::new(provider))
        }
        None => {
            tracing::warn!("⚠️  No OPENAI_API_KEY set - extraction will fail fast");
            None
        }
    };

    // Initialize application services
    let repo: Arc<dyn CallRepository> = Arc::new(PgCallRepository::new(pool));
    let classifier = OutcomeClassifier::new(ClassifierConfig {
        human_min_duration_ms: config.human_min_duration_ms,
        ..ClassifierConfig::default()
    });
    let extraction = ExtractionService::new(
        provider,
        config.extraction_timeout,
        config.extraction_lease,
    );
    let webhook_service = Arc::new(WebhookService::new(
        repo,
        SignatureVerifier::new(config.webhook_secret.clone(), config.signature_tolerance),
        classifier,
        extraction,
    ));

    tracing::info!("🔔 Webhook service initialized");

    let state = AppState { webhook_service };

    // OpenAPI documentation
    let openapi = routes::swagger::ApiDoc::openapi();

    // Build router with shared state
    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .route("/health", get(health_check))
        .merge(routes::webhook::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    tracing::info!("📚 Swagger UI: /swagger-ui");
    tracing::info!("✅ Tablecall ready");

    Ok(router.into())
}
