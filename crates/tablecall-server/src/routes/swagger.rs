//! OpenAPI Documentation
//!
//! Centralized API documentation using utoipa.

use utoipa::OpenApi;

use crate::models::{CallAnalysis, ProviderCall, ProviderTurn, ProviderWebhook, ProviderWord, WebhookAck};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::webhook::receive_provider_webhook,
    ),
    info(
        title = "Tablecall API",
        version = "0.1.0",
        description = "Call lifecycle ingestion for the restaurant calling agent.\n\nReceives signed provider webhooks, classifies outcomes and extracts reservation results.",
        license(name = "MIT"),
    ),
    servers(
        (url = "/", description = "Current server"),
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Webhook", description = "Voice provider lifecycle webhooks"),
    ),
    components(
        schemas(
            ProviderWebhook,
            ProviderCall,
            ProviderTurn,
            ProviderWord,
            CallAnalysis,
            WebhookAck,
        )
    ),
)]
pub struct ApiDoc;
