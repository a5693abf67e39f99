mod error;
mod models;
mod services;
mod utils;

use axum::{
    Router,
    extract::{Json, State},
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{EnvFilter, fmt};

use error::AppError;
use models::GenerateRequest;
use services::llm::LanguageModel;
use services::store::DocumentStore;

#[derive(Clone)]
struct AppState {
    store: Arc<dyn DocumentStore>,
    llm: Arc<dyn LanguageModel>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let app_state = AppState {
        store: Arc::new(services::store::GoogleDocumentStore::new()?),
        llm: Arc::new(services::llm::GeminiClient::new()?),
    };

    let app = Router::new()
        .route("/", post(generate))
        .route("/health", get(health_check))
        .with_state(app_state)
        // Permissive CORS: every response carries Allow-Origin *, and the
        // layer answers preflight requests itself.
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::AllowMethods::any())
                .allow_headers(tower_http::cors::AllowHeaders::any()),
        );

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let listener = TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn generate(
    State(state): State<AppState>,
    payload: Option<Json<GenerateRequest>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Some(Json(payload)) = payload else {
        return Err(AppError::InvalidPayload);
    };

    match payload.action.as_deref().unwrap_or("generate_presentation") {
        "generate_presentation" => {
            let response =
                services::pipeline::generate_presentation(&*state.store, &*state.llm, &payload)
                    .await?;
            Ok(Json(serde_json::to_value(response).unwrap_or_default()))
        }
        "generate_speaker_notes" => {
            let notes =
                services::pipeline::generate_speaker_notes(&*state.llm, &payload).await?;
            Ok(Json(serde_json::json!({"notes": notes})))
        }
        other => Err(AppError::UnknownAction(other.to_string())),
    }
}
