mod analytics;
mod api;
mod auth;
mod domain;
mod rating;
mod steps;
mod store;
mod wizard;

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Request},
    middleware::{Next, from_fn},
    routing::{delete, get, post},
};
use case_flow::{FlowStore, InMemoryFlowStore, InMemorySessionStore, SessionStore};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::api::AppState;

/// Initialize structured tracing based on environment variables.
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "insurance_service=debug,case_flow=debug,tower_http=debug".into());

    match log_format.as_str() {
        "pretty" => {
            // Human-readable logging for development
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            // Structured JSON logging for production
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

/// Middleware adding a correlation id to every request span.
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // All state is in-memory and session-scoped; a restart starts from the
    // seeded sample data.
    let flow_store = Arc::new(InMemoryFlowStore::new());
    let case_sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());

    flow_store
        .save(
            wizard::CASE_FLOW_ID.to_string(),
            Arc::new(wizard::create_case_flow()),
        )
        .await?;
    let case_flow = flow_store
        .get(wizard::CASE_FLOW_ID)
        .await?
        .ok_or_else(|| anyhow::anyhow!("case flow not registered"))?;

    let app_state = AppState::new(case_flow, case_sessions);

    let app = Router::new()
        .route("/health", get(api::health_check))
        .route("/login", post(api::login))
        .route("/logout", post(api::logout))
        .route("/dashboard", get(api::dashboard))
        .route("/policies", get(api::list_policies))
        .route("/policies/{id}", get(api::get_policy))
        .route("/claims", get(api::list_claims).post(api::submit_claim))
        .route("/claims/{id}", delete(api::delete_claim))
        .route("/payments", get(api::list_payments).post(api::record_payment))
        .route("/agents", get(api::list_agents))
        .route("/activities", get(api::list_activities))
        .route("/analytics", get(api::analytics))
        .route("/cases", get(api::list_cases))
        .route("/cases/execute", post(api::execute_case))
        .route("/cases/sessions/{id}", get(api::get_case_session))
        .layer(from_fn(correlation_id_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Server running on http://{bind_addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
