use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use hearth_agent::ollama::OllamaRelay;
use hearth_agent::prompt::{ModeProfiles, PromptBuilder};
use hearth_core::config::HearthConfig;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
/// Everything here is read-only after startup.
pub struct AppState {
    pub config: HearthConfig,
    pub prompt: PromptBuilder,
    pub relay: OllamaRelay,
}

impl AppState {
    pub fn new(config: HearthConfig) -> Self {
        let prompt = PromptBuilder::new(ModeProfiles::from_config(&config.modes));
        let relay = OllamaRelay::from_config(&config);
        Self {
            config,
            prompt,
            relay,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(&state.config.web.uploads_dir);
    let site = ServeDir::new(&state.config.web.static_dir);
    let upload_limit = DefaultBodyLimit::max(state.config.web.max_upload_bytes);

    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/chat", post(crate::http::chat::chat_handler))
        .route(
            "/upload-image",
            post(crate::http::upload::upload_handler).layer(upload_limit),
        )
        .nest_service(crate::http::upload::UPLOADS_ROUTE, uploads)
        .fallback_service(site)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
