use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::error::AppError;
use crate::inference::InferenceService;
use crate::settings::ServerSettings;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            AppError::Validation(s) => (StatusCode::BAD_REQUEST, s),
            AppError::InternalConsistency(class) => {
                error!(class, "Classifier output has no sentiment label");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            other => {
                error!("Internal error: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PredictRequest {
    pub review_title: Option<String>,
    pub review_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub review_title: String,
    pub review_text: String,
    pub predicted_sentiment: String,
}

/// The body is parsed regardless of `Content-Type`; a body that does not
/// deserialize into the request shape is a 400.
async fn predict(
    State(svc): State<Arc<InferenceService>>,
    body: Bytes,
) -> Result<Json<PredictResponse>, AppError> {
    let req: PredictRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?;

    let title = req.review_title.unwrap_or_default();
    let text = req.review_text.unwrap_or_default();
    let prediction = svc.classify(&title, &text)?;

    Ok(Json(PredictResponse {
        review_title: prediction.title,
        review_text: prediction.text,
        predicted_sentiment: prediction.label.to_string(),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "model_loaded": true }))
}

pub fn router(svc: Arc<InferenceService>, body_limit_kb: usize) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .layer(RequestBodyLimitLayer::new(body_limit_kb * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(svc)
}

pub async fn serve(svc: Arc<InferenceService>, settings: &ServerSettings) -> Result<()> {
    let app = router(svc, settings.body_limit_kb);
    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind))?;
    info!("Sentiment API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}
