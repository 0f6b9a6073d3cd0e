use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use trace_exec::{ExecutionRequest, ExecutionResult, ExecutionService, Language, ResourceLimits};
use tracing::info;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Server error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ExecuteRequest {
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub input_data: Option<serde_json::Value>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_language() -> String {
    "python".to_string()
}

fn default_timeout_seconds() -> u64 {
    5
}

/// Upper bound on the per-request timeout; one request must not be able to
/// pin an execution slot indefinitely
const MAX_TIMEOUT_SECONDS: u64 = 300;

#[derive(Clone)]
pub struct AppState {
    service: Arc<ExecutionService>,
}

pub fn create_app(max_concurrent_executions: usize, resource_limits: ResourceLimits) -> Router {
    let service = ExecutionService::new(max_concurrent_executions, resource_limits);

    let state = AppState {
        service: Arc::new(service),
    };

    // The front end is served from another origin
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/health", get(health_check))
        .route("/execute", post(execute))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), ServerError> {
    info!("Starting trace execution server on {}", addr);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

/// Every execution outcome is a 200 with the uniform result body; only
/// schema-invalid requests get a 400
async fn execute(
    State(state): State<AppState>,
    Json(payload): Json<ExecuteRequest>,
) -> Result<Json<ExecutionResult>, ServerError> {
    if payload.code.trim().is_empty() {
        return Err(ServerError::InvalidRequest(
            "code must not be empty".to_string(),
        ));
    }
    if payload.timeout_seconds == 0 {
        return Err(ServerError::InvalidRequest(
            "timeout_seconds must be positive".to_string(),
        ));
    }
    if payload.timeout_seconds > MAX_TIMEOUT_SECONDS {
        return Err(ServerError::InvalidRequest(format!(
            "timeout_seconds must be at most {}",
            MAX_TIMEOUT_SECONDS
        )));
    }

    let language: Language = match payload.language.parse() {
        Ok(language) => language,
        // An unrecognized language is an execution outcome, not a schema error
        Err(message) => return Ok(Json(ExecutionResult::failure(message))),
    };

    let request = ExecutionRequest {
        language,
        code: payload.code,
        input_data: payload.input_data,
        timeout: Duration::from_secs(payload.timeout_seconds),
    };

    Ok(Json(state.service.execute(request).await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn skip_if_not_available(tools: &[&str]) -> bool {
        let missing: Vec<_> = tools
            .iter()
            .filter(|tool| which::which(**tool).is_err())
            .map(|s| (*s).to_string())
            .collect();

        if !missing.is_empty() {
            eprintln!("Skipping test: {} not available", missing.join(", "));
            return true;
        }
        false
    }

    fn post_execute(body: &ExecuteRequest) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/execute")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(body).unwrap()))
            .unwrap()
    }

    async fn result_body(response: Response) -> ExecutionResult {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_app(1, ResourceLimits::default());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_execute_python() {
        if skip_if_not_available(&["python3"]) {
            return;
        }

        let app = create_app(1, ResourceLimits::default());
        let request = ExecuteRequest {
            code: r#"print("Hello, World!")"#.to_string(),
            language: "python".to_string(),
            input_data: None,
            timeout_seconds: 5,
        };

        let response = app.oneshot(post_execute(&request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let result = result_body(response).await;
        assert!(result.success, "failed: {}", result.error);
        assert_eq!(result.output, "Hello, World!");
        assert!(result.error.is_empty());
        assert_eq!(result.steps.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_code_is_rejected() {
        let app = create_app(1, ResourceLimits::default());
        let request = ExecuteRequest {
            code: "   ".to_string(),
            language: "python".to_string(),
            input_data: None,
            timeout_seconds: 5,
        };

        let response = app.oneshot(post_execute(&request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_zero_timeout_is_rejected() {
        let app = create_app(1, ResourceLimits::default());
        let request = ExecuteRequest {
            code: "x = 1".to_string(),
            language: "python".to_string(),
            input_data: None,
            timeout_seconds: 0,
        };

        let response = app.oneshot(post_execute(&request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_timeout_is_rejected() {
        let app = create_app(1, ResourceLimits::default());
        let request = ExecuteRequest {
            code: "x = 1".to_string(),
            language: "python".to_string(),
            input_data: None,
            timeout_seconds: u64::MAX,
        };

        let response = app.oneshot(post_execute(&request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_language_gets_uniform_result() {
        let app = create_app(1, ResourceLimits::default());
        let request = ExecuteRequest {
            code: "puts 'hi'".to_string(),
            language: "Ruby".to_string(),
            input_data: None,
            timeout_seconds: 5,
        };

        let response = app.oneshot(post_execute(&request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let result = result_body(response).await;
        assert!(!result.success);
        assert_eq!(result.error, "Unsupported language: ruby");
        assert!(result.output.is_empty());
        assert!(result.steps.is_empty());
        assert_eq!(result.execution_time_ms, 0);
    }

    #[tokio::test]
    async fn test_language_defaults_to_python() {
        if skip_if_not_available(&["python3"]) {
            return;
        }

        let app = create_app(1, ResourceLimits::default());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/execute")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"code": "print(40 + 2)"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let result = result_body(response).await;
        assert!(result.success, "failed: {}", result.error);
        assert_eq!(result.output, "42");
    }
}
