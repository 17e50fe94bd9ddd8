//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the batch handler on every path
//! - Wire up middleware (request ID, tracing)
//! - Build the shared outbound transport once
//! - Bind server to listener and shut down gracefully

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::batch::{BatchHandler, Executor, Reply, ReqwestTransport, Transport};
use crate::config::FanoutConfig;
use crate::http::request::{make_span, MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::wait_for;

/// Errors raised while constructing or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build outbound client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<BatchHandler>,
    pub max_body_bytes: usize,
}

/// HTTP server for the fan-out endpoint.
pub struct HttpServer {
    router: Router,
    config: FanoutConfig,
}

impl HttpServer {
    /// Create a server whose calls go through a `reqwest` client built
    /// from `config.client`.
    pub fn new(config: FanoutConfig) -> Result<Self, ServerError> {
        let transport = Arc::new(ReqwestTransport::new(&config.client)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a server around an existing transport.
    pub fn with_transport(config: FanoutConfig, transport: Arc<dyn Transport>) -> Self {
        let executor =
            Executor::new(transport).with_max_concurrency(config.executor.max_concurrency);

        let state = AppState {
            handler: Arc::new(BatchHandler::new(executor)),
            max_body_bytes: config.limits.max_body_bytes,
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(fanout_handler))
            .route("/{*path}", any(fanout_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(make_span))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_concurrency = self.config.executor.max_concurrency,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(wait_for(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &FanoutConfig {
        &self.config
    }
}

/// Batch endpoint: every method and path lands here.
async fn fanout_handler(State(state): State<AppState>, request: Request<Body>) -> Reply {
    let (parts, body) = request.into_parts();
    state
        .handler
        .handle(&parts.method, axum::body::to_bytes(body, state.max_body_bytes))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{CallError, OpResult, OutboundRequest, ResultEnvelope};
    use async_trait::async_trait;
    use axum::http::{header, Response, StatusCode};
    use tower::ServiceExt;

    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn send(&self, request: OutboundRequest) -> Result<Response<Vec<u8>>, CallError> {
            Ok(Response::new(request.body))
        }
    }

    fn app(config: FanoutConfig) -> Router {
        HttpServer::with_transport(config, Arc::new(EchoTransport)).router()
    }

    async fn read_body(response: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn get_is_health_check() {
        let response = app(FanoutConfig::default())
            .oneshot(Request::builder().uri("/anything").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(read_body(response).await, br#"{"result":"ok"}"#.to_vec());
    }

    #[tokio::test]
    async fn caller_request_id_is_echoed() {
        let response = app(FanoutConfig::default())
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers().get("x-request-id").unwrap(), "req-42");
    }

    #[tokio::test]
    async fn post_executes_batch() {
        let payload = r#"{"calls": [{"url": "http://backend/", "method": "POST", "bodyString": "hi"}]}"#;
        let response = app(FanoutConfig::default())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let result: OpResult = serde_json::from_slice(&read_body(response).await).unwrap();
        assert_eq!(result.calls.len(), 1);
        assert_eq!(result.calls[0].response, b"hi".to_vec());
    }

    #[tokio::test]
    async fn concurrent_executor_serves_batches() {
        let mut config = FanoutConfig::default();
        config.executor.max_concurrency = 4;
        let payload = r#"{"calls": [
            {"url": "http://backend/1", "method": "POST", "bodyString": "one"},
            {"url": "", "method": "GET"},
            {"url": "http://backend/3", "method": "POST", "bodyString": "three"}
        ]}"#;

        let server = tokio::spawn(app(config).oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .body(Body::from(payload))
                .unwrap(),
        ));
        let response = server.await.unwrap().unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let result: OpResult = serde_json::from_slice(&read_body(response).await).unwrap();
        assert_eq!(result.calls[0].response, b"one".to_vec());
        assert!(result.calls[1].is_failure());
        assert_eq!(result.calls[2].response, b"three".to_vec());
    }

    #[tokio::test]
    async fn oversized_body_is_unreadable() {
        let mut config = FanoutConfig::default();
        config.limits.max_body_bytes = 8;
        let response = app(config)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .body(Body::from(r#"{"calls": []}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let envelope: ResultEnvelope = serde_json::from_slice(&read_body(response).await).unwrap();
        assert_ne!(envelope.result, "ok");
    }

    #[tokio::test]
    async fn malformed_body_is_500() {
        let response = app(FanoutConfig::default())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
