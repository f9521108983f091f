//! HTTP gateway for chatrelay.
//!
//! Exposes the streaming chat endpoint, a health check, and speech
//! synthesis. Built on Axum; the chat stream is SSE with one JSON event
//! per fragment and an empty `done: true` terminal event.

use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::sse::{Event as SseEvent, Sse},
    response::{IntoResponse, Json},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use chatrelay_core::facts::{FactContext, FactProvider};
use chatrelay_core::history::HistoryStore;
use chatrelay_core::speech::SpeechSynthesizer;
use chatrelay_facts::{ClockFact, TranslateTts, WeatherFact};
use chatrelay_history::{PostgresHistory, SqliteHistory};
use chatrelay_relay::{GenerationRelay, OllamaGenerator};
use chatrelay_session::{ContextAssembler, SessionOrchestrator, SessionRequest};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: SessionOrchestrator,
    pub facts: Vec<Arc<dyn FactProvider>>,
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat-stream", get(chat_stream_handler))
        .route("/health", get(health_handler))
        .route("/synthesize", get(synthesize_handler))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: chatrelay_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let history: Arc<dyn HistoryStore> = match config.history.backend.as_str() {
        "postgres" => Arc::new(
            PostgresHistory::new(&config.history.url, config.history.capacity).await?,
        ),
        _ => Arc::new(SqliteHistory::new(&config.history.url, config.history.capacity).await?),
    };
    info!(backend = history.name(), capacity = config.history.capacity, "History store ready");

    let generator = Arc::new(OllamaGenerator::new(config.upstream.base_url.clone()));
    let relay = GenerationRelay::new(
        generator,
        config.relay.blocked_markers.clone(),
        config.upstream.stream_timeout_secs,
    );
    let orchestrator = SessionOrchestrator::new(
        history,
        relay,
        ContextAssembler::new(config.assistant.system_instruction.clone()),
        config.upstream.model.clone(),
        config.upstream.options(),
        config.history.window,
    );

    let mut facts: Vec<Arc<dyn FactProvider>> =
        vec![Arc::new(ClockFact::new(config.assistant.utc_offset_hours))];
    if let Some(key) = &config.weather.api_key {
        facts.push(Arc::new(WeatherFact::new(key.clone())));
    }

    let state = Arc::new(GatewayState {
        orchestrator,
        facts,
        synthesizer: Some(Arc::new(TranslateTts::new("ko"))),
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Deserialize)]
struct ChatQuery {
    #[serde(default)]
    text: String,

    #[serde(default)]
    uid: String,

    #[serde(default)]
    lat: Option<f64>,

    #[serde(default)]
    lon: Option<f64>,
}

async fn chat_stream_handler(
    State(state): State<SharedState>,
    Query(query): Query<ChatQuery>,
) -> Result<
    Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>,
    (StatusCode, Json<ErrorResponse>),
> {
    if query.text.trim().is_empty() || query.uid.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "text and uid are required".into(),
            }),
        ));
    }

    let request_id = uuid::Uuid::new_v4();
    info!(
        %request_id,
        identity = %query.uid,
        chars = query.text.chars().count(),
        "Chat stream request"
    );

    let context = FactContext {
        latitude: query.lat,
        longitude: query.lon,
    };
    let mut facts = Vec::with_capacity(state.facts.len());
    for provider in &state.facts {
        facts.push(provider.fact(&context).await);
    }

    let rx = state.orchestrator.run(SessionRequest {
        identity: query.uid,
        user_text: query.text,
        facts,
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().data(data))
    });

    Ok(Sse::new(stream))
}

#[derive(Debug, Deserialize)]
struct SynthesizeQuery {
    #[serde(default)]
    text: String,
}

async fn synthesize_handler(
    State(state): State<SharedState>,
    Query(query): Query<SynthesizeQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    if query.text.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "text is required".into(),
            }),
        ));
    }

    let Some(synthesizer) = &state.synthesizer else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "speech synthesis is not configured".into(),
            }),
        ));
    };

    match synthesizer.synthesize(&query.text).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, "audio/mpeg")], bytes)),
        Err(e) => {
            warn!(error = %e, "Speech synthesis failed");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: "speech synthesis failed".into(),
                }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chatrelay_core::error::UpstreamError;
    use chatrelay_core::generator::{GenerationOptions, GenerationRequest, Generator, TokenChunk};
    use chatrelay_history::InMemoryHistory;
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct ScriptedGenerator {
        script: Mutex<Option<Vec<std::result::Result<TokenChunk, UpstreamError>>>>,
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn stream(
            &self,
            _request: GenerationRequest,
        ) -> std::result::Result<
            tokio::sync::mpsc::Receiver<std::result::Result<TokenChunk, UpstreamError>>,
            UpstreamError,
        > {
            let chunks = self.script.lock().unwrap().take().unwrap_or_default();
            let (tx, rx) = tokio::sync::mpsc::channel(64);
            tokio::spawn(async move {
                for chunk in chunks {
                    if tx.send(chunk).await.is_err() {
                        return;
                    }
                }
            });
            Ok(rx)
        }
    }

    fn test_state(
        store: Arc<InMemoryHistory>,
        chunks: Vec<std::result::Result<TokenChunk, UpstreamError>>,
    ) -> SharedState {
        let generator = Arc::new(ScriptedGenerator {
            script: Mutex::new(Some(chunks)),
        });
        let orchestrator = SessionOrchestrator::new(
            store,
            GenerationRelay::new(generator, vec!["<|".into()], None),
            ContextAssembler::new("Be brief."),
            "llama3:8b".into(),
            GenerationOptions::default(),
            4,
        );
        Arc::new(GatewayState {
            orchestrator,
            facts: Vec::new(),
            synthesizer: None,
        })
    }

    fn chunk(text: &str) -> std::result::Result<TokenChunk, UpstreamError> {
        Ok(TokenChunk {
            text: text.into(),
            done: false,
        })
    }

    fn done() -> std::result::Result<TokenChunk, UpstreamError> {
        Ok(TokenChunk {
            text: String::new(),
            done: true,
        })
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let store = Arc::new(InMemoryHistory::new(100));
        let app = build_router(test_state(store, vec![]));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("\"status\":\"ok\""));
    }

    #[tokio::test]
    async fn chat_stream_requires_text_and_uid() {
        let store = Arc::new(InMemoryHistory::new(100));
        let app = build_router(test_state(store, vec![]));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/chat-stream?text=hello")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/chat-stream?text=%20&uid=dev-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chat_stream_emits_fragments_then_done_and_commits() {
        let store = Arc::new(InMemoryHistory::new(100));
        let app = build_router(test_state(
            store.clone(),
            vec![chunk("hel"), chunk("lo"), done()],
        ));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/chat-stream?text=hi&uid=dev-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        let body = body_string(response).await;
        assert!(body.contains(r#"data: {"message":"hel","done":false}"#));
        assert!(body.contains(r#"data: {"message":"lo","done":false}"#));
        assert!(body.contains(r#"data: {"message":"","done":true}"#));

        // The SSE body only closes after persistence finished
        assert_eq!(store.count("dev-1").await.unwrap(), 1);
        let recent = store.recent("dev-1", 1).await.unwrap();
        assert_eq!(recent[0].user_text, "hi");
        assert_eq!(recent[0].ai_text, "hello");
    }

    #[tokio::test]
    async fn chat_stream_failure_surfaces_the_notice() {
        let store = Arc::new(InMemoryHistory::new(100));
        let app = build_router(test_state(
            store.clone(),
            vec![Err(UpstreamError::Unavailable("refused".into()))],
        ));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/chat-stream?text=hi&uid=dev-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_string(response).await;
        assert!(body.contains("The generation service is unreachable."));
        assert!(body.contains(r#"data: {"message":"","done":true}"#));
        assert_eq!(store.count("dev-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn synthesize_without_a_backend_is_unavailable() {
        let store = Arc::new(InMemoryHistory::new(100));
        let app = build_router(test_state(store, vec![]));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/synthesize?text=hello")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn synthesize_requires_text() {
        let store = Arc::new(InMemoryHistory::new(100));
        let app = build_router(test_state(store, vec![]));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/synthesize")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
