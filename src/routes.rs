//! HTTP endpoints: the Twilio webhook plus liveness and diagnostics.

use std::any::Any;
use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use crate::channels::{InboundMessage, MessageSender, WhatsAppChannel};
use crate::config::{ConfigPresence, RelayConfig};
use crate::llm::{LlmProvider, create_provider};
use crate::relay::{KeywordSet, RelayHandler};

/// Body of every acknowledged webhook call.
pub const ACK_BODY: &str = "OK";

/// Body returned when the webhook could not be processed at all.
pub const ERROR_ACK_BODY: &str = "Error procesado";

/// Liveness probe text.
pub const STATUS_TEXT: &str = "🟢 Servidor WhatsApp + OpenAI operativo.";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayHandler>,
    pub presence: ConfigPresence,
}

impl AppState {
    pub fn new(relay: RelayHandler, presence: ConfigPresence) -> Self {
        Self {
            relay: Arc::new(relay),
            presence,
        }
    }

    /// Wire providers from configuration. A provider that cannot be built is
    /// logged and left out; the relay then degrades for each call.
    pub fn from_config(config: &RelayConfig) -> Self {
        let keywords = config
            .keywords
            .as_ref()
            .map(KeywordSet::new)
            .unwrap_or_default();

        let generator: Option<Arc<dyn LlmProvider>> = match &config.openai {
            Some(openai) => match create_provider(openai) {
                Ok(provider) => Some(provider),
                Err(e) => {
                    error!(error = %e, "Failed to set up OpenAI client");
                    None
                }
            },
            None => {
                error!("OPENAI_API_KEY or OPENAI_MODEL/OPENAI_ASSISTANT_ID not set");
                None
            }
        };

        let sender: Option<Arc<dyn MessageSender>> = match &config.twilio {
            Some(twilio) => match WhatsAppChannel::new(twilio) {
                Ok(channel) => {
                    info!("Twilio client configured");
                    Some(Arc::new(channel))
                }
                Err(e) => {
                    error!(error = %e, "Failed to set up Twilio client");
                    None
                }
            },
            None => {
                error!("Twilio credentials not set, replies will not be delivered");
                None
            }
        };

        Self::new(
            RelayHandler::new(keywords, generator, sender),
            config.presence,
        )
    }
}

/// Fields Twilio posts for an incoming WhatsApp message. Others are ignored.
#[derive(Debug, Deserialize)]
pub struct WebhookForm {
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "Body")]
    pub body: Option<String>,
}

/// Build the Axum router with all relay routes.
pub fn relay_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/webhook", post(webhook))
        .route("/test", get(diagnostics))
        .route("/test-keywords/{message}", get(test_keywords))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
        .with_state(state)
}

// ── Webhook ─────────────────────────────────────────────────────────────

/// POST /webhook
///
/// Always answers 200 so Twilio never retries and duplicates a reply.
async fn webhook(
    State(state): State<AppState>,
    form: Result<Form<WebhookForm>, FormRejection>,
) -> (StatusCode, &'static str) {
    let Form(form) = match form {
        Ok(form) => form,
        Err(e) => {
            error!(error = %e, "Failed to parse webhook request");
            return (StatusCode::OK, ERROR_ACK_BODY);
        }
    };

    debug!(?form, "Webhook received");
    let msg = InboundMessage::from_raw(form.from.as_deref(), form.body.as_deref());

    let relay = Arc::clone(&state.relay);
    let span = info_span!("relay", request_id = %Uuid::new_v4());
    let task = tokio::spawn(async move { relay.handle(msg).await }.instrument(span));

    match task.await {
        Ok(outcome) => {
            debug!(?outcome, "Webhook handled");
            (StatusCode::OK, ACK_BODY)
        }
        Err(e) => {
            error!(error = %e, "Relay task failed");
            (StatusCode::OK, ERROR_ACK_BODY)
        }
    }
}

// ── Liveness & diagnostics ──────────────────────────────────────────────

/// GET /
async fn status() -> &'static str {
    STATUS_TEXT
}

/// GET /test
///
/// Reports which configuration values are present, never their values.
async fn diagnostics(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Diagnostics requested");
    Json(serde_json::json!({
        "status": "ok",
        "envVars": state.presence,
    }))
}

/// GET /test-keywords/{message}
async fn test_keywords(
    State(state): State<AppState>,
    Path(message): Path<String>,
) -> impl IntoResponse {
    let keywords = state.relay.keywords();
    Json(serde_json::json!({
        "detected": keywords.is_match(&message),
        "message": message,
        "keywords": keywords.keywords(),
    }))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "Request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "Error interno en el servidor").into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    /// Router with no providers: nothing ever leaves the process.
    fn app(presence: ConfigPresence) -> Router {
        let relay = RelayHandler::new(KeywordSet::default_set(), None, None);
        relay_routes(AppState::new(relay, presence))
    }

    async fn body_string(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn webhook_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn root_reports_status() {
        let resp = app(ConfigPresence::default())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, STATUS_TEXT);
    }

    #[tokio::test]
    async fn diagnostics_reports_presence_only() {
        let presence = ConfigPresence {
            has_openai_key: true,
            has_twilio_phone: true,
            ..Default::default()
        };
        let resp = app(presence)
            .oneshot(Request::get("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["envVars"]["hasOpenAIKey"], true);
        assert_eq!(json["envVars"]["hasOpenAIModel"], false);
        assert_eq!(json["envVars"]["hasOpenAIAssistant"], false);
        assert_eq!(json["envVars"]["hasTwilioSID"], false);
        assert_eq!(json["envVars"]["hasTwilioToken"], false);
        assert_eq!(json["envVars"]["hasTwilioPhone"], true);
        assert_eq!(json["envVars"].as_object().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_keywords_detects_match() {
        let resp = app(ConfigPresence::default())
            .oneshot(
                Request::get("/test-keywords/%C2%BFCu%C3%A1nto%20cuesta%3F")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["message"], "¿Cuánto cuesta?");
        assert_eq!(json["detected"], true);
        assert!(json["keywords"].as_array().unwrap().contains(&Value::from("cuesta")));
    }

    #[tokio::test]
    async fn test_keywords_reports_miss() {
        let resp = app(ConfigPresence::default())
            .oneshot(
                Request::get("/test-keywords/hola%20amigo")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["detected"], false);
    }

    #[tokio::test]
    async fn webhook_acknowledges_empty_body() {
        let resp = app(ConfigPresence::default())
            .oneshot(webhook_request("From=whatsapp%3A%2B34600111222&Body="))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, ACK_BODY);
    }

    #[tokio::test]
    async fn webhook_acknowledges_without_providers() {
        let resp = app(ConfigPresence::default())
            .oneshot(webhook_request(
                "From=whatsapp%3A%2B34600111222&Body=Hola&MessageSid=SM1",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, ACK_BODY);
    }

    #[tokio::test]
    async fn webhook_with_wrong_content_type_still_returns_200() {
        let req = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("Body=Hola"))
            .unwrap();
        let resp = app(ConfigPresence::default()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, ERROR_ACK_BODY);
    }

    #[test]
    fn from_config_without_credentials_builds_degraded_state() {
        let state = AppState::from_config(&RelayConfig::default());
        assert!(state.relay.keywords().is_match("precio"));
        assert_eq!(state.presence, ConfigPresence::default());
    }

    #[test]
    fn from_config_uses_keyword_override() {
        let config = RelayConfig {
            keywords: Some(vec!["museo".into()]),
            ..Default::default()
        };
        let state = AppState::from_config(&config);
        assert!(state.relay.keywords().is_match("El Museo"));
        assert!(!state.relay.keywords().is_match("precio"));
    }
}
