use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter shared by every extraction request.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

/// Rejection body shaped like the API's error envelope, so clients can
/// correlate a 429 with the request that drew it.
#[derive(Debug, Serialize)]
struct RejectionBody {
    error: Rejection,
    meta: RejectionMeta,
}

#[derive(Debug, Serialize)]
struct Rejection {
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RejectionMeta {
    request_id: Option<String>,
    retry_after_secs: u64,
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing a fixed request-per-window limit on extractions.
///
/// Runs inside [`request_id`], so a rejection carries the caller's request
/// ID in its body and log line along with the seconds until the window
/// resets.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    if window.started_at.elapsed() >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count < rate_limit.max_requests {
        window.count += 1;
        drop(window);
        return next.run(req).await;
    }

    let retry_after = rate_limit
        .window
        .saturating_sub(window.started_at.elapsed())
        .as_secs()
        .max(1);
    drop(window);

    let request_id = req.extensions().get::<RequestId>().map(|id| id.0.clone());
    tracing::warn!(
        request_id = request_id.as_deref().unwrap_or("-"),
        max_requests = rate_limit.max_requests,
        retry_after_secs = retry_after,
        "extraction rate limit exceeded"
    );

    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RejectionBody {
            error: Rejection {
                code: "rate_limited",
                message: format!(
                    "at most {} extractions per {}s",
                    rate_limit.max_requests,
                    rate_limit.window.as_secs()
                ),
            },
            meta: RejectionMeta {
                request_id,
                retry_after_secs: retry_after,
            },
        }),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    use super::*;

    fn echo_app(rate_limit: RateLimitState) -> Router {
        Router::new()
            .route(
                "/echo",
                get(|Extension(id): Extension<RequestId>| async move { id.0 }),
            )
            .layer(axum::middleware::from_fn_with_state(
                rate_limit,
                enforce_rate_limit,
            ))
            .layer(axum::middleware::from_fn(request_id))
    }

    fn get_echo(header: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/echo");
        if let Some(value) = header {
            builder = builder.header("x-request-id", value);
        }
        builder.body(Body::empty()).expect("request")
    }

    #[tokio::test]
    async fn request_id_is_propagated_from_the_caller() {
        let app = echo_app(RateLimitState::new(10, Duration::from_secs(60)));
        let response = app.oneshot(get_echo(Some("req-42"))).await.expect("response");
        assert_eq!(
            response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
            Some("req-42")
        );
    }

    #[tokio::test]
    async fn request_id_is_generated_when_missing() {
        let app = echo_app(RateLimitState::new(10, Duration::from_secs(60)));
        let response = app.oneshot(get_echo(None)).await.expect("response");
        let id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .expect("generated id");
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn requests_beyond_the_window_limit_are_rejected() {
        let app = echo_app(RateLimitState::new(1, Duration::from_secs(60)));
        let first = app.clone().oneshot(get_echo(None)).await.expect("response");
        let second = app.oneshot(get_echo(None)).await.expect("response");
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn rejection_names_the_request_and_when_to_retry() {
        let app = echo_app(RateLimitState::new(1, Duration::from_secs(60)));
        let _ = app.clone().oneshot(get_echo(Some("req-1"))).await.expect("response");
        let rejected = app.oneshot(get_echo(Some("req-2"))).await.expect("response");

        assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            rejected.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
            Some("req-2")
        );
        let retry_after: u64 = rejected
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .expect("retry-after header");
        assert!((1..=60).contains(&retry_after));

        let body = to_bytes(rejected.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["error"]["code"], "rate_limited");
        assert_eq!(json["error"]["message"], "at most 1 extractions per 60s");
        assert_eq!(json["meta"]["requestId"], "req-2");
        assert_eq!(json["meta"]["retryAfterSecs"], retry_after);
    }
}
