use axum::http::Response;
use tower_governor::{
    GovernorError, GovernorLayer, governor::GovernorConfigBuilder,
    key_extractor::SmartIpKeyExtractor,
};

type RateLimitLayer =
    GovernorLayer<SmartIpKeyExtractor, governor::middleware::NoOpMiddleware, axum::body::Body>;

/// Rate limit for POST /v1/events and /v1/events/batch: 60 requests/minute per IP.
///
/// Over-limit submissions are shed with a 429 rather than acked. The
/// emitting surfaces fire and forget, so a shed tracking event costs a
/// little signal, never a user-visible failure.
pub fn events_write_layer() -> RateLimitLayer {
    GovernorLayer::new(
        GovernorConfigBuilder::default()
            .per_second(1) // 60 per minute = 1 per second replenish
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .expect("invalid governor config for events_write"),
    )
    .error_handler(json_error_handler)
}

/// Rate limit for the read and dry-run surfaces: 120 requests/minute per IP.
pub fn reads_layer() -> RateLimitLayer {
    GovernorLayer::new(
        GovernorConfigBuilder::default()
            .per_millisecond(500) // 120 per minute = 2 per second replenish
            .burst_size(30)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .expect("invalid governor config for reads"),
    )
    .error_handler(json_error_handler)
}

/// Shed requests as ApiError-shaped JSON, with Retry-After when known.
fn json_error_handler(err: GovernorError) -> Response<axum::body::Body> {
    let (status, retry_after, message) = match err {
        GovernorError::TooManyRequests { wait_time, .. } => (
            axum::http::StatusCode::TOO_MANY_REQUESTS,
            wait_time.to_string(),
            format!("Too many requests. Retry after {wait_time} seconds."),
        ),
        GovernorError::UnableToExtractKey => (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            String::new(),
            "Unable to determine client identity for rate limiting".to_string(),
        ),
        GovernorError::Other { code, msg, .. } => {
            (code, String::new(), msg.unwrap_or_default().to_string())
        }
    };

    let request_id = uuid::Uuid::now_v7().to_string();
    let body = serde_json::json!({
        "error": signalfold_core::error::codes::RATE_LIMITED,
        "message": message,
        "request_id": request_id,
    });

    let mut response = Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();

    if !retry_after.is_empty() {
        response
            .headers_mut()
            .insert("retry-after", retry_after.parse().unwrap());
    }

    response
}
