//! Custom extractors that convert axum rejections to structured AppError responses.
//!
//! Use `AppJson<T>` in place of `axum::Json<T>` on endpoints that are
//! allowed to reject at all (reads and the dry-run validator). The
//! ingestion endpoints never use it; they take the raw body and ack no
//! matter what it contains.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;

/// JSON extractor whose deserialization failures produce a JSON
/// `AppError` instead of axum's plain-text default.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(map_json_rejection(rejection)),
        }
    }
}

/// Convert a `JsonRejection` to a structured `AppError::Validation`.
pub fn map_json_rejection(rejection: JsonRejection) -> AppError {
    let body_text = rejection.body_text();
    let field = field_hint(&body_text).unwrap_or_else(|| "body".to_string());

    AppError::Validation {
        message: format!("Invalid request body: {body_text}"),
        field: Some(field),
        received: None,
        docs_hint: Some(
            "Check the request body against the endpoint's schema (GET /api-doc/openapi.json)."
                .to_string(),
        ),
    }
}

/// Pull a field name out of serde's "missing field `x`" / "unknown
/// field `x`" messages, when one is present.
fn field_hint(msg: &str) -> Option<String> {
    for pattern in ["missing field `", "unknown field `"] {
        if let Some(rest) = msg.split(pattern).nth(1)
            && let Some((field, _)) = rest.split_once('`')
        {
            return Some(field.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::field_hint;

    #[test]
    fn extracts_missing_field_name() {
        let msg = "Failed to deserialize: missing field `estimate_id` at line 1 column 40";
        assert_eq!(field_hint(msg), Some("estimate_id".to_string()));
    }

    #[test]
    fn extracts_unknown_field_name() {
        let msg = "unknown field `foo`, expected one of `estimate_id`, `kind`";
        assert_eq!(field_hint(msg), Some("foo".to_string()));
    }

    #[test]
    fn generic_errors_have_no_field_hint() {
        let msg = "invalid type: string, expected u64";
        assert_eq!(field_hint(msg), None);
    }
}
