//! HTTP error classification.
//!
//! The backend reports failures as JSON bodies with a `detail` field,
//! either a plain string or a list of field-level validation messages.
//! Statuses map onto a small set of variants; everything collapses into
//! [`GatewayError`] before the core sees it.

use serde::Deserialize;
use thiserror::Error;

use venta_core::GatewayError;

/// Classified HTTP failure.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Not authenticated")]
    Unauthorized,

    #[error("Not allowed")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    /// Business-rule conflict (409), e.g. a second open session.
    #[error("{0}")]
    Conflict(String),

    /// Request validation rejection (400/422), e.g. insufficient stock.
    #[error("{0}")]
    Validation(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Builds the error for a non-success status and its (possibly
    /// unparseable) body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = parse_detail(body);
        match status {
            401 => ClientError::Unauthorized,
            403 => ClientError::Forbidden,
            404 => ClientError::NotFound,
            409 => ClientError::Conflict(detail),
            400 | 422 => ClientError::Validation(detail),
            _ => ClientError::Server(detail),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

/// Everything the core needs to know: was the request rejected with a
/// message worth showing, or did it never resolve.
impl From<ClientError> for GatewayError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Transport(msg) => GatewayError::Transport(msg),
            ClientError::Server(msg) => GatewayError::Transport(msg),
            other => GatewayError::Rejected(other.to_string()),
        }
    }
}

/// `{"detail": "..."}"` or `{"detail": [{"msg": "...", ...}, ...]}`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: Detail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Detail {
    Message(String),
    Fields(Vec<FieldError>),
}

#[derive(Debug, Deserialize)]
struct FieldError {
    msg: String,
}

fn parse_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(response) => match response.detail {
            Detail::Message(msg) => msg,
            Detail::Fields(fields) => fields
                .into_iter()
                .next()
                .map(|f| f.msg)
                .unwrap_or_else(|| "validation error".to_string()),
        },
        Err(_) if body.trim().is_empty() => "unknown error".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_detail() {
        let err = ClientError::from_status(409, r#"{"detail": "Ya existe una sesión abierta"}"#);
        assert!(matches!(err, ClientError::Conflict(_)));
        assert_eq!(err.to_string(), "Ya existe una sesión abierta");
    }

    #[test]
    fn test_field_list_detail_takes_first_message() {
        let body = r#"{"detail": [{"loc": ["body", "quantity"], "msg": "must be positive", "type": "value_error"}]}"#;
        let err = ClientError::from_status(422, body);
        assert_eq!(err.to_string(), "must be positive");
    }

    #[test]
    fn test_unparseable_body_passes_through() {
        let err = ClientError::from_status(500, "<html>gateway timeout</html>");
        assert!(matches!(err, ClientError::Server(_)));
        assert!(err.to_string().contains("gateway timeout"));

        let err = ClientError::from_status(502, "");
        assert_eq!(err.to_string(), "Server error: unknown error");
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            ClientError::from_status(401, "{}"),
            ClientError::Unauthorized
        ));
        assert!(matches!(
            ClientError::from_status(403, "{}"),
            ClientError::Forbidden
        ));
        assert!(matches!(
            ClientError::from_status(404, "{}"),
            ClientError::NotFound
        ));
        assert!(matches!(
            ClientError::from_status(400, r#"{"detail": "bad"}"#),
            ClientError::Validation(_)
        ));
    }

    #[test]
    fn test_rejection_reaches_core_verbatim() {
        let err = ClientError::from_status(400, r#"{"detail": "Stock insuficiente"}"#);
        let gateway: GatewayError = err.into();
        assert_eq!(gateway.to_string(), "Stock insuficiente");

        let gateway: GatewayError = ClientError::Transport("timeout".to_string()).into();
        assert!(matches!(gateway, GatewayError::Transport(_)));
    }
}
