// ----- standard library imports
// ----- extra library imports
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::Json;
use bankid_client::{Error as ClientError, ErrorKind};
use serde_json::{Map, Value};
use thiserror::Error;
// ----- local imports

pub type Result<T> = std::result::Result<T, Error>;
#[derive(Debug, Error)]
pub enum Error {
    // external errors wrappers
    #[error("BankID client error {0}")]
    Client(#[from] ClientError),
    #[error("path error {0}")]
    Path(#[from] PathRejection),
    #[error("query error {0}")]
    Query(#[from] QueryRejection),
}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("Error: {}", self);
        let record = match &self {
            Error::Client(e) => translate(e),
            Error::Path(e) => ErrorRecord::new(e.body_text(), e.status()),
            Error::Query(e) => ErrorRecord::new(e.body_text(), e.status()),
        };
        record.into_response()
    }
}

/// What a failed call turns into on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub message: String,
    pub status: StatusCode,
    pub payload: Option<Map<String, Value>>,
}

impl ErrorRecord {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            message: message.into(),
            status,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Payload entries plus `message`, which wins on collision.
    pub fn to_body(&self) -> Map<String, Value> {
        let mut body = self.payload.clone().unwrap_or_default();
        body.insert(String::from("message"), Value::String(self.message.clone()));
        body
    }
}

impl axum::response::IntoResponse for ErrorRecord {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.to_body())).into_response()
    }
}

pub fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::AlreadyInProgress => StatusCode::CONFLICT,
        ErrorKind::AccessDeniedByRelyingParty => StatusCode::FORBIDDEN,
        ErrorKind::Cancelled => StatusCode::CONFLICT,
        ErrorKind::UserCancelled => StatusCode::CONFLICT,
        ErrorKind::CertificateError => StatusCode::FORBIDDEN,
        ErrorKind::StartFailed => StatusCode::NOT_FOUND,
        ErrorKind::ExpiredTransaction => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::ClientError => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::RetryError => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::InvalidParameters => StatusCode::BAD_REQUEST,
    }
}

pub fn translate(err: &ClientError) -> ErrorRecord {
    match err {
        ClientError::BankId {
            kind,
            code,
            details,
        } => {
            let mut payload = Map::new();
            payload.insert(String::from("errorCode"), Value::String(code.clone()));
            ErrorRecord::new(format!("{kind}: {details}"), status_code(*kind)).with_payload(payload)
        }
        other => ErrorRecord::new(other.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
    }
}
