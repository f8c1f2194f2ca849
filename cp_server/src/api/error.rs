//! Mapping of tournament errors onto HTTP responses.

use axum::{
    Json,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use club_poker::{TournamentError, tournament::ErrorKind};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// Handler error wrapping a [`TournamentError`]
#[derive(Debug)]
pub struct ApiError {
    operation: &'static str,
    source: TournamentError,
}

impl ApiError {
    pub fn new(operation: &'static str, source: TournamentError) -> Self {
        Self { operation, source }
    }

    pub fn status(&self) -> StatusCode {
        match (&self.source, self.source.kind()) {
            (TournamentError::Timeout(_), _) => StatusCode::GATEWAY_TIMEOUT,
            (_, ErrorKind::Validation) => StatusCode::BAD_REQUEST,
            (_, ErrorKind::Policy) => StatusCode::CONFLICT,
            (_, ErrorKind::NotFound) => StatusCode::NOT_FOUND,
            (_, ErrorKind::Infrastructure) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind_label(&self) -> &'static str {
        match self.source.kind() {
            ErrorKind::Validation => "validation",
            ErrorKind::Policy => "policy",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Infrastructure => "infrastructure",
        }
    }
}

/// Tag a library result with the operation it came from
pub trait OperationContext<T> {
    fn during(self, operation: &'static str) -> Result<T, ApiError>;
}

impl<T> OperationContext<T> for Result<T, TournamentError> {
    fn during(self, operation: &'static str) -> Result<T, ApiError> {
        self.map_err(|source| ApiError::new(operation, source))
    }
}

/// JSON request body whose decode failures answer with an [`ErrorResponse`].
///
/// Malformed JSON, a wrong content type or an out-of-range field such as a
/// negative delta all become `400 Bad Request` with kind `validation`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::new(
                "decode_request",
                TournamentError::Validation(rejection.body_text()),
            )),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.source.kind() {
            ErrorKind::Policy => {
                crate::metrics::policy_rejections_total(self.operation);
                tracing::info!(operation = self.operation, "Rejected: {}", self.source);
            }
            ErrorKind::Infrastructure => {
                tracing::error!(operation = self.operation, "Failed: {}", self.source);
            }
            ErrorKind::Validation | ErrorKind::NotFound => {
                tracing::debug!(operation = self.operation, "Refused: {}", self.source);
            }
        }

        let body = ErrorResponse {
            error: self.source.client_message(),
            kind: self.kind_label().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
