use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use engine::EngineError;

use serde::Serialize;
pub use server::{ServerConfig, ServerState, app, run, run_with_listener};
pub use upload::{UploadError, UploadSink, UploadedFile};

mod admin;
mod auth;
mod business;
mod customer;
mod forms;
mod messages;
mod server;
mod upload;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "autohub_session";

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Upload(UploadError),
    Unauthenticated,
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        EngineError::Forbidden(_) | EngineError::PendingApproval | EngineError::Rejected => {
            StatusCode::FORBIDDEN
        }
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::DuplicateEmail => StatusCode::CONFLICT,
        EngineError::Database(_) | EngineError::PasswordHash(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        EngineError::Validation(_)
        | EngineError::InvalidAmount(_)
        | EngineError::InsufficientFunds(_)
        | EngineError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::PasswordHash(reason) => {
            tracing::error!("password hashing error: {reason}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::Engine(err) => status_for_engine_error(err),
            ServerError::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Upload(UploadError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Upload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServerError::Generic(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Short text safe to show to end users.
    fn into_message(self) -> String {
        match self {
            ServerError::Engine(err) => message_for_engine_error(err),
            ServerError::Upload(UploadError::Io(err)) => {
                tracing::error!("upload write failed: {err}");
                "could not store the uploaded file".to_string()
            }
            ServerError::Upload(err) => err.to_string(),
            ServerError::Unauthenticated => "Please log in.".to_string(),
            ServerError::Generic(err) => err,
        }
    }

    /// Redirect back to `to` with this error as flash message.
    pub fn into_redirect(self, to: &str) -> Redirect {
        flash_redirect(to, api_types::FlashStatus::Error, &self.into_message())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let error = self.into_message();
        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<UploadError> for ServerError {
    fn from(value: UploadError) -> Self {
        Self::Upload(value)
    }
}

/// Money as shown in every view.
pub(crate) fn amount(value: engine::MoneyCents) -> api_types::Amount {
    api_types::Amount {
        display: value.to_string(),
        cents: value.cents(),
    }
}

/// `303 See Other` to `to`, carrying `status` and `message` in the query.
pub fn flash_redirect(to: &str, status: api_types::FlashStatus, message: &str) -> Redirect {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("status", status.as_str())
        .append_pair("message", message)
        .finish();
    let separator = if to.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{to}{separator}{query}"))
}

/// Turns the outcome of a mutating route into its redirect.
pub(crate) fn redirect_outcome(to: &str, outcome: Result<String, ServerError>) -> Redirect {
    match outcome {
        Ok(message) => flash_redirect(to, api_types::FlashStatus::Success, &message),
        Err(err) => err.into_redirect(to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    #[test]
    fn engine_forbidden_maps_to_403() {
        let res =
            ServerError::from(EngineError::Forbidden("forbidden".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::NotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn duplicate_email_maps_to_409() {
        let res = ServerError::from(EngineError::DuplicateEmail).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn ledger_refusals_map_to_422() {
        for err in [
            EngineError::InvalidAmount("x".to_string()),
            EngineError::InsufficientFunds("x".to_string()),
            EngineError::InvalidState("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn database_errors_are_not_leaked() {
        let db_err = sea_orm::DbErr::Custom("no such table: users".to_string());
        let err = ServerError::from(EngineError::Database(db_err));
        assert_eq!(err.into_message(), "internal server error");
    }

    #[test]
    fn flash_redirect_encodes_message() {
        let res = flash_redirect(
            "/customer/dashboard?view=history",
            api_types::FlashStatus::Success,
            "Paid KES 2500.00 & done",
        )
        .into_response();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            res.headers()[LOCATION],
            "/customer/dashboard?view=history&status=success&message=Paid+KES+2500.00+%26+done"
        );
    }
}
