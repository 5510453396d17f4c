//! The REST-level error taxonomy.
//!
//! This sits above [`crate::errors::ErrorKind`], which only ever describes
//! malformed HTTP on the wire. `RestError` is everything that can go wrong
//! once a well-formed request reaches endpoint dispatch: unknown routes,
//! failed authentication, rate limiting, and credential-store failures.

use crate::{Handled, Response, StatusCode};

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("no endpoint matches this method and path")]
    InvalidEndpoint,

    #[error("request body is not valid JSON")]
    InvalidBody,

    #[error("authentication failed")]
    InvalidAuth,

    #[error("invalid username")]
    InvalidUsername,

    #[error("a user with this username already exists")]
    DuplicateUsername,

    #[error("no user with this username exists")]
    UnknownUsername,

    #[error("invalid or unknown API key")]
    InvalidApiKey,

    #[error("signature does not match the provided data")]
    InvalidSignature,

    #[error("rate limit exceeded, try again later")]
    RateLimitExceeded,

    #[error("internal server error")]
    InternalServerError,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RestError {
    /// The HTTP status code this error maps to.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidEndpoint => StatusCode::NotFound,
            Self::InvalidBody | Self::InvalidUsername | Self::DuplicateUsername => {
                StatusCode::BadRequest
            }
            Self::InvalidAuth
            | Self::InvalidApiKey
            | Self::InvalidSignature
            | Self::UnknownUsername => StatusCode::Unauthorized,
            Self::RateLimitExceeded => StatusCode::TooManyRequests,
            // The original implementation mapped every internal failure to
            // a "200 OK" carrying an error body; real clients need the
            // distinction, so this corrects the status line to 500.
            Self::InternalServerError | Self::Io(_) | Self::Json(_) => {
                StatusCode::InternalServerError
            }
        }
    }

    /// A short, stable machine-readable identifier for this error, used for
    /// logging only; it never appears in a response body (see [`Self::message`]).
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint => "INVALID_ENDPOINT",
            Self::InvalidBody => "INVALID_BODY",
            Self::InvalidAuth => "INVALID_AUTH",
            Self::InvalidUsername => "INVALID_USERNAME",
            Self::DuplicateUsername => "DUPLICATE_USERNAME",
            Self::UnknownUsername => "UNKNOWN_USERNAME",
            Self::InvalidApiKey => "INVALID_API_KEY",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::InternalServerError | Self::Io(_) | Self::Json(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// The literal `"error"` message for this error's response body.
    ///
    /// Every variant collapses onto one of five canonical messages; the
    /// wire body never echoes variant-specific detail (e.g. which username
    /// was invalid) back to the client.
    const fn message(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint => "Invalid endpoint.",
            Self::InvalidBody | Self::InvalidUsername | Self::DuplicateUsername => {
                "Invalid body."
            }
            Self::InvalidAuth
            | Self::InvalidApiKey
            | Self::InvalidSignature
            | Self::UnknownUsername => "Unauthorized.",
            Self::RateLimitExceeded => "Rate limit exceeded.",
            Self::InternalServerError | Self::Io(_) | Self::Json(_) => "Internal server error.",
        }
    }

    /// Writes this error onto `response` as a structured JSON body (or a
    /// bare status line when `json_errors` is `false`), matching the
    /// wire-level error formatting convention used elsewhere in the crate.
    pub fn respond(&self, response: &mut Response, json_errors: bool) -> Handled {
        let status = self.status_code();
        tracing::debug!(code = self.code(), ?status, "rest error response");

        if !json_errors {
            return response.status(status).body("");
        }

        response
            .status(status)
            .body(format!(r#"{{"error":"{}"}}"#, self.message()))
    }
}
