//! HTTP error construction. Messages stay coarse; the detail lives in
//! the server log.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// `WWW-Authenticate` challenge attached to 401 responses.
    pub challenge: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut response = (self.status, self.message).into_response();
        if let Some(challenge) = self.challenge {
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}

pub fn api_bad_request(message: &str) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        message: message.to_string(),
        challenge: None,
    }
}

pub fn api_unauthorized(realm: &str) -> ApiError {
    ApiError {
        status: StatusCode::UNAUTHORIZED,
        message: "authentication failed".to_string(),
        challenge: Some(format!("Basic realm=\"{realm}\"")),
    }
}

pub fn api_not_found(message: &str) -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        message: message.to_string(),
        challenge: None,
    }
}

pub fn api_internal(message: &str, err: &dyn std::fmt::Debug) -> ApiError {
    tracing::error!(error = ?err, "{message}");
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "internal server error".to_string(),
        challenge: None,
    }
}
