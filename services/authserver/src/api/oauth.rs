//! Browser endpoints for the OAuth-family backends: redirect to the
//! provider and exchange the callback code for a database password.

use crate::api::error::{api_bad_request, api_internal, api_not_found, ApiError};
use crate::app::AppState;
use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub username: String,
    /// The generated database password; this is the password to use with
    /// `docker login` from now on.
    pub password: String,
}

pub async fn login(
    Path(provider): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, ApiError> {
    let backend = state
        .oauth
        .get(&provider)
        .ok_or_else(|| api_not_found("unknown provider"))?;
    let url = backend
        .login_url()
        .ok_or_else(|| api_not_found("provider has no browser login"))?;
    Ok(Redirect::temporary(&url))
}

pub async fn callback(
    Path(provider): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<CallbackResponse>, ApiError> {
    let backend = state
        .oauth
        .get(&provider)
        .ok_or_else(|| api_not_found("unknown provider"))?;
    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| api_bad_request("missing code parameter"))?;
    let (username, password) = backend
        .handle_callback(&code)
        .await
        .map_err(|err| api_internal("code exchange failed", &err))?;
    Ok(Json(CallbackResponse { username, password }))
}
