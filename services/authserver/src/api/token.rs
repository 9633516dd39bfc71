//! The `/auth` handler: parse, authenticate, authorize per scope, mint.

use crate::api::error::{api_bad_request, api_internal, api_unauthorized, ApiError};
use crate::api::request::{self, ClientPeer, RequestError};
use crate::app::AppState;
use crate::authn::AuthnError;
use crate::authz::AuthzError;
use crate::token::AccessEntry;
use axum::extract::{RawQuery, State};
use axum::http::HeaderMap;
use axum::Json;
use portcullis_acl::{AuthzRequest, Labels};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Current Docker clients read `token`, older ones `access_token`;
    /// both carry the same compact JWS.
    pub token: String,
    pub access_token: String,
}

pub async fn issue_token(
    State(state): State<AppState>,
    ClientPeer(peer): ClientPeer,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Json<TokenResponse>, ApiError> {
    let realm = state.config.token.issuer.clone();
    let request = request::parse(
        &headers,
        query.as_deref().unwrap_or(""),
        peer,
        &state.config.server,
    )
    .map_err(|err| match err {
        RequestError::AccountMismatch => api_unauthorized(&realm),
        err => api_bad_request(&err.to_string()),
    })?;

    // Requests without Basic credentials are anonymous probes: no
    // authentication, no labels, and whatever the ACL grants them.
    let labels = match &request.password {
        Some(password) => {
            match state.authn.authenticate(&request.account, password).await {
                Ok(labels) => labels,
                Err(AuthnError::NoMatch) | Err(AuthnError::WrongPass) => {
                    metrics::counter!("authserver_authn_rejected_total").increment(1);
                    return Err(api_unauthorized(&realm));
                }
                Err(AuthnError::Backend(err)) => {
                    return Err(api_internal("authentication backend failed", &err))
                }
            }
        }
        None => Labels::new(),
    };

    let mut access = Vec::with_capacity(request.scopes.len());
    for scope in &request.scopes {
        let authz_request = AuthzRequest {
            account: request.account.clone(),
            kind: scope.kind.clone(),
            name: scope.name.clone(),
            service: request.service.clone(),
            ip: request.client_ip,
            labels: labels.clone(),
            actions: scope.actions.clone(),
        };
        let granted = match state.authz.authorize(&authz_request).await {
            Ok(granted) => granted,
            Err(AuthzError::NoMatch) => Vec::new(),
            Err(AuthzError::Backend(err)) => {
                return Err(api_internal("authorization backend failed", &err))
            }
        };
        tracing::debug!(
            account = %request.account,
            scope = %scope,
            granted = ?granted,
            "authorization evaluated"
        );
        // Denied scopes are dropped; the token is still issued and the
        // registry refuses the protected operation itself.
        if !granted.is_empty() {
            access.push(AccessEntry {
                kind: scope.kind.clone(),
                name: scope.name.clone(),
                actions: granted,
            });
        }
    }

    let token = state
        .minter
        .mint(&request.account, &request.service, access)
        .map_err(|err| api_internal("failed to sign token", &err))?;

    metrics::counter!("authserver_tokens_issued_total").increment(1);
    tracing::info!(
        account = %request.account,
        service = %request.service,
        scopes = request.scopes.len(),
        "token issued"
    );

    Ok(Json(TokenResponse {
        access_token: token.clone(),
        token,
    }))
}
