//! Token request parsing: Basic credentials, query parameters, and
//! client address resolution.

use crate::authn::PasswordString;
use crate::config::ServerConfig;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use base64::Engine;
use portcullis_acl::{Scope, ScopeParseError};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

/// The transport peer, when the serve loop recorded one. Requests driven
/// in-process (tests) have none.
pub struct ClientPeer(pub Option<SocketAddr>);

impl<S> FromRequestParts<S> for ClientPeer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientPeer(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        ))
    }
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed Authorization header")]
    BadAuthorization,
    #[error(transparent)]
    BadScope(#[from] ScopeParseError),
    /// Basic user and `account` query parameter disagree.
    #[error("user and account do not match")]
    AccountMismatch,
}

/// Everything the pipeline needs from one `/auth` request.
#[derive(Debug)]
pub struct AuthRequest {
    /// Set when Basic credentials were presented.
    pub password: Option<PasswordString>,
    /// The identity to authenticate and authorize. Empty for anonymous
    /// requests without an `account` parameter.
    pub account: String,
    pub service: String,
    pub scopes: Vec<Scope>,
    pub client_ip: Option<IpAddr>,
}

pub fn parse(
    headers: &HeaderMap,
    raw_query: &str,
    peer: Option<SocketAddr>,
    server: &ServerConfig,
) -> Result<AuthRequest, RequestError> {
    let basic = parse_basic_auth(headers)?;

    let mut account = String::new();
    let mut service = String::new();
    let mut scopes = Vec::new();
    for (key, value) in url::form_urlencoded::parse(raw_query.as_bytes()) {
        match key.as_ref() {
            "account" => account = value.into_owned(),
            "service" => service = value.into_owned(),
            "scope" => {
                for scope in split_scope_list(&value) {
                    scopes.push(scope.parse::<Scope>()?);
                }
            }
            _ => {}
        }
    }

    let password = match basic {
        Some((user, password)) => {
            if !account.is_empty() && account != user {
                return Err(RequestError::AccountMismatch);
            }
            account = user;
            Some(password)
        }
        None => None,
    };

    Ok(AuthRequest {
        password,
        account,
        service,
        scopes,
        client_ip: client_ip(headers, peer, server),
    })
}

fn parse_basic_auth(
    headers: &HeaderMap,
) -> Result<Option<(String, PasswordString)>, RequestError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| RequestError::BadAuthorization)?;
    let Some(encoded) = value.strip_prefix("Basic ") else {
        // Other schemes (Bearer, ...) mean no Basic credentials.
        return Ok(None);
    };
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| RequestError::BadAuthorization)?;
    let decoded = String::from_utf8(decoded).map_err(|_| RequestError::BadAuthorization)?;
    let (user, password) = decoded
        .split_once(':')
        .ok_or(RequestError::BadAuthorization)?;
    Ok(Some((user.to_string(), PasswordString::new(password))))
}

/// One `scope` parameter may carry several scopes, space- or
/// comma-delimited. Comma splitting has to respect that actions are
/// comma-separated too: a comma-separated segment without a colon belongs
/// to the action list of the scope before it.
fn split_scope_list(value: &str) -> Vec<String> {
    let mut scopes: Vec<String> = Vec::new();
    for chunk in value.split_whitespace() {
        for segment in chunk.split(',') {
            if segment.is_empty() {
                continue;
            }
            match scopes.last_mut() {
                Some(last) if !segment.contains(':') => {
                    last.push(',');
                    last.push_str(segment);
                }
                _ => scopes.push(segment.to_string()),
            }
        }
    }
    scopes
}

/// Resolve the client address: either the transport peer or the
/// configured hop of a trusted proxy header (positive positions count
/// from the right, negative from the left, 0 means the peer).
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, server: &ServerConfig) -> Option<IpAddr> {
    let peer_ip = peer.map(|addr| addr.ip());
    let Some(header_name) = &server.real_ip_header else {
        return peer_ip;
    };
    if server.real_ip_pos == 0 {
        return peer_ip;
    }
    let Some(value) = headers.get(header_name).and_then(|v| v.to_str().ok()) else {
        return peer_ip;
    };
    let hops: Vec<&str> = value.split(',').map(str::trim).collect();
    let index = if server.real_ip_pos > 0 {
        hops.len().checked_sub(server.real_ip_pos as usize)
    } else {
        Some((-(server.real_ip_pos as i64) - 1) as usize)
    };
    index
        .and_then(|i| hops.get(i))
        .and_then(|hop| hop.parse().ok())
        .or(peer_ip)
}
