//! Composition root: build every configured backend once at startup,
//! wire the router, and tear the backends down at shutdown.

use crate::api;
use crate::authn::oauth::{
    self, GithubProvider, GitlabProvider, GoogleProvider, OauthAuthenticator, OidcProvider,
    Provider, DEFAULT_REVALIDATE_AFTER,
};
use crate::authn::{
    Authenticator, AuthnChain, ExtProcessAuth, LdapAuth, PluginAuth, StaticUsersAuth,
};
use crate::authz::{
    Authorizer, AuthzChain, CasbinAuthorizer, ExtHttpAuthorizer, PluginAuthz, StaticAclAuthorizer,
};
use crate::clock::system_clock;
use crate::config::Config;
use crate::token::{SigningKey, TokenMinter};
use crate::tokendb::RedisTokenDbConfig;
use anyhow::Context;
use axum::http::{header, HeaderValue};
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub authn: Arc<AuthnChain>,
    pub authz: Arc<AuthzChain>,
    pub minter: Arc<TokenMinter>,
    pub oauth: Arc<HashMap<String, Arc<OauthAuthenticator>>>,
}

impl AppState {
    /// `Stop` every backend and close every token db.
    pub async fn stop(&self) {
        self.authn.stop().await;
        self.authz.stop().await;
    }
}

struct OauthSection<'a> {
    provider: Box<dyn Provider>,
    token_db: &'a Option<PathBuf>,
    redis_token_db: &'a Option<RedisTokenDbConfig>,
    revalidate_after_secs: Option<u64>,
    http_timeout: Duration,
}

pub async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let config = Arc::new(config);
    let clock = system_clock();

    let (cert, key) = config
        .token_keypair()
        .context("no token signing keypair configured")?;
    let signing_key = SigningKey::load(cert, key).context("load token signing key")?;
    tracing::info!(
        kid = signing_key.key_id(),
        alg = ?signing_key.algorithm(),
        "token signing key loaded"
    );
    let minter = Arc::new(TokenMinter::new(
        config.token.issuer.clone(),
        Duration::from_secs(config.token.expiration as u64),
        Arc::new(signing_key),
    ));

    // Authenticators, in the order the chain consults them.
    let mut authn: Vec<Arc<dyn Authenticator>> = Vec::new();
    let mut oauth_backends: HashMap<String, Arc<OauthAuthenticator>> = HashMap::new();

    if let Some(users) = &config.users {
        authn.push(Arc::new(StaticUsersAuth::new(users.clone())));
    }

    let mut oauth_sections: Vec<OauthSection> = Vec::new();
    if let Some(cfg) = &config.github_auth {
        oauth_sections.push(OauthSection {
            provider: Box::new(GithubProvider::new(cfg)?),
            token_db: &cfg.token_db,
            redis_token_db: &cfg.redis_token_db,
            revalidate_after_secs: cfg.revalidate_after_secs,
            http_timeout: cfg.http_timeout(),
        });
    }
    if let Some(cfg) = &config.google_auth {
        oauth_sections.push(OauthSection {
            provider: Box::new(GoogleProvider::new(cfg)?),
            token_db: &cfg.token_db,
            redis_token_db: &cfg.redis_token_db,
            revalidate_after_secs: cfg.revalidate_after_secs,
            http_timeout: cfg.http_timeout(),
        });
    }
    if let Some(cfg) = &config.gitlab_auth {
        oauth_sections.push(OauthSection {
            provider: Box::new(GitlabProvider::new(cfg)?),
            token_db: &cfg.token_db,
            redis_token_db: &cfg.redis_token_db,
            revalidate_after_secs: cfg.revalidate_after_secs,
            http_timeout: cfg.http_timeout(),
        });
    }
    if let Some(cfg) = &config.oidc_auth {
        oauth_sections.push(OauthSection {
            provider: Box::new(OidcProvider::new(cfg)?),
            token_db: &cfg.token_db,
            redis_token_db: &cfg.redis_token_db,
            revalidate_after_secs: cfg.revalidate_after_secs,
            http_timeout: cfg.http_timeout(),
        });
    }
    for section in oauth_sections {
        let name = section.provider.name();
        let db = oauth::open_token_db(section.token_db, section.redis_token_db)
            .await
            .with_context(|| format!("open {name} token db"))?;
        let revalidate_after = section
            .revalidate_after_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REVALIDATE_AFTER);
        // Revalidation can take a couple of provider round trips.
        let backend_timeout = section.http_timeout * 3;
        let backend = Arc::new(OauthAuthenticator::new(
            section.provider,
            db,
            revalidate_after,
            clock.clone(),
            backend_timeout,
        ));
        oauth_backends.insert(name.to_string(), backend.clone());
        authn.push(backend);
    }

    if let Some(cfg) = &config.ldap_auth {
        authn.push(Arc::new(LdapAuth::new(cfg.clone())));
    }
    if let Some(cfg) = &config.ext_auth {
        authn.push(Arc::new(ExtProcessAuth::new(cfg.clone())));
    }
    if let Some(cfg) = &config.plugin_authn {
        authn.push(Arc::new(
            PluginAuth::spawn(cfg).await.context("spawn authn plugin")?,
        ));
    }

    // Authorizers, same discipline.
    let mut authz: Vec<Arc<dyn Authorizer>> = Vec::new();
    if let Some(entries) = &config.acl {
        authz.push(Arc::new(
            StaticAclAuthorizer::new(entries).context("compile ACL")?,
        ));
    }
    if let Some(cfg) = &config.casbin_authz {
        authz.push(Arc::new(
            CasbinAuthorizer::new(cfg).await.context("build casbin enforcer")?,
        ));
    }
    if let Some(cfg) = &config.ext_authz {
        authz.push(Arc::new(ExtHttpAuthorizer::new(cfg)?));
    }
    if let Some(cfg) = &config.plugin_authz {
        authz.push(Arc::new(
            PluginAuthz::spawn(cfg).await.context("spawn authz plugin")?,
        ));
    }

    Ok(AppState {
        config,
        authn: Arc::new(AuthnChain::new(authn)),
        authz: Arc::new(AuthzChain::new(authz)),
        minter,
        oauth: Arc::new(oauth_backends),
    })
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
            )
        });

    let routes = Router::new()
        .route("/auth", get(api::token::issue_token))
        .route("/{provider}/login", get(api::oauth::login))
        .route("/{provider}/callback", get(api::oauth::callback));

    let prefix = state.config.server.path_prefix.clone();
    let router = if prefix.is_empty() || prefix == "/" {
        routes
    } else {
        Router::new().nest(&prefix, routes)
    };

    let router = if state.config.server.hsts {
        router.layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ))
    } else {
        router
    };

    router.layer(trace_layer).with_state(state)
}
