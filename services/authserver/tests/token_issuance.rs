//! End-to-end token issuance through the full router.

mod common;

use axum::http::StatusCode;
use common::{auth_request, base_config_yaml, decode_token, read_json, state_from_yaml};
use tower::ServiceExt;

fn with_static_user_and_open_pull(password_hash: &str) -> String {
    format!(
        r#"{base}
users:
  "ci":
    password: "{password_hash}"
acl:
  - match: {{}}
    actions: ["pull"]
"#,
        base = base_config_yaml()
    )
}

#[tokio::test]
async fn anonymous_pull_is_allowed() {
    let hash = bcrypt::hash("x", 4).unwrap();
    let state = state_from_yaml(&with_static_user_and_open_pull(&hash)).await;
    let app = authserver::app::build_router(state.clone());

    let response = app
        .oneshot(auth_request(
            "/auth?service=reg&scope=repository:alpine:pull,push",
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let payload = read_json(response).await;
    assert_eq!(payload["token"], payload["access_token"]);

    let claims = decode_token(&state, payload["token"].as_str().unwrap());
    assert_eq!(claims.sub, "");
    assert_eq!(claims.aud, "reg");
    assert_eq!(claims.access.len(), 1);
    assert_eq!(claims.access[0].kind, "repository");
    assert_eq!(claims.access[0].name, "alpine");
    assert_eq!(claims.access[0].actions, vec!["pull"]);
}

#[tokio::test]
async fn wrong_password_is_rejected_with_a_challenge() {
    let hash = bcrypt::hash("x", 4).unwrap();
    let state = state_from_yaml(&with_static_user_and_open_pull(&hash)).await;
    let app = authserver::app::build_router(state);

    let response = app
        .oneshot(auth_request(
            "/auth?service=reg&scope=repository:alpine:pull",
            Some(("ci", "bad")),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response
        .headers()
        .get("www-authenticate")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(challenge.starts_with("Basic realm="), "got {challenge:?}");
}

#[tokio::test]
async fn correct_password_gets_granted_actions() {
    let hash = bcrypt::hash("x", 4).unwrap();
    let state = state_from_yaml(&with_static_user_and_open_pull(&hash)).await;
    let app = authserver::app::build_router(state.clone());

    let response = app
        .oneshot(auth_request(
            "/auth?service=reg&scope=repository:alpine:pull,push",
            Some(("ci", "x")),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let payload = read_json(response).await;
    let claims = decode_token(&state, payload["token"].as_str().unwrap());
    assert_eq!(claims.sub, "ci");
    assert_eq!(claims.access[0].actions, vec!["pull"]);
}

#[tokio::test]
async fn account_substitution_scopes_users_to_their_namespace() {
    let hash = bcrypt::hash("pw", 4).unwrap();
    let yaml = format!(
        r#"{base}
users:
  "alice":
    password: "{hash}"
acl:
  - match: {{account: "/.+/", name: "${{account}}/*"}}
    actions: ["*"]
"#,
        base = base_config_yaml()
    );
    let state = state_from_yaml(&yaml).await;
    let app = authserver::app::build_router(state.clone());

    // Own namespace: everything requested is granted.
    let response = app
        .clone()
        .oneshot(auth_request(
            "/auth?service=reg&scope=repository:alice/web:pull,push",
            Some(("alice", "pw")),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    let claims = decode_token(&state, payload["token"].as_str().unwrap());
    assert_eq!(claims.access.len(), 1);
    assert_eq!(claims.access[0].actions, vec!["pull", "push"]);

    // Somebody else's namespace: the token is still issued, with no
    // access entries.
    let response = app
        .oneshot(auth_request(
            "/auth?service=reg&scope=repository:bob/web:pull",
            Some(("alice", "pw")),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    let claims = decode_token(&state, payload["token"].as_str().unwrap());
    assert!(claims.access.is_empty());
}

#[tokio::test]
async fn labels_from_authentication_drive_grants() {
    let hash = bcrypt::hash("pw", 4).unwrap();
    let yaml = format!(
        r#"{base}
users:
  "dev":
    password: "{hash}"
    labels:
      team: ["eng", "ops"]
  "guest":
    password: "{hash}"
acl:
  - match: {{labels: {{team: "eng"}}}}
    actions: ["push"]
  - match: {{}}
    actions: ["pull"]
"#,
        base = base_config_yaml()
    );
    let state = state_from_yaml(&yaml).await;
    let app = authserver::app::build_router(state.clone());

    let response = app
        .clone()
        .oneshot(auth_request(
            "/auth?service=reg&scope=repository:x:pull,push",
            Some(("dev", "pw")),
        ))
        .await
        .expect("response");
    let payload = read_json(response).await;
    let claims = decode_token(&state, payload["token"].as_str().unwrap());
    assert_eq!(claims.access[0].actions, vec!["pull", "push"]);

    let response = app
        .oneshot(auth_request(
            "/auth?service=reg&scope=repository:x:pull,push",
            Some(("guest", "pw")),
        ))
        .await
        .expect("response");
    let payload = read_json(response).await;
    let claims = decode_token(&state, payload["token"].as_str().unwrap());
    assert_eq!(claims.access[0].actions, vec!["pull"]);
}

#[tokio::test]
async fn multiple_scopes_keep_request_order() {
    let hash = bcrypt::hash("x", 4).unwrap();
    let state = state_from_yaml(&with_static_user_and_open_pull(&hash)).await;
    let app = authserver::app::build_router(state.clone());

    let response = app
        .oneshot(auth_request(
            "/auth?service=reg&scope=repository:zeta:pull&scope=repository:alpha:pull",
            None,
        ))
        .await
        .expect("response");
    let payload = read_json(response).await;
    let claims = decode_token(&state, payload["token"].as_str().unwrap());
    let names: Vec<&str> = claims.access.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha"]);
}

#[tokio::test]
async fn authn_backend_outage_is_a_server_error() {
    // The external authenticator fails hard; the plugin behind it must
    // not be consulted and the request must surface a 500.
    let yaml = format!(
        r#"{base}
ext_auth:
  command: "sh"
  args: ["-c", "cat > /dev/null; exit 7"]
plugin_authn:
  command: "sh"
  args: ["-c", "while read line; do echo unreachable; done"]
acl:
  - match: {{}}
    actions: ["pull"]
"#,
        base = base_config_yaml()
    );
    let state = state_from_yaml(&yaml).await;
    let app = authserver::app::build_router(state.clone());

    let response = app
        .oneshot(auth_request(
            "/auth?service=reg&scope=repository:alpine:pull",
            Some(("anyone", "pw")),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    state.stop().await;
}

#[tokio::test]
async fn malformed_scope_is_a_bad_request() {
    let hash = bcrypt::hash("x", 4).unwrap();
    let state = state_from_yaml(&with_static_user_and_open_pull(&hash)).await;
    let app = authserver::app::build_router(state);

    let response = app
        .oneshot(auth_request("/auth?service=reg&scope=garbage", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_oauth_provider_is_not_found() {
    let hash = bcrypt::hash("x", 4).unwrap();
    let state = state_from_yaml(&with_static_user_and_open_pull(&hash)).await;
    let app = authserver::app::build_router(state);

    let response = app
        .oneshot(auth_request("/nosuch/login", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
