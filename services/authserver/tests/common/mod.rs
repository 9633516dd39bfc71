use authserver::app::AppState;
use authserver::config::Config;
use authserver::token::Claims;
use axum::body::Body;
use axum::http::{header, Request};
use base64::Engine;
use jsonwebtoken::{decode, Validation};

pub fn testdata(name: &str) -> String {
    format!("{}/testdata/{name}", env!("CARGO_MANIFEST_DIR"))
}

/// Minimal config skeleton; tests append authn/authz sections.
pub fn base_config_yaml() -> String {
    format!(
        r#"
server:
  addr: ":5001"
token:
  issuer: "Acme auth server"
  expiration: 900
  certificate: "{cert}"
  key: "{key}"
"#,
        cert = testdata("rsa_cert.pem"),
        key = testdata("rsa_key.pem"),
    )
}

pub async fn state_from_yaml(yaml: &str) -> AppState {
    let mut config: Config = serde_yaml::from_str(yaml).expect("config yaml");
    config.validate().expect("valid config");
    authserver::app::build_state(config).await.expect("state")
}

pub fn auth_request(uri: &str, basic: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some((user, password)) = basic {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{user}:{password}"));
        builder = builder.header(header::AUTHORIZATION, format!("Basic {encoded}"));
    }
    builder.body(Body::empty()).expect("request")
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// Decode the issued token against the state's own signing key.
pub fn decode_token(state: &AppState, token: &str) -> Claims {
    let key = state.minter.key();
    let mut validation = Validation::new(key.algorithm());
    validation.set_issuer(&["Acme auth server"]);
    validation.validate_aud = false;
    decode::<Claims>(token, key.decoding_key(), &validation)
        .expect("decode issued token")
        .claims
}
