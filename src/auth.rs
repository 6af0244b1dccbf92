use crate::config::ReporterConfig;
use crate::github::{self, endpoints};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Key of the token in the authorization response
pub const TOKEN_KEY: &str = "token";
/// Scope requested for issue creation
pub const REPO_SCOPE: &str = "repo";

/// Request body for a new authorization
#[derive(Serialize, Debug, PartialEq)]
pub struct AuthorizationRequest {
    pub scopes: Vec<String>,
}

impl Default for AuthorizationRequest {
    fn default() -> Self {
        AuthorizationRequest {
            scopes: vec![REPO_SCOPE.to_string()],
        }
    }
}

/// Returns the token held by an authorization response, if it has one.
pub fn extract_token(response: &HashMap<String, Value>) -> Option<String> {
    response
        .get(TOKEN_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Exchanges the configured username/password for a `repo`-scoped token.
///
/// Credentials are sent preemptively so GitHub never has to challenge first.
/// Returns `Ok(None)` when the response carries no token.
pub async fn request_token(config: &ReporterConfig) -> anyhow::Result<Option<String>> {
    let client = github::http_client()?;

    let response = client
        .post(endpoints::authorizations(&config.api_base_url))
        .basic_auth(&config.username, config.password.as_deref())
        .header("Accept", github::ACCEPT)
        .json(&AuthorizationRequest::default())
        .send()
        .await?;

    let status = response.status();
    tracing::debug!("authorization request returned {status}");

    let body = response.json::<HashMap<String, Value>>().await?;
    let token = extract_token(&body);
    if token.is_none() {
        tracing::warn!("authorization response ({status}) has no token");
    }
    Ok(token)
}

/// Best-effort variant of [`request_token`]: every failure is logged and
/// turned into an absent token.
pub async fn retrieve_token(config: &ReporterConfig) -> Option<String> {
    if config.password.is_none() {
        tracing::warn!(
            "{} is not set; cannot request a GitHub token",
            crate::config::PASSWORD_ENV
        );
        return None;
    }

    match request_token(config).await {
        Ok(token) => token,
        Err(err) => {
            github::log_transport_error("token request", &err);
            None
        }
    }
}
