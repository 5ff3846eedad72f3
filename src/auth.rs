//! OAuth2 client-credentials token acquisition for the chat gateway.
//!
//! Fetched once at process start and threaded into
//! [`crate::config::ExtractionConfig::llm_token`] — there is no import-time
//! credential state anywhere in the crate.

use crate::config::AuthConfig;
use crate::error::W9Error;
use serde::Deserialize;
use tracing::info;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchange client credentials for a bearer token.
pub async fn fetch_access_token(
    http: &reqwest::Client,
    config: &AuthConfig,
) -> Result<String, W9Error> {
    let form = [
        ("grant_type", "client_credentials"),
        ("scope", config.scope.as_str()),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];

    let response = http
        .post(&config.token_url)
        .form(&form)
        .send()
        .await
        .map_err(|e| W9Error::Auth { detail: e.to_string() })?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(W9Error::Auth {
            detail: format!("token endpoint returned {status}: {text}"),
        });
    }

    let token: TokenResponse = response.json().await.map_err(|e| W9Error::Auth {
        detail: format!("unreadable token response: {e}"),
    })?;

    info!("acquired access token from {}", config.token_url);
    Ok(token.access_token)
}
