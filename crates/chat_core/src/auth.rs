use reqwest::Client;
use serde::Serialize;
use shared::{
    error::{ApiError, ApiException},
    protocol::SessionGrant,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum TokenExchangeError {
    #[error("credential exchange rejected: {0}")]
    Rejected(ApiException),
    #[error("credential exchange failed with status {0}")]
    Status(reqwest::StatusCode),
    #[error("credential exchange transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("credential exchange returned a malformed grant: {0}")]
    MalformedGrant(#[source] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Client for the external credential exchange endpoint: trades a
/// username/password for a messaging token plus the desired-conversation
/// set for that identity.
pub struct TokenExchangeClient {
    http: Client,
    base_url: String,
}

impl TokenExchangeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub async fn exchange(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionGrant, TokenExchangeError> {
        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .json(&TokenRequest { username, password })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(match response.json::<ApiError>().await {
                Ok(body) => TokenExchangeError::Rejected(body.into()),
                Err(_) => TokenExchangeError::Status(status),
            });
        }

        let grant = response
            .json::<SessionGrant>()
            .await
            .map_err(TokenExchangeError::MalformedGrant)?;
        info!(
            identity = %grant.identity,
            conversations = grant.conversations.len(),
            "token: session grant received"
        );
        Ok(grant)
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
