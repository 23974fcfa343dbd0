use crate::{
    config::OAuthClientConfig,
    error::{AppError, Result},
    types::{CredentialBundle, GrantRequest},
};
use tracing::{debug, error};

/// Runs OAuth2 grants against the configured token endpoint.
#[derive(Debug, Clone)]
pub struct GrantExecutor {
    client: reqwest::Client,
    oauth: OAuthClientConfig,
}

impl GrantExecutor {
    pub fn new(client: reqwest::Client, oauth: OAuthClientConfig) -> Self {
        Self { client, oauth }
    }

    fn credentials(&self) -> Result<(String, String)> {
        if self.oauth.client_id.is_empty() || self.oauth.client_secret.is_empty() {
            return Err(AppError::Configuration(
                "OAuth client id and secret must be configured".into(),
            ));
        }
        Ok((self.oauth.client_id.clone(), self.oauth.client_secret.clone()))
    }

    pub fn authorization_code(&self, code: &str) -> Result<GrantRequest> {
        if code.is_empty() {
            return Err(AppError::MissingCode);
        }
        let (client_id, client_secret) = self.credentials()?;
        Ok(GrantRequest::AuthorizationCode {
            code: code.to_string(),
            client_id,
            client_secret,
            redirect_uri: self.oauth.redirect_uri.clone(),
        })
    }

    pub fn refresh_token(&self, refresh_token: &str) -> Result<GrantRequest> {
        if refresh_token.is_empty() {
            return Err(AppError::MissingRefreshToken);
        }
        let (client_id, client_secret) = self.credentials()?;
        Ok(GrantRequest::RefreshToken {
            refresh_token: refresh_token.to_string(),
            client_id,
            client_secret,
        })
    }

    /// POSTs `grant` as JSON and decodes the credential bundle.
    ///
    /// Rejections and malformed bodies become [`AppError::AuthenticationFailed`];
    /// transport failures become [`AppError::Upstream`].
    pub async fn execute(&self, grant: GrantRequest) -> Result<CredentialBundle> {
        debug!(
            "Running {} grant against {}",
            grant.kind(),
            self.oauth.token_url
        );

        let response = self
            .client
            .post(&self.oauth.token_url)
            .json(&grant)
            .send()
            .await
            .map_err(|e| {
                error!("Token endpoint unreachable: {}", e);
                AppError::Upstream(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!("Failed to read token response: {}", e);
            AppError::Upstream(e)
        })?;

        if !status.is_success() {
            error!("Token endpoint returned {}: {}", status, body);
            return Err(AppError::AuthenticationFailed(body));
        }

        let bundle: CredentialBundle = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse token response: {}", e);
            AppError::AuthenticationFailed(format!("Failed to parse token response: {}", e))
        })?;

        if bundle.access_token.is_empty() {
            error!("Token response did not contain an access token");
            return Err(AppError::AuthenticationFailed(
                "empty access token".to_string(),
            ));
        }

        Ok(bundle)
    }
}
