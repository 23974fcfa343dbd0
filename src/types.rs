use serde::{Deserialize, Serialize};

/// Token endpoint response. Rebuilt per request from cookies; never stored server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialBundle {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    /// Only issued when `offline_access` was granted.
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
}

/// Body sent to the token endpoint, tagged by `grant_type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "grant_type", rename_all = "snake_case")]
pub enum GrantRequest {
    AuthorizationCode {
        code: String,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    },
    RefreshToken {
        refresh_token: String,
        client_id: String,
        client_secret: String,
    },
}

impl GrantRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            GrantRequest::AuthorizationCode { .. } => "authorization_code",
            GrantRequest::RefreshToken { .. } => "refresh_token",
        }
    }
}

/// Response body of `/oauth` and `/refresh`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TokenSummary {
    pub scope: String,
    #[serde(rename = "type")]
    pub token_type: String,
}

impl From<&CredentialBundle> for TokenSummary {
    fn from(bundle: &CredentialBundle) -> Self {
        Self {
            scope: bundle.scope.clone(),
            token_type: bundle.token_type.clone(),
        }
    }
}
