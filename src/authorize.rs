use crate::config::OAuthClientConfig;
use url::form_urlencoded;
use uuid::Uuid;

pub const AUTHORIZE_URL: &str = "https://auth.atlassian.com/authorize";
pub const AUDIENCE: &str = "api.atlassian.com";

// Read-only Jira scopes. Repeats are harmless; the authorization server dedupes.
pub const SCOPES: &[&str] = &[
    "offline_access",
    "read:me",
    "read:project.avatar:jira",
    "read:filter:jira",
    "read:group:jira",
    "read:issue:jira",
    "read:attachment:jira",
    "read:comment:jira",
    "read:comment.property:jira",
    "read:field:jira",
    "read:issue-details:jira",
    "read:field.default-value:jira",
    "read:field.option:jira",
    "read:field:jira",
    "read:group:jira",
];

/// Fresh UUIDv7 for the `state` parameter.
pub fn generate_state() -> String {
    Uuid::now_v7().to_string()
}

/// Builds the Atlassian consent-screen URL.
///
/// The `state` value is not remembered anywhere; the `/auth` callback does
/// not check it.
pub fn build_authorization_url(oauth: &OAuthClientConfig) -> String {
    let state = generate_state();
    let scope = SCOPES.join(" ");

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("audience", AUDIENCE)
        .append_pair("client_id", &oauth.client_id)
        .append_pair("redirect_uri", &oauth.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("prompt", "consent")
        .append_pair("state", &state)
        .append_pair("scope", &scope)
        .finish();

    format!("{}?{}", AUTHORIZE_URL, query)
}
