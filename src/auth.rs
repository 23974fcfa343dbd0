use crate::{
    cookies,
    error::Result,
    types::{GrantRequest, TokenSummary},
    AppState,
};
use axum::{extract::State, http::HeaderMap, Json};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use tracing::{info, warn};

pub const CODE_HEADER: &str = "x-code";
pub const REFRESH_HEADER: &str = "x-refresh";

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

// Exchange the authorization code from `X-Code` for a fresh session
pub async fn generate_token(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, Json<TokenSummary>)> {
    let grant = state
        .grants
        .authorization_code(header_value(&headers, CODE_HEADER))
        .inspect_err(|e| warn!("Rejected /oauth request: {}", e))?;

    issue_session(&state, jar, grant).await
}

// Mint a new access token from the refresh token in `x-refresh`
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, Json<TokenSummary>)> {
    let grant = state
        .grants
        .refresh_token(header_value(&headers, REFRESH_HEADER))
        .inspect_err(|e| warn!("Rejected /refresh request: {}", e))?;

    issue_session(&state, jar, grant).await
}

async fn issue_session(
    state: &AppState,
    jar: CookieJar,
    grant: GrantRequest,
) -> Result<(CookieJar, Json<TokenSummary>)> {
    let kind = grant.kind();
    let bundle = state.grants.execute(grant).await?;
    let jar = cookies::write_bundle(jar, &bundle, Utc::now())?;

    info!(
        "Issued session cookies via {} grant (scope: {}, expires_in: {})",
        kind, bundle.scope, bundle.expires_in
    );
    Ok((jar, Json(TokenSummary::from(&bundle))))
}
