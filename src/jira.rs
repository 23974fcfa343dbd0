use crate::{
    cookies,
    error::{AppError, Result},
    AppState,
};
use axum::{
    body::Body,
    extract::State,
    http::header,
    response::Response,
    Json,
};
use axum_extra::extract::{CookieJar, WithRejection};
use serde::Deserialize;
use tracing::{debug, error, info};

#[derive(Debug, Deserialize)]
pub struct SingleIssueRequest {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub jql: String,
    #[serde(default)]
    pub fields: Option<String>,
    #[serde(default, rename = "maxResults")]
    pub max_results: Option<u32>,
}

// Issue keys look like `PROJ-123`; anything else could escape the issue path.
fn is_valid_issue_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn search_query(request: &SearchRequest) -> Result<String> {
    let fields = request.fields.as_deref().unwrap_or("*all");
    let max_results = request.max_results.map(|n| n.to_string());

    let mut params = vec![("jql", request.jql.as_str()), ("fields", fields)];
    if let Some(max) = max_results.as_deref() {
        params.push(("maxResults", max));
    }

    serde_urlencoded::to_string(params)
        .map_err(|e| AppError::ProxyError(format!("Failed to encode search query: {}", e)))
}

pub async fn single_issue(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(request), _): WithRejection<Json<SingleIssueRequest>, AppError>,
) -> Result<Response> {
    let key = request.key.trim();
    if key.is_empty() {
        return Err(AppError::BadRequest("Missing issue key".into()));
    }
    if !is_valid_issue_key(key) {
        return Err(AppError::BadRequest("Invalid issue key".into()));
    }

    let url = format!("{}/rest/api/3/issue/{}", state.config.jira_api_url, key);
    forward(&state, &jar, &url).await
}

pub async fn search(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(request), _): WithRejection<Json<SearchRequest>, AppError>,
) -> Result<Response> {
    if request.jql.trim().is_empty() {
        return Err(AppError::BadRequest("Missing JQL".into()));
    }

    let url = format!(
        "{}/rest/api/3/search/jql?{}",
        state.config.jira_api_url,
        search_query(&request)?
    );
    forward(&state, &jar, &url).await
}

// GET `url` with the caller's bearer token and relay status and body as-is
async fn forward(state: &AppState, jar: &CookieJar, url: &str) -> Result<Response> {
    let token = cookies::access_token(jar).ok_or(AppError::Unauthorized)?;

    debug!("Proxying Jira request to: {}", url);
    let response = state
        .http_client
        .get(url)
        .bearer_auth(token)
        .header(header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| {
            error!("Jira request failed: {}", e);
            AppError::ProxyError(format!("Request failed: {}", e))
        })?;

    let status = response.status();
    info!("Jira response status: {}", status);

    let body_bytes = response.bytes().await.map_err(|e| {
        error!("Failed to read Jira response body: {}", e);
        AppError::ProxyError(format!("Failed to read response: {}", e))
    })?;

    if !status.is_success() {
        if let Ok(body_str) = std::str::from_utf8(&body_bytes) {
            error!("Jira error response body: {}", body_str);
        }
    }

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body_bytes))
        .map_err(|e| {
            error!("Failed to build response: {}", e);
            AppError::ProxyError(format!("Failed to build response: {}", e))
        })
}
