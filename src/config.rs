use anyhow::{bail, Context, Result};
use axum::http::{HeaderName, HeaderValue};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Credentials and endpoints for the Atlassian OAuth client.
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub service_name: String,
    pub oauth: OAuthClientConfig,
    pub jira_api_url: String,
    pub gemini_api_key: String,
    pub gemini_api_url: String,
    pub gemini_model: String,
    pub style_guide_path: PathBuf,
    pub static_dir: PathBuf,
    pub f_dir: PathBuf,
    pub cors_allowed_origins: Vec<String>,
    pub cors_allowed_headers: Vec<String>,
    pub http_timeout: Duration,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

// Credentialed CORS cannot use `*`, and every entry must be a legal header value.
fn validate_cors(origins: &[String], headers: &[String]) -> Result<()> {
    for origin in origins {
        if origin == "*" {
            bail!("CORS_ALLOWED_ORIGINS cannot contain `*` when credentials are allowed");
        }
        HeaderValue::from_str(origin)
            .with_context(|| format!("Invalid origin in CORS_ALLOWED_ORIGINS: {origin:?}"))?;
    }
    for name in headers {
        if name == "*" {
            bail!("CORS_ALLOWED_HEADERS cannot contain `*` when credentials are allowed");
        }
        HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("Invalid header in CORS_ALLOWED_HEADERS: {name:?}"))?;
    }
    Ok(())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let port: u16 = var_or("PORT", "5000").parse().context("Invalid PORT")?;
        let host: IpAddr = var_or("HOST", "0.0.0.0").parse().context("Invalid HOST")?;

        let client_id = std::env::var("CLIENT_ID").context("CLIENT_ID must be set")?;
        let client_secret = std::env::var("CLIENT_SECRET").context("CLIENT_SECRET must be set")?;
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            bail!("CLIENT_ID and CLIENT_SECRET must not be empty");
        }

        let token_url = var_or("OAUTH_URL", "https://auth.atlassian.com/oauth/token");
        url::Url::parse(&token_url).context("Invalid OAUTH_URL")?;

        let redirect_uri = var_or("REDIRECT_URL", &format!("http://localhost:{port}/auth"));

        let jira_api_url = match std::env::var("JIRA_API_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => format!(
                "https://api.atlassian.com/ex/jira/{}",
                var_or("JIRA_CLOUD_ID", "")
            ),
        };

        let http_timeout = var_or("HTTP_TIMEOUT_SECS", "30")
            .parse()
            .map(Duration::from_secs)
            .context("Invalid HTTP_TIMEOUT_SECS")?;

        let cors_allowed_origins = split_list(&var_or(
            "CORS_ALLOWED_ORIGINS",
            "http://localhost:5000,http://localhost:7000",
        ));
        let cors_allowed_headers = split_list(&var_or(
            "CORS_ALLOWED_HEADERS",
            "X-Code,x-refresh,Set-Cookie,Content-Type",
        ));
        validate_cors(&cors_allowed_origins, &cors_allowed_headers)?;

        Ok(Self {
            host,
            port,
            service_name: var_or("SERVICE_NAME", "jira-connect"),
            oauth: OAuthClientConfig {
                client_id,
                client_secret,
                redirect_uri,
                token_url,
            },
            jira_api_url: jira_api_url.trim_end_matches('/').to_string(),
            gemini_api_key: var_or("GEMINI_API_KEY", ""),
            gemini_api_url: var_or(
                "GEMINI_API_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            )
            .trim_end_matches('/')
            .to_string(),
            gemini_model: var_or("GEMINI_MODEL", "gemini-2.0-flash"),
            style_guide_path: var_or("STYLE_GUIDE_PATH", "jira/style-guide.md").into(),
            static_dir: var_or("STATIC_DIR", "pages/static").into(),
            f_dir: var_or("F_DIR", "f").into(),
            cors_allowed_origins,
            cors_allowed_headers,
            http_timeout,
        })
    }

    pub fn server_address(&self) -> SocketAddr {
        (self.host, self.port).into()
    }
}
