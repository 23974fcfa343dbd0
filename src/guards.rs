//! Request guards. Each one either forwards to the inner service untouched or
//! short-circuits with an error response, so they nest in any order.

use crate::{
    cookies,
    error::{AppError, Result},
};
use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Rejects any request whose method differs from the one in state with a 405.
pub async fn require_method(
    State(allowed): State<Method>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if *request.method() != allowed {
        warn!(
            "method {} attempted on {}",
            request.method(),
            request.uri().path()
        );
        return Err(AppError::MethodNotAllowed);
    }

    Ok(next.run(request).await)
}

/// Rejects requests without an `oauth_token` cookie with a 401.
pub async fn require_session(jar: CookieJar, request: Request, next: Next) -> Result<Response> {
    if !cookies::has_session(&jar) {
        warn!("attempted to access auth route {}", request.uri().path());
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}

/// Lowercase file extensions (without the dot) that may be served statically.
#[derive(Debug, Clone)]
pub struct AllowedExtensions(Arc<HashSet<String>>);

impl AllowedExtensions {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(Arc::new(
            extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        ))
    }

    /// Images, scripts, stylesheets, fonts and plain documents.
    pub fn web_assets() -> Self {
        Self::new([
            "jpg", "jpeg", "png", "gif", "svg", "webp", "ico", "bmp", "tiff", // images
            "js", "mjs", // scripts
            "css", // styles
            "woff", "woff2", "ttf", "eot", // fonts
            "pdf", "txt",
        ])
    }

    pub fn allows(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.0.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

/// Rejects paths whose extension is not allow-listed with a 403, before the
/// file system is consulted.
pub async fn restrict_extensions(
    State(allowed): State<AllowedExtensions>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if !allowed.allows(request.uri().path()) {
        warn!("client requested forbidden file type: {}", request.uri().path());
        return Err(AppError::ForbiddenFileType);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request as HttpRequest, StatusCode},
        middleware,
        routing::any,
        Router,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn counting_app(hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/guarded",
                any(move || {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        "ok"
                    }
                })
                .layer(middleware::from_fn(require_session))
                .layer(middleware::from_fn_with_state(Method::POST, require_method)),
            )
    }

    async fn send(app: Router, method: Method, cookie: Option<&str>) -> StatusCode {
        let mut builder = HttpRequest::builder().method(method).uri("/guarded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn wrong_method_is_405_and_skips_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let status = send(
                counting_app(hits.clone()),
                method,
                Some("oauth_token=abc"),
            )
            .await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_token_cookie_is_401_and_skips_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let status = send(counting_app(hits.clone()), Method::POST, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let status = send(
            counting_app(hits.clone()),
            Method::POST,
            Some("scopes=read:me; refresh_token=xyz"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn token_cookie_reaches_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let status = send(
            counting_app(hits.clone()),
            Method::POST,
            Some("oauth_token=expired-or-not"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn allow_list_matches_lowercased_extension() {
        let allowed = AllowedExtensions::web_assets();
        assert!(allowed.allows("/static/main.js"));
        assert!(allowed.allows("/static/img/Logo.PNG"));
        assert!(allowed.allows("/f/fonts/a.woff2"));

        assert!(!allowed.allows("/static/main.go"));
        assert!(!allowed.allows("/static/.env"));
        assert!(!allowed.allows("/static/config.env"));
        assert!(!allowed.allows("/static/Makefile"));
        assert!(!allowed.allows("/static/"));
    }

    #[test]
    fn custom_allow_list_accepts_dotted_entries() {
        let allowed = AllowedExtensions::new([".JSON", "md"]);
        assert!(allowed.allows("/docs/a.json"));
        assert!(allowed.allows("/docs/readme.md"));
        assert!(!allowed.allows("/docs/a.js"));
    }

    #[tokio::test]
    async fn disallowed_extension_is_403_even_when_file_would_exist() {
        let app = Router::new()
            .route("/static/*path", any(|| async { "file contents" }))
            .layer(middleware::from_fn_with_state(
                AllowedExtensions::web_assets(),
                restrict_extensions,
            ));

        for uri in ["/static/main.go", "/static/.env", "/static/go.mod"] {
            let response = app
                .clone()
                .oneshot(HttpRequest::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
        }

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/static/app.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
