use crate::{authorize::build_authorization_url, AppState};
use axum::{extract::State, response::Html};
use tracing::debug;

fn escape_attr(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// Landing page with a freshly built consent-screen link
pub async fn root(State(state): State<AppState>) -> Html<String> {
    let auth_url = build_authorization_url(&state.config.oauth);
    debug!("Rendering landing page with authorization URL: {}", auth_url);

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Zend</title>
    <meta charset="utf-8">
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            background-color: #f5f5f5;
        }}
        .container {{
            text-align: center;
            background: white;
            padding: 2rem;
            border-radius: 8px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
            max-width: 500px;
        }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Zend</h1>
        <p><a id="login" href="{}">Connect your Jira account</a></p>
        <div id="issues"></div>
    </div>
    <script src="/static/main.js"></script>
</body>
</html>
"#,
        escape_attr(&auth_url)
    ))
}

// Consent redirect target: hands the code to /oauth, then returns home
pub async fn consent_redirect() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Auth Page</title>
    <meta charset="utf-8">
</head>
<body>
    <p>This is the auth page. You will be redirected back to home</p>
    <script>
        (async () => {
            const code = new URLSearchParams(window.location.search).get('code') || '';
            try {
                const response = await fetch('/oauth', {
                    method: 'POST',
                    credentials: 'include',
                    headers: { 'X-Code': code }
                });
                if (!response.ok) {
                    throw new Error('Authentication failed');
                }
            } catch (e) {
                console.error(e);
            }
            window.location.replace('/');
        })();
    </script>
</body>
</html>
"#,
    )
}
