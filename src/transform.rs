use crate::{
    error::{AppError, Result},
    AppState,
};
use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info};

#[derive(Debug, Deserialize)]
pub struct TransformRequest {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default, rename = "taskName")]
    pub task_name: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TransformResult {
    pub heading: String,
    pub description: String,
    #[serde(default)]
    pub links: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

pub fn build_prompt(style_guide: &str, request: &TransformRequest) -> String {
    format!(
        "{}\n\nUse the above style guide to transform the following input:\n\nHeading: {}\nDescription: {}\nTask Name: {}",
        style_guide,
        request.heading,
        request.description.join("\n"),
        request.task_name,
    )
}

fn generation_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "heading": { "type": "STRING" },
                    "description": { "type": "STRING" },
                    "links": { "type": "ARRAY", "items": { "type": "STRING" } }
                },
                "propertyOrdering": ["heading", "description", "links"]
            }
        }
    })
}

/// Pulls the structured result out of the first candidate's text part.
fn parse_model_output(response: GenerateContentResponse) -> Result<TransformResult> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().find_map(|part| part.text))
        .ok_or_else(|| AppError::Transform("model returned no text".into()))?;

    serde_json::from_str(&text)
        .map_err(|e| AppError::Transform(format!("failed to parse model output: {}", e)))
}

pub async fn transform_issue(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<TransformRequest>, AppError>,
) -> Result<Json<TransformResult>> {
    let config = &state.config;
    if config.gemini_api_key.is_empty() {
        return Err(AppError::Configuration("GEMINI_API_KEY is not set".into()));
    }

    let style_guide = tokio::fs::read_to_string(&config.style_guide_path)
        .await
        .map_err(|e| {
            error!(
                "error reading style guide {}: {}",
                config.style_guide_path.display(),
                e
            );
            AppError::Transform(format!("failed to read style guide: {}", e))
        })?;

    let prompt = build_prompt(&style_guide, &request);
    let url = format!(
        "{}/models/{}:generateContent",
        config.gemini_api_url, config.gemini_model
    );

    info!("generating results for task {}", request.task_name);
    debug!("Calling language model at: {}", url);

    let response = state
        .http_client
        .post(&url)
        .header("x-goog-api-key", &config.gemini_api_key)
        .json(&generation_body(&prompt))
        .send()
        .await
        .map_err(|e| {
            error!("Language model request failed: {}", e);
            AppError::Transform(e.to_string())
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        error!("Language model returned {}: {}", status, error_text);
        return Err(AppError::Transform(format!("upstream status {}", status)));
    }

    let body = response
        .json::<GenerateContentResponse>()
        .await
        .map_err(|e| {
            error!("Failed to decode language model response: {}", e);
            AppError::Transform(e.to_string())
        })?;

    let result = parse_model_output(body).inspect_err(|e| error!("{}", e))?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_places_style_guide_before_input() {
        let request = TransformRequest {
            heading: "Fix login".into(),
            description: vec!["First line".into(), "Second line".into()],
            task_name: "PROJ-1".into(),
        };
        let prompt = build_prompt("# Guide", &request);

        assert!(prompt.starts_with("# Guide\n\nUse the above style guide"));
        assert!(prompt.contains("Heading: Fix login\n"));
        assert!(prompt.contains("Description: First line\nSecond line\n"));
        assert!(prompt.ends_with("Task Name: PROJ-1"));
    }

    #[test]
    fn model_output_is_read_from_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{
                    "text": "{\"heading\":\"H\",\"description\":\"D\",\"links\":[\"https://x\"]}"
                }]}
            }]
        }))
        .unwrap();

        assert_eq!(
            parse_model_output(response).unwrap(),
            TransformResult {
                heading: "H".into(),
                description: "D".into(),
                links: vec!["https://x".into()],
            }
        );
    }

    #[test]
    fn missing_or_garbled_output_is_an_error() {
        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(parse_model_output(empty), Err(AppError::Transform(_))));

        let garbled: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "not json" }] } }]
        }))
        .unwrap();
        assert!(matches!(parse_model_output(garbled), Err(AppError::Transform(_))));
    }
}
