use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Response;
use serde::{Deserialize, Serialize};

use crate::domain::{AnalysisResult, PageSummary};

use super::error::ModelError;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*```[A-Za-z0-9_+-]*[ \t]*\r?$").expect("valid fence regex"));

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

const RESTRICTED_INSTRUCTIONS: &str = r#"### RESTRICTED ACCESS
The crawl of this domain was blocked, so the content preview is only a placeholder.
Run a competitive-intelligence audit instead of a content audit:
- judge the brand strength of the domain from its URL and what you know of it,
- estimate its authority from its known position in the niche,
- base the roadmap on growth patterns typical for that industry.
Set "is_simulated" to true."#;

const OUTPUT_FORMAT: &str = r#"### OUTPUT FORMAT
Respond with a single JSON object and nothing else:
{
  "authority_score": number (0-100),
  "executive_summary": "one paragraph on the site's current standing",
  "metrics": {
    "quality": number (0-100),
    "authority": number (0-100),
    "technical": number (0-100),
    "structure": number (0-100),
    "velocity": number (0-100)
  },
  "growth_roadmap": [
    { "step": number, "action": "specific technical fix", "impact": "High" | "Med" | "Low", "rationale": "why it matters" }
  ],
  "niche_verdict": "one sentence naming the site a 'Leader', 'Challenger' or 'Laggard'",
  "is_simulated": boolean
}
The roadmap must contain exactly 3 steps."#;

pub fn build_prompt(summary: &PageSummary) -> String {
    let headings = serde_json::to_string(&summary.headings).unwrap_or_else(|_| "{}".to_string());
    let load_speed = serde_json::to_string(&summary.load_speed_indicator)
        .unwrap_or_else(|_| "{}".to_string());

    let mut prompt = String::from(
        "You are a senior SEO strategist auditing a website for its niche authority.\n\
         Be clinical and data-driven. Skip generic advice; name concrete gaps in topical \
         coverage, metadata and link structure.\n\n",
    );

    if summary.is_restricted_content() {
        prompt.push_str(RESTRICTED_INSTRUCTIONS);
        prompt.push_str("\n\n");
    }

    prompt.push_str("### INPUT DATA\n");
    prompt.push_str(&format!("URL: {}\n", summary.url));
    prompt.push_str(&format!("Title: {}\n", summary.title));
    prompt.push_str(&format!("Description: {}\n", summary.description));
    prompt.push_str(&format!("Headings: {headings}\n"));
    prompt.push_str(&format!("Internal Links: {}\n", summary.internal_link_count));
    prompt.push_str(&format!("External Links: {}\n", summary.external_link_count));
    prompt.push_str(&format!(
        "Image Alt Tags Count: {}\n",
        summary.image_alt_tags.len()
    ));
    prompt.push_str(&format!("Load Speed Indicators: {load_speed}\n"));
    prompt.push_str(&format!("Content Preview: {}\n\n", summary.content));
    prompt.push_str(OUTPUT_FORMAT);
    prompt
}

pub fn build_request(prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".into()),
            parts: vec![Part {
                text: Some(prompt.to_string()),
            }],
        }],
        safety_settings: SAFETY_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category: (*category).into(),
                threshold: "BLOCK_NONE".into(),
            })
            .collect(),
    }
}

pub async fn parse_response(response: Response) -> Result<String, ModelError> {
    let body = response.bytes().await.map_err(ModelError::from_transport)?;
    let completion: GenerateContentResponse = serde_json::from_slice(&body)
        .map_err(|err| ModelError::MalformedResponse(err.to_string()))?;
    response_text(completion)
}

fn response_text(completion: GenerateContentResponse) -> Result<String, ModelError> {
    let text = completion
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    Ok(text)
}

/// Pulls the provider's own error message out of a failed response body.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text.trim(), "").trim().to_string()
}

/// Parses the first balanced JSON object in `raw` that has the analysis shape.
pub fn parse_analysis(raw: &str) -> Result<AnalysisResult, ModelError> {
    let cleaned = strip_code_fences(raw);
    let mut last_error = None;

    for (start, _) in cleaned.match_indices('{') {
        let mut stream =
            serde_json::Deserializer::from_str(&cleaned[start..]).into_iter::<AnalysisResult>();
        match stream.next() {
            Some(Ok(analysis)) => return Ok(analysis),
            Some(Err(err)) if last_error.is_none() => last_error = Some(err.to_string()),
            _ => {}
        }
    }

    Err(ModelError::MalformedResponse(
        last_error.unwrap_or_else(|| "no JSON object in response".to_string()),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
