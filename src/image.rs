use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ImageConfig;
use crate::error::{Error, Result};

const PROMPT_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

pub struct ImageClient {
    client: Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl ImageClient {
    pub fn new(config: &ImageConfig, api_key: String) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    pub async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let payload = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![json!({ "text": prompt })],
            }],
            generation_config: json!({ "responseModalities": ["TEXT", "IMAGE"] }),
        };

        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Provider(format!(
                "image request failed with status {}: {}",
                status.as_u16(),
                error_details(&body)
            )));
        }

        let response: GenerateResponse = serde_json::from_str(&body)?;
        extract_image(response)
    }
}

fn error_details(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => err.error.message,
        Err(_) => body.trim().to_string(),
    }
}

fn extract_image(response: GenerateResponse) -> Result<GeneratedImage> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::Parse("no candidates in response".to_string()))?;

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    for part in parts {
        if let Some(text) = part.text {
            debug!("model text: {}", text);
        }
        let Some(inline) = part.inline_data else {
            continue;
        };
        if inline.data.is_empty() {
            return Err(Error::Parse("empty image data in response".to_string()));
        }
        let bytes = STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| Error::Parse(format!("failed to decode base64 image data: {e}")))?;
        return Ok(GeneratedImage {
            bytes,
            mime_type: inline.mime_type,
        });
    }

    Err(Error::Parse("no image data found in response".to_string()))
}

/// Writes the image to `path`, creating parent directories as needed.
pub fn save(image: &GeneratedImage, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, &image.bytes)?;
    Ok(path.to_path_buf())
}

pub fn validate_prompt(prompt: &str) -> Result<&str> {
    if prompt.trim().is_empty() {
        return Err(Error::Usage("prompt cannot be empty".to_string()));
    }
    Ok(prompt)
}

/// First few characters of the prompt, for progress output.
pub fn preview(prompt: &str) -> String {
    let mut chars = prompt.chars();
    let head: String = chars.by_ref().take(PROMPT_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

// Gemini API types

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    generation_config: serde_json::Value,
}

#[derive(Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default = "default_mime_type")]
    mime_type: String,
    #[serde(default)]
    data: String,
}

fn default_mime_type() -> String {
    "image/png".to_string()
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
