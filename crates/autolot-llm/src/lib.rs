// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use autolot_app::group_thousands;
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DESCRIPTION_WORD_LIMIT: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

impl Role {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Vehicle facts the description prompt is built from. Money and location
/// arrive already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionRequest {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub location: String,
    pub down_payment: String,
    pub mileage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub make: String,
    pub model: String,
    pub year: i32,
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    model: String,
    image_model: String,
    api_key: Option<String>,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, model: &str, image_model: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("llm.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("llm.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "llm.base_url {base_url:?} must use http or https -- \
                 fix the [llm] section and retry"
            );
        }
        if model.trim().is_empty() {
            bail!("llm.model must not be empty");
        }
        if image_model.trim().is_empty() {
            bail!("llm.image_model must not be empty");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            model: model.to_owned(),
            image_model: image_model.to_owned(),
            api_key: None,
            timeout,
            http,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .authorized(self.http.get(format!("{}/models", self.base_url)))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: ModelsResponse = response.json().context("decode model list")?;
        Ok(parsed.data.into_iter().map(|model| model.id).collect())
    }

    pub fn ping(&self) -> Result<()> {
        let models = self.list_models()?;
        let exists = models
            .iter()
            .any(|name| name == &self.model || name.starts_with(&format!("{}:", self.model)));
        if !exists {
            bail!(
                "model {:?} not found -- set llm.model to one of: {}",
                self.model,
                models.join(", ")
            );
        }
        Ok(())
    }

    pub fn chat_complete(&self, messages: &[Message]) -> Result<String> {
        let request = ChatRequest::new(&self.model, messages);
        let response = self
            .authorized(
                self.http
                    .post(format!("{}/chat/completions", self.base_url)),
            )
            .json(&request)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: ChatCompletionResponse = response.json().context("decode chat response")?;
        let content = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow!("no choices in chat response"))?;
        Ok(content)
    }

    /// Marketing copy for a listing. Any failure collapses into one
    /// retryable error with the cause attached.
    pub fn generate_description(&self, request: &DescriptionRequest) -> Result<String> {
        self.describe(request)
            .context("description generation failed -- retry in a moment")
    }

    /// Returns a reference the gallery can show: a `data:` URI when the
    /// server answers with base64, otherwise the hosted URL.
    pub fn generate_image(&self, request: &ImageRequest) -> Result<String> {
        self.render(request)
            .context("image generation failed -- retry in a moment")
    }

    fn describe(&self, request: &DescriptionRequest) -> Result<String> {
        let messages = [
            Message {
                role: Role::System,
                content: DESCRIPTION_SYSTEM_PROMPT.trim().to_owned(),
            },
            Message {
                role: Role::User,
                content: build_description_prompt(request),
            },
        ];
        let raw = self.chat_complete(&messages)?;
        let cleaned = clean_description(&raw);
        if cleaned.is_empty() {
            bail!("model returned an empty description");
        }
        Ok(cleaned)
    }

    fn render(&self, request: &ImageRequest) -> Result<String> {
        let body = ImageGenerationRequest {
            model: &self.image_model,
            prompt: build_image_prompt(request),
            n: 1,
            size: "1024x1024",
            response_format: "b64_json",
        };
        let response = self
            .authorized(
                self.http
                    .post(format!("{}/images/generations", self.base_url)),
            )
            .json(&body)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: ImageGenerationResponse = response.json().context("decode image response")?;
        image_reference(parsed)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

pub fn build_description_prompt(request: &DescriptionRequest) -> String {
    let mileage = if request.mileage == 0 {
        String::new()
    } else {
        format!(" It has {} miles on it.", group_thousands(u64::from(request.mileage)))
    };
    format!(
        "Write a sales description for a {year} {make} {model} on our {location} lot.{mileage} \
         Mention that it can go home today with {down_payment} down. \
         Use at most {limit} words of plain text with no markdown.",
        year = request.year,
        make = request.make,
        model = request.model,
        location = request.location,
        down_payment = request.down_payment,
        limit = DESCRIPTION_WORD_LIMIT,
    )
}

pub fn build_image_prompt(request: &ImageRequest) -> String {
    format!(
        "Professional dealership photograph of a {} {} {}. Three-quarter front view, \
         cinematic lighting, Texas sunset in the background, photorealistic, high detail.",
        request.year, request.make, request.model
    )
}

/// Strips the wrapping quotes and stray whitespace models like to add, and
/// keeps at most [`DESCRIPTION_WORD_LIMIT`] words.
pub fn clean_description(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted
        .split_whitespace()
        .take(DESCRIPTION_WORD_LIMIT)
        .collect::<Vec<_>>()
        .join(" ")
}

fn image_reference(response: ImageGenerationResponse) -> Result<String> {
    let first = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no images in response"))?;
    if let Some(encoded) = first.b64_json.filter(|value| !value.is_empty()) {
        return Ok(format!("data:image/png;base64,{encoded}"));
    }
    if let Some(url) = first.url.filter(|value| !value.is_empty()) {
        return Ok(url);
    }
    bail!("image response carried neither b64_json nor url")
}

const DESCRIPTION_SYSTEM_PROMPT: &str = r#"
You write vehicle listings for a used-car dealership in Texas.
Sound upbeat and concrete. Only mention facts you were given.
Answer with the description text only.
"#;

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check llm.base_url and that the server is running ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<OpenAIErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), error.message);
    }

    if body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body);
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    temperature: f32,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, messages: &'a [Message]) -> Self {
        Self {
            model,
            messages: messages
                .iter()
                .map(|message| ChatMessage {
                    role: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
            stream: false,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: String,
    n: u8,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelRow>,
}

#[derive(Debug, Deserialize)]
struct ModelRow {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorEnvelope {
    error: Option<OpenAIErrorBody>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::{
        Client, DESCRIPTION_WORD_LIMIT, DescriptionRequest, ImageDatum, ImageGenerationResponse,
        ImageRequest, build_description_prompt, build_image_prompt, clean_description,
        clean_error_response, image_reference,
    };
    use reqwest::StatusCode;
    use std::time::Duration;

    fn camry() -> DescriptionRequest {
        DescriptionRequest {
            make: "Toyota".to_owned(),
            model: "Camry SE".to_owned(),
            year: 2023,
            location: "Dallas".to_owned(),
            down_payment: "$1,300".to_owned(),
            mileage: 12_000,
        }
    }

    #[test]
    fn description_prompt_carries_vehicle_facts() {
        let prompt = build_description_prompt(&camry());
        assert!(prompt.contains("2023 Toyota Camry SE"));
        assert!(prompt.contains("Dallas"));
        assert!(prompt.contains("$1,300 down"));
        assert!(prompt.contains("12,000 miles"));
        assert!(prompt.contains("at most 60 words"));
    }

    #[test]
    fn description_prompt_skips_zero_mileage() {
        let mut request = camry();
        request.mileage = 0;
        assert!(!build_description_prompt(&request).contains("miles"));
    }

    #[test]
    fn image_prompt_names_vehicle() {
        let prompt = build_image_prompt(&ImageRequest {
            make: "Chevrolet".to_owned(),
            model: "Silverado 1500".to_owned(),
            year: 2022,
        });
        assert!(prompt.starts_with("Professional dealership photograph of a 2022 Chevrolet"));
        assert!(prompt.contains("Texas"));
    }

    #[test]
    fn clean_description_strips_quotes_and_whitespace() {
        assert_eq!(
            clean_description("  \"Clean  title,\n one owner.\"  "),
            "Clean title, one owner."
        );
        assert_eq!(clean_description("   "), "");
    }

    #[test]
    fn clean_description_keeps_word_limit() {
        let long = (1..=75)
            .map(|index| format!("word{index}"))
            .collect::<Vec<_>>()
            .join(" ");
        let cleaned = clean_description(&long);
        let words = cleaned.split(' ').collect::<Vec<_>>();
        assert_eq!(words.len(), DESCRIPTION_WORD_LIMIT);
        assert_eq!(words.first(), Some(&"word1"));
        assert_eq!(words.last(), Some(&"word60"));
    }

    #[test]
    fn image_reference_prefers_base64() -> anyhow::Result<()> {
        let reference = image_reference(ImageGenerationResponse {
            data: vec![ImageDatum {
                b64_json: Some("QUJD".to_owned()),
                url: Some("https://cdn.example/img.png".to_owned()),
            }],
        })?;
        assert_eq!(reference, "data:image/png;base64,QUJD");

        let hosted = image_reference(ImageGenerationResponse {
            data: vec![ImageDatum {
                b64_json: None,
                url: Some("https://cdn.example/img.png".to_owned()),
            }],
        })?;
        assert_eq!(hosted, "https://cdn.example/img.png");

        assert!(image_reference(ImageGenerationResponse { data: Vec::new() }).is_err());
        Ok(())
    }

    #[test]
    fn error_bodies_are_summarized() {
        let openai = clean_error_response(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"quota exceeded"}}"#,
        );
        assert_eq!(openai.to_string(), "server error (429): quota exceeded");

        let plain = clean_error_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(plain.to_string(), "server error (502): upstream down");

        let noisy = clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, &"{".repeat(200));
        assert_eq!(noisy.to_string(), "server returned 500");
    }

    #[test]
    fn new_rejects_bad_settings() {
        let timeout = Duration::from_secs(1);
        assert!(Client::new("", "m", "i", timeout).is_err());
        assert!(Client::new("not a url", "m", "i", timeout).is_err());
        assert!(Client::new("ftp://host/v1", "m", "i", timeout).is_err());
        assert!(Client::new("http://localhost/v1", " ", "i", timeout).is_err());
        assert!(Client::new("http://localhost/v1", "m", "", timeout).is_err());
    }

    #[test]
    fn blank_api_key_is_dropped() -> anyhow::Result<()> {
        let client = Client::new("http://localhost/v1/", "m", "i", Duration::from_secs(1))?
            .with_api_key(Some("  ".to_owned()));
        assert_eq!(client.base_url(), "http://localhost/v1");
        assert!(client.api_key.is_none());
        Ok(())
    }
}
