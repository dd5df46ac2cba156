//! Remote text generation. The model is asked for a single JSON object which is then validated
//! and normalized into an [AnalysisResult].

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::{AiConfig, AiProvider},
    utils::time::{format_minutes, round_one_decimal},
};

use super::{AnalysisInput, AnalysisResult, AnalysisSource};

const SYSTEM_PROMPT: &str =
    "You analyze computer usage data, read the user's mood and write fun social media posts.";

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 1024;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Sends `prompt` and returns the raw reply text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

pub fn build_prompt(input: &AnalysisInput) -> String {
    let minutes = &input.minutes;
    let productivity = &input.productivity;
    format!(
        r#"Analyze the following computer usage data for today, then write a short report and a social media post.

## Today's data
- Work time: {work}
- Game time: {game}
- Entertainment time: {entertainment}
- Social time: {social}
- Productivity ratio: {productivity_ratio:.1}%
- Leisure ratio: {leisure_ratio:.1}%
- Activity score: {activity:.1}/100

## What to infer
1. Mood score (1-10), from the balance of work and leisure and the activity score
2. Stress score (1-10), long work hours and high activity mean more stress
3. Summary: one or two sentences describing the day
4. Social media post: fun, upbeat and privacy preserving

## Post requirements
- 2 to 4 lines
- Relaxed and playful tone, emoji are welcome
- Never mention specific projects, visited websites or chat contents
- May mention the overall state, how productive the day felt and small reflections
- Style examples:
  "Productivity through the roof today 💪 A rare focused day!"
  "Another day of love and hate with the code"
  "The fine art of working and slacking ✨"

## Output format
Reply with exactly one JSON object in this shape:
{{
    "mood_score": 7,
    "stress_score": 5,
    "summary": "Worked efficiently today and still got enough rest",
    "wechat_post": "Energy fully charged 🔋\nProductivity: ★★★★☆\nA fulfilling day, good night 💤"
}}"#,
        work = format_minutes(minutes.work),
        game = format_minutes(minutes.game),
        entertainment = format_minutes(minutes.entertainment),
        social = format_minutes(minutes.social),
        productivity_ratio = productivity.productivity_ratio,
        leisure_ratio = productivity.leisure_ratio,
        activity = input.avg_activity_score,
    )
}

/// Runs the prompt through `generator` and validates the reply.
pub async fn analyze(
    generator: &dyn TextGenerator,
    input: &AnalysisInput,
) -> Result<AnalysisResult> {
    let reply = generator.generate(&build_prompt(input)).await?;
    debug!("Remote reply: {reply}");
    parse_reply(&reply)
}

#[derive(Debug, Deserialize)]
struct RemoteReply {
    mood_score: f64,
    stress_score: f64,
    summary: String,
    #[serde(alias = "caption")]
    wechat_post: String,
}

/// Extracts the JSON object from a model reply. Prose or code fences around the object are
/// ignored, scores are clamped to 1..=10 and literal `\n` sequences in the caption become line
/// breaks.
pub fn parse_reply(text: &str) -> Result<AnalysisResult> {
    let json = extract_json_object(text).ok_or_else(|| anyhow!("no JSON object in reply"))?;
    let reply: RemoteReply = serde_json::from_str(json).context("malformed reply")?;

    if !reply.mood_score.is_finite() || !reply.stress_score.is_finite() {
        bail!("scores are not numbers");
    }

    Ok(AnalysisResult {
        mood_score: normalize_score(reply.mood_score),
        stress_score: normalize_score(reply.stress_score),
        summary: reply.summary.trim().to_string(),
        caption: reply.wechat_post.replace("\\n", "\n").trim().to_string(),
        source: AnalysisSource::Remote,
    })
}

fn normalize_score(score: f64) -> f64 {
    round_one_decimal(score.clamp(1., 10.))
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI compatible chat completions endpoint.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(client: reqwest::Client, config: &AiConfig, api_key: String) -> Self {
        Self {
            client,
            base_url: trimmed_base_url(config, OPENAI_BASE_URL),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.7,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("request to OpenAI failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("OpenAI returned {status}: {body}");
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .find_map(|v| v.message.content)
            .ok_or_else(|| anyhow!("OpenAI reply has no content"))
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic messages endpoint.
pub struct AnthropicGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicGenerator {
    pub fn new(client: reqwest::Client, config: &AiConfig, api_key: String) -> Self {
        Self {
            client,
            base_url: trimmed_base_url(config, ANTHROPIC_BASE_URL),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| ANTHROPIC_DEFAULT_MODEL.to_string()),
        }
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: ANTHROPIC_MAX_TOKENS,
            system: SYSTEM_PROMPT,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .context("request to Anthropic failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Anthropic returned {status}: {body}");
        }

        let body: MessagesResponse = response.json().await?;
        body.content
            .into_iter()
            .filter(|v| v.kind == "text")
            .find_map(|v| v.text)
            .ok_or_else(|| anyhow!("Anthropic reply has no text"))
    }
}

fn trimmed_base_url(config: &AiConfig, default: &str) -> String {
    config
        .base_url
        .as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// Generator for the configured provider. `None` when no provider is configured or no API key
/// can be found.
pub fn build_text_generator(config: &AiConfig) -> Result<Option<Box<dyn TextGenerator>>> {
    if config.provider == AiProvider::None {
        return Ok(None);
    }
    let Some(api_key) = config.resolved_api_key() else {
        return Ok(None);
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .build()
        .context("failed to build HTTP client")?;

    let generator: Box<dyn TextGenerator> = match config.provider {
        AiProvider::OpenAi => Box::new(OpenAiGenerator::new(client, config, api_key)),
        AiProvider::Anthropic => Box::new(AnthropicGenerator::new(client, config, api_key)),
        AiProvider::None => return Ok(None),
    };
    Ok(Some(generator))
}
