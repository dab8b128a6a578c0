use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::VoiceGender;

/// A single prompt for the generative service.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub system_instruction: Option<String>,
    pub json_output: bool,
    pub response_schema: Option<Value>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.json_output = true;
        self.response_schema = Some(schema);
        self
    }
}

/// The opaque "prompt in, text out" capability every AI feature relies on.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }

    async fn call(&self, model: &str, body: &GenerateContentReq<'_>) -> Result<GenerateContentResp> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .context("failed to call generateContent endpoint")?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "generateContent for {model} returned {status}: {}",
                normalize_err_body(&body)
            );
        }

        response
            .json::<GenerateContentResp>()
            .await
            .context("failed to decode generateContent response")
    }

    /// Synthesizes speech and returns the raw base64 audio payload.
    pub async fn synthesize(&self, model: &str, text: &str, voice: VoiceGender) -> Result<String> {
        let body = GenerateContentReq {
            contents: vec![Content::user(text)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO"]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: prebuilt_voice(voice),
                        },
                    },
                }),
                ..Default::default()
            }),
        };

        let response = self.call(model, &body).await?;
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().find_map(|part| part.inline_data))
            .map(|data| data.data)
            .ok_or_else(|| anyhow::anyhow!("speech response for {model} carried no audio"))
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let generation_config = request.json_output.then(|| GenerationConfig {
            response_mime_type: Some("application/json"),
            response_schema: request.response_schema.clone(),
            ..Default::default()
        });

        let body = GenerateContentReq {
            contents: vec![Content::user(&request.prompt)],
            system_instruction: request
                .system_instruction
                .as_deref()
                .map(Content::instruction),
            generation_config,
        };

        let response = self.call(&request.model, &body).await?;
        let text = response
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

        Ok(text.trim().to_string())
    }
}

fn prebuilt_voice(voice: VoiceGender) -> &'static str {
    match voice {
        VoiceGender::Female => "Kore",
        VoiceGender::Male => "Puck",
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentReq<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart<'a>>,
}

impl<'a> Content<'a> {
    fn user(text: &'a str) -> Self {
        Self {
            role: Some("user"),
            parts: vec![TextPart { text }],
        }
    }

    fn instruction(text: &'a str) -> Self {
        Self {
            role: None,
            parts: vec![TextPart { text }],
        }
    }
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: &'static str,
}

#[derive(Deserialize)]
struct GenerateContentResp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct InlineData {
    data: String,
}

/// Models sometimes wrap JSON or prose in a markdown fence; keep only the body.
pub fn sanitize_model_output(answer: &str) -> String {
    let mut text = answer.trim().to_string();
    if text.starts_with("```") {
        let fenced = Regex::new(r"(?s)^```[a-zA-Z]*\n(.*)\n```$").ok();
        if let Some(caps) = fenced.as_ref().and_then(|re| re.captures(&text)) {
            if let Some(body) = caps.get(1) {
                text = body.as_str().trim().to_string();
            }
        } else {
            text = text.replace("```", "").trim().to_string();
        }
    }
    text
}

/// Decodes a JSON-mode reply.
pub fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let body = sanitize_model_output(reply);
    serde_json::from_str(&body).context("model reply is not the expected JSON")
}

fn normalize_err_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
        if let Some(err) = json
            .get("error")
            .and_then(|v| v.get("message").or(Some(v)))
            .and_then(|v| v.as_str())
        {
            return err.to_string();
        }
    }

    trimmed.to_string()
}
