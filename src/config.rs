use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub chat_model: String,
    pub fast_model: String,
    pub tts_model: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub scripture_base_url: String,
    pub translation: String,
    pub gemini_base_url: String,
    pub gemini_api_key: String,
    pub target_language: String,
    pub http_timeout: Duration,
    pub models: ModelConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .unwrap_or_default();

        Self {
            bind_addr: env::var("DEVOTIONAL_BIND")
                .unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            scripture_base_url: env::var("SCRIPTURE_BASE_URL")
                .unwrap_or_else(|_| "https://bible-api.com".to_string()),
            translation: env::var("SCRIPTURE_TRANSLATION")
                .unwrap_or_else(|_| "almeida".to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            gemini_api_key: api_key,
            target_language: env::var("TARGET_LANGUAGE")
                .unwrap_or_else(|_| "Portuguese (Brazil)".to_string()),
            http_timeout: Duration::from_secs(
                env::var("HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
            models: ModelConfig {
                chat_model: env::var("CHAT_MODEL")
                    .unwrap_or_else(|_| "gemini-3-pro-preview".to_string()),
                fast_model: env::var("FAST_MODEL")
                    .unwrap_or_else(|_| "gemini-3-flash-preview".to_string()),
                tts_model: env::var("TTS_MODEL")
                    .unwrap_or_else(|_| "gemini-2.5-flash-preview-tts".to_string()),
            },
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.gemini_api_key.trim().is_empty()
    }
}
