use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;

use crate::gemini::GeminiClient;
use crate::models::{View, VoiceGender};

pub const TTS_SAMPLE_RATE: u32 = 24_000;

/// Synthesized speech: 16-bit little-endian mono PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechClip {
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
}

impl SpeechClip {
    pub fn content_type(&self) -> String {
        format!("audio/L16;rate={};channels=1", self.sample_rate)
    }
}

#[async_trait]
pub trait NarrationService: Send + Sync {
    async fn speak(&self, text: &str, voice: VoiceGender) -> Result<SpeechClip>;
}

#[derive(Clone)]
pub struct GeminiNarrator {
    client: GeminiClient,
    model: String,
}

impl GeminiNarrator {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl NarrationService for GeminiNarrator {
    async fn speak(&self, text: &str, voice: VoiceGender) -> Result<SpeechClip> {
        let text = text.trim();
        if text.is_empty() {
            anyhow::bail!("cannot narrate empty text");
        }

        let encoded = self.client.synthesize(&self.model, text, voice).await?;
        let pcm = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .context("speech payload is not valid base64")?;

        Ok(SpeechClip {
            pcm,
            sample_rate: TTS_SAMPLE_RATE,
        })
    }
}

/// Per-view single-flight for narration. A request for a view that is
/// already speaking is dropped, not queued.
#[derive(Clone, Default)]
pub struct NarrationGate {
    busy: Arc<Mutex<HashMap<View, Option<usize>>>>,
}

/// Holds a view's narration slot until dropped.
pub struct NarrationPermit {
    busy: Arc<Mutex<HashMap<View, Option<usize>>>>,
    view: View,
}

impl Drop for NarrationPermit {
    fn drop(&mut self) {
        if let Ok(mut busy) = self.busy.lock() {
            busy.remove(&self.view);
        }
    }
}

impl NarrationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the view, remembering which item (verse or message index) is
    /// being read. `None` if the view is already narrating.
    pub fn try_acquire(&self, view: View, slot: Option<usize>) -> Option<NarrationPermit> {
        let mut busy = self.busy.lock().ok()?;
        if busy.contains_key(&view) {
            return None;
        }
        busy.insert(view, slot);
        Some(NarrationPermit {
            busy: self.busy.clone(),
            view,
        })
    }

    pub fn is_busy(&self, view: View) -> bool {
        self.busy
            .lock()
            .map(|busy| busy.contains_key(&view))
            .unwrap_or(false)
    }

    /// The item a view is currently reading aloud, if any.
    pub fn active_slot(&self, view: View) -> Option<usize> {
        self.busy
            .lock()
            .ok()
            .and_then(|busy| busy.get(&view).copied().flatten())
    }

    /// Runs `speak` under the view's slot. `Ok(None)` means the request was
    /// dropped because the view was busy.
    pub async fn narrate(
        &self,
        service: &dyn NarrationService,
        view: View,
        slot: Option<usize>,
        text: &str,
        voice: VoiceGender,
    ) -> Result<Option<SpeechClip>> {
        let Some(_permit) = self.try_acquire(view, slot) else {
            tracing::debug!("narration for {view:?} dropped: already speaking");
            return Ok(None);
        };
        service.speak(text, voice).await.map(Some)
    }
}
