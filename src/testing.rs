//! In-memory stand-ins for the remote services, used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::books::Book;
use crate::gemini::{GenerationRequest, GenerativeModel};
use crate::models::{Verse, VoiceGender};
use crate::narration::{NarrationService, SpeechClip};
use crate::scripture::ScriptureSource;

type ChapterRoute = (String, u32, Option<String>);

/// Serves canned chapters; anything not registered fails like a 404.
#[derive(Default)]
pub struct MockScripture {
    chapters: HashMap<ChapterRoute, Vec<Verse>>,
    calls: Mutex<Vec<ChapterRoute>>,
}

impl MockScripture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chapter(
        mut self,
        api_name: &str,
        chapter: u32,
        translation: Option<&str>,
        verses: Vec<Verse>,
    ) -> Self {
        self.chapters.insert(
            (
                api_name.to_string(),
                chapter,
                translation.map(str::to_string),
            ),
            verses,
        );
        self
    }

    pub fn calls(&self) -> Vec<ChapterRoute> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_for(&self, api_name: &str, chapter: u32) -> usize {
        self.calls()
            .iter()
            .filter(|(name, ch, _)| name == api_name && *ch == chapter)
            .count()
    }
}

#[async_trait]
impl ScriptureSource for MockScripture {
    async fn fetch_chapter(
        &self,
        book: &Book,
        chapter: u32,
        translation: Option<&str>,
    ) -> Result<Vec<Verse>> {
        let route = (
            book.api_name.to_string(),
            chapter,
            translation.map(str::to_string),
        );
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(route.clone());
        }

        self.chapters
            .get(&route)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("404 Not Found for {} {}", book.api_name, chapter))
    }
}

pub fn verses(count: u32, prefix: &str) -> Vec<Verse> {
    (1..=count)
        .map(|n| Verse::new(n, format!("{prefix} {n}")))
        .collect()
}

type Responder = Box<dyn Fn(&GenerationRequest) -> Result<String> + Send + Sync>;

/// Answers every prompt through a closure and records what it was asked.
pub struct MockModel {
    responder: Responder,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockModel {
    pub fn new(responder: impl Fn(&GenerationRequest) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    pub fn failing() -> Self {
        Self::new(|_| Err(anyhow::anyhow!("generative service unreachable")))
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests().len()
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let reply = (self.responder)(&request);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        reply
    }
}

/// Speaks instantly unless a gate is supplied, in which case every call
/// waits for the gate to open.
#[derive(Default)]
pub struct MockNarrator {
    spoken: Mutex<Vec<(String, VoiceGender)>>,
    hold: Option<tokio::sync::Semaphore>,
}

impl MockNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held() -> Self {
        Self {
            spoken: Mutex::new(Vec::new()),
            hold: Some(tokio::sync::Semaphore::new(0)),
        }
    }

    pub fn release(&self) {
        if let Some(hold) = &self.hold {
            hold.add_permits(1);
        }
    }

    pub fn spoken(&self) -> Vec<(String, VoiceGender)> {
        self.spoken.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NarrationService for MockNarrator {
    async fn speak(&self, text: &str, voice: VoiceGender) -> Result<SpeechClip> {
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push((text.to_string(), voice));
        }
        if let Some(hold) = &self.hold {
            hold.acquire().await?.forget();
        }
        Ok(SpeechClip {
            pcm: vec![0, 1, 2, 3],
            sample_rate: 24_000,
        })
    }
}
