use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::books::Book;
use crate::models::Verse;

/// Remote source of chapter text.
#[async_trait]
pub trait ScriptureSource: Send + Sync {
    /// Fetches one chapter. `translation` of `None` asks for the service's
    /// default (untranslated) text.
    async fn fetch_chapter(
        &self,
        book: &Book,
        chapter: u32,
        translation: Option<&str>,
    ) -> Result<Vec<Verse>>;
}

/// Client for the `bible-api.com` style endpoint:
/// `GET {base}/{book}+{chapter}?translation={id}`.
#[derive(Clone)]
pub struct BibleApiClient {
    client: Client,
    base_url: String,
}

impl BibleApiClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn chapter_url(&self, book: &Book, chapter: u32, translation: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid scripture base url: {}", self.base_url))?;

        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("scripture base url cannot carry a path"))?
            .pop_if_empty()
            .push(&format!("{}+{chapter}", book.api_name));

        if let Some(translation) = translation {
            url.query_pairs_mut().append_pair("translation", translation);
        }

        Ok(url)
    }
}

#[derive(Deserialize)]
struct ChapterResp {
    verses: Vec<RawVerse>,
}

#[derive(Deserialize)]
struct RawVerse {
    verse: u32,
    text: String,
}

#[async_trait]
impl ScriptureSource for BibleApiClient {
    async fn fetch_chapter(
        &self,
        book: &Book,
        chapter: u32,
        translation: Option<&str>,
    ) -> Result<Vec<Verse>> {
        let url = self.chapter_url(book, chapter, translation)?;
        tracing::debug!("fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("failed to call scripture endpoint")?
            .error_for_status()
            .context("scripture endpoint returned non-success status")?
            .json::<ChapterResp>()
            .await
            .context("failed to decode scripture response")?;

        Ok(response
            .verses
            .into_iter()
            .map(|raw| Verse::new(raw.verse, raw.text.trim()))
            .collect())
    }
}
