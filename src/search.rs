use std::sync::Arc;

use serde::Deserialize;

use crate::books::BookCatalog;
use crate::error::AppError;
use crate::gemini::{parse_json_reply, GenerationRequest, GenerativeModel};
use crate::models::{SearchHit, SearchResultEntry};

pub const MAX_RESULTS: usize = 10;

/// Shapes the model is known to answer with.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchPayload {
    Bare(Vec<SearchResultEntry>),
    Wrapped {
        #[serde(alias = "verses")]
        results: Vec<SearchResultEntry>,
    },
}

impl SearchPayload {
    fn into_entries(self) -> Vec<SearchResultEntry> {
        match self {
            SearchPayload::Bare(entries) => entries,
            SearchPayload::Wrapped { results } => results,
        }
    }
}

/// Finds verses about a theme through the generative service.
#[derive(Clone)]
pub struct ThematicSearch {
    model: Arc<dyn GenerativeModel>,
    model_name: String,
    target_language: String,
    catalog: BookCatalog,
}

impl ThematicSearch {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        model_name: impl Into<String>,
        target_language: impl Into<String>,
        catalog: BookCatalog,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            target_language: target_language.into(),
            catalog,
        }
    }

    /// Up to ten entries in the model's order. Unreadable replies yield an
    /// empty list; only a blank theme is an error.
    pub async fn search(&self, theme: &str) -> Result<Vec<SearchResultEntry>, AppError> {
        let theme = theme.trim();
        if theme.is_empty() {
            return Err(AppError::EmptyQuery);
        }

        let prompt = format!(
            "Find {MAX_RESULTS} Bible verses related to the theme: \"{theme}\".\n\
             RULES: return ONLY JSON, an array of objects with the fields \
             book, chapter, verse and text. Use book names from this list: {}. \
             Text in {}.",
            self.catalog.names().join(", "),
            self.target_language
        );

        let reply = match self
            .model
            .generate(GenerationRequest::new(&self.model_name, prompt).with_json_output())
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!("thematic search for {theme:?} failed: {err:#}");
                return Ok(Vec::new());
            }
        };

        Ok(normalize_reply(&reply))
    }

    /// Tags each entry with whether its book is one the reader can open.
    pub fn annotate(&self, entries: Vec<SearchResultEntry>) -> Vec<SearchHit> {
        entries
            .into_iter()
            .map(|entry| {
                let navigable = self
                    .catalog
                    .find(&entry.book)
                    .is_some_and(|(_, book)| entry.chapter >= 1 && entry.chapter <= book.chapters);
                SearchHit { entry, navigable }
            })
            .collect()
    }
}

fn normalize_reply(reply: &str) -> Vec<SearchResultEntry> {
    match parse_json_reply::<SearchPayload>(reply) {
        Ok(payload) => {
            let mut entries = payload.into_entries();
            entries.truncate(MAX_RESULTS);
            entries
        }
        Err(err) => {
            tracing::warn!("discarding unreadable search reply: {err:#}");
            Vec::new()
        }
    }
}
