use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::gemini::{parse_json_reply, GenerationRequest, GenerativeModel};
use crate::models::Verse;

/// Localizes verses fetched without the preferred translation.
///
/// Never fails: whatever goes wrong, the caller gets verses back with the
/// same count and numbering as it passed in.
#[derive(Clone)]
pub struct TranslationFallback {
    model: Arc<dyn GenerativeModel>,
    model_name: String,
    target_language: String,
}

#[derive(Serialize)]
struct SourceVerse<'a> {
    v: u32,
    t: &'a str,
}

#[derive(Deserialize)]
struct TranslatedVerse {
    #[serde(default)]
    t: Option<String>,
}

impl TranslationFallback {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        model_name: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            target_language: target_language.into(),
        }
    }

    pub async fn translate(&self, verses: Vec<Verse>) -> Vec<Verse> {
        if verses.is_empty() {
            return verses;
        }

        match self.request_translation(&verses).await {
            Ok(translated) if translated.len() == verses.len() => verses
                .into_iter()
                .zip(translated)
                .map(|(verse, translated)| match translated.t {
                    Some(text) if !text.trim().is_empty() => Verse {
                        text: text.trim().to_string(),
                        ..verse
                    },
                    _ => verse,
                })
                .collect(),
            Ok(translated) => {
                tracing::warn!(
                    "translation returned {} entries for {} verses, keeping source text",
                    translated.len(),
                    verses.len()
                );
                verses
            }
            Err(err) => {
                tracing::warn!("translation failed, keeping source text: {err:#}");
                verses
            }
        }
    }

    async fn request_translation(&self, verses: &[Verse]) -> Result<Vec<TranslatedVerse>> {
        let source: Vec<SourceVerse<'_>> = verses
            .iter()
            .map(|verse| SourceVerse {
                v: verse.number,
                t: &verse.text,
            })
            .collect();

        let prompt = format!(
            "Translate the following Bible verses from English into {}, keeping a solemn \
             and faithful style:\n{}\n\
             Return only a JSON array with the same structure and order, one {{\"v\", \"t\"}} \
             object per verse.",
            self.target_language,
            serde_json::to_string(&source)?
        );

        let reply = self
            .model
            .generate(GenerationRequest::new(&self.model_name, prompt).with_json_output())
            .await?;

        parse_json_reply(&reply)
    }
}
