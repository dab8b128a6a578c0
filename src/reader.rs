use std::sync::Arc;

use crate::books::{Book, BookCatalog};
use crate::cache::{ChapterCache, ChapterKey};
use crate::error::AppError;
use crate::models::Verse;
use crate::scripture::ScriptureSource;
use crate::translation::TranslationFallback;

/// Read-through chapter loader behind the reading view.
///
/// A successful load (cached or fetched) spawns a prefetch of the chapter
/// that follows it in canon order, so paging forward is usually a cache hit.
#[derive(Clone)]
pub struct ChapterLoader {
    catalog: BookCatalog,
    source: Arc<dyn ScriptureSource>,
    translator: TranslationFallback,
    cache: ChapterCache,
    translation: String,
}

impl ChapterLoader {
    pub fn new(
        catalog: BookCatalog,
        source: Arc<dyn ScriptureSource>,
        translator: TranslationFallback,
        translation: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            source,
            translator,
            cache: ChapterCache::new(),
            translation: translation.into(),
        }
    }

    pub fn catalog(&self) -> &BookCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &ChapterCache {
        &self.cache
    }

    pub async fn load(&self, book: &Book, chapter: u32) -> Result<Arc<[Verse]>, AppError> {
        let index = self
            .catalog
            .index_of(book.name)
            .ok_or_else(|| AppError::UnknownBook(book.name.to_string()))?;
        if chapter == 0 || chapter > book.chapters {
            return Err(AppError::InvalidChapter {
                book: book.name.to_string(),
                chapter,
            });
        }

        let key = ChapterKey::new(book.name, chapter);
        if let Some(verses) = self.cache.get(&key).await {
            tracing::debug!("chapter cache hit for {} {}", book.name, chapter);
            self.spawn_prefetch(index, chapter);
            return Ok(verses);
        }

        let verses = self.fetch_with_fallback(book, chapter).await?;
        let verses = self.cache.insert(key, verses).await;
        self.spawn_prefetch(index, chapter);
        Ok(verses)
    }

    fn spawn_prefetch(&self, index: usize, chapter: u32) {
        let loader = self.clone();
        tokio::spawn(async move {
            loader.prefetch_after(index, chapter).await;
        });
    }

    /// Warms the cache with the chapter after `(index, chapter)`. Does nothing
    /// at the end of the canon or when that chapter is already cached;
    /// failures are only logged.
    pub async fn prefetch_after(&self, index: usize, chapter: u32) {
        let Some((next_index, next_chapter)) = self.catalog.next_chapter(index, chapter) else {
            return;
        };
        let Some(next_book) = self.catalog.get(next_index) else {
            return;
        };

        let key = ChapterKey::new(next_book.name, next_chapter);
        if self.cache.contains(&key).await {
            return;
        }

        match self.fetch_with_fallback(next_book, next_chapter).await {
            Ok(verses) => {
                self.cache.insert(key, verses).await;
                tracing::debug!("prefetched {} {}", next_book.name, next_chapter);
            }
            Err(err) => {
                tracing::debug!(
                    "prefetch of {} {} failed: {}",
                    next_book.name,
                    next_chapter,
                    err
                );
            }
        }
    }

    async fn fetch_with_fallback(&self, book: &Book, chapter: u32) -> Result<Vec<Verse>, AppError> {
        let primary_err = match self
            .source
            .fetch_chapter(book, chapter, Some(&self.translation))
            .await
        {
            Ok(verses) => return Ok(verses),
            Err(err) => err,
        };

        tracing::info!(
            "{} {} unavailable in {}, falling back to untranslated text: {:#}",
            book.name,
            chapter,
            self.translation,
            primary_err
        );

        match self.source.fetch_chapter(book, chapter, None).await {
            Ok(raw) => Ok(self.translator.translate(raw).await),
            Err(err) => {
                tracing::warn!(
                    "failed to load {} {} from any endpoint: {:#}",
                    book.name,
                    chapter,
                    err
                );
                Err(AppError::ConnectionFailed)
            }
        }
    }
}
