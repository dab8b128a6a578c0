use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::Verse;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChapterKey {
    pub book: String,
    pub chapter: u32,
}

impl ChapterKey {
    pub fn new(book: impl Into<String>, chapter: u32) -> Self {
        Self {
            book: book.into(),
            chapter,
        }
    }
}

/// Chapters fetched during this process, shared by the foreground loader and
/// its prefetch tasks. Unbounded; the corpus is finite. Writes are
/// last-writer-wins.
#[derive(Clone, Default)]
pub struct ChapterCache {
    entries: Arc<RwLock<HashMap<ChapterKey, Arc<[Verse]>>>>,
}

impl ChapterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &ChapterKey) -> Option<Arc<[Verse]>> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn contains(&self, key: &ChapterKey) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn insert(&self, key: ChapterKey, verses: Vec<Verse>) -> Arc<[Verse]> {
        let verses: Arc<[Verse]> = verses.into();
        self.entries.write().await.insert(key, verses.clone());
        verses
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
