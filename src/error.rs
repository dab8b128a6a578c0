/// Failures a view can report to its caller.
///
/// Degradations that never reach the user (prefetch, translation, search
/// parsing) are logged where they happen and do not appear here.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Both the localized and the untranslated scripture fetch failed.
    #[error("connection failed")]
    ConnectionFailed,

    #[error("{book} has no chapter {chapter}")]
    InvalidChapter { book: String, chapter: u32 },

    #[error("unknown book: {0}")]
    UnknownBook(String),

    #[error("search theme is empty")]
    EmptyQuery,

    /// The generative service answered with something unusable, or not at all.
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),
}
