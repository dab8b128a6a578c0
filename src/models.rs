use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    #[serde(rename = "verse")]
    pub number: u32,
    pub text: String,
}

impl Verse {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A generated devotional. The wire names follow the response schema sent to
/// the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevotionalRecord {
    pub title: String,
    #[serde(rename = "verse")]
    pub verse_text: String,
    #[serde(rename = "message")]
    pub reflection: String,
    pub prayer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DevotionalSnapshot {
    pub state: OperationState,
    pub generated_on: Option<NaiveDate>,
    pub devotional: Option<DevotionalRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultEntry {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub entry: SearchResultEntry,
    pub navigable: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VoiceGender {
    #[default]
    Female,
    Male,
}

/// Lifecycle of a view's long-running operation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookSummary {
    pub name: &'static str,
    pub chapters: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterResponse {
    pub book: &'static str,
    pub chapter: u32,
    pub verses: Vec<Verse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub theme: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub theme: String,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerseContextRequest {
    pub reference: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptResponse {
    pub session_id: String,
    pub state: OperationState,
    pub messages: Vec<ChatMessage>,
    pub narrating: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavigationTarget {
    pub book: &'static str,
    pub chapter: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeResponse {
    pub verse_of_the_day: &'static str,
    pub verse_reference: &'static str,
    pub quick_links: Vec<NavigationTarget>,
    pub narrating: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSetting {
    pub voice: VoiceGender,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Home,
    Reader,
    Counselor,
    Devotional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrateRequest {
    pub view: View,
    /// Required for the counselor view: each conversation narrates on its own.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub slot: Option<usize>,
    /// Reader and counselor narrate arbitrary text; home and devotional
    /// narrate their own content when this is absent.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice: Option<VoiceGender>,
}
