use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::books::BookCatalog;
use crate::config::AppConfig;
use crate::counselor::ConversationSession;
use crate::devotional::{narration_script, DevotionalGenerator, DevotionalView};
use crate::error::AppError;
use crate::gemini::GenerativeModel;
use crate::home;
use crate::models::{
    BookSummary, ChapterResponse, DevotionalSnapshot, HomeResponse, NarrateRequest,
    NavigationTarget, SearchRequest, SearchResponse, SendMessageRequest, SessionResponse,
    TranscriptResponse, VerseContextRequest, View, VoiceGender, VoiceSetting,
};
use crate::narration::{NarrationGate, NarrationService};
use crate::reader::ChapterLoader;
use crate::scripture::ScriptureSource;
use crate::search::ThematicSearch;
use crate::translation::TranslationFallback;

#[derive(Clone)]
pub struct AppState {
    loader: ChapterLoader,
    search: ThematicSearch,
    devotional: DevotionalView,
    model: Arc<dyn GenerativeModel>,
    chat_model: String,
    target_language: String,
    narrator: Arc<dyn NarrationService>,
    narration: NarrationGate,
    sessions: Arc<Mutex<HashMap<String, Arc<ConversationSession>>>>,
    voice: Arc<RwLock<VoiceGender>>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        scripture: Arc<dyn ScriptureSource>,
        model: Arc<dyn GenerativeModel>,
        narrator: Arc<dyn NarrationService>,
    ) -> Self {
        let catalog = BookCatalog::default();
        let translator = TranslationFallback::new(
            model.clone(),
            config.models.fast_model.clone(),
            config.target_language.clone(),
        );

        Self {
            loader: ChapterLoader::new(catalog, scripture, translator, config.translation.clone()),
            search: ThematicSearch::new(
                model.clone(),
                config.models.fast_model.clone(),
                config.target_language.clone(),
                catalog,
            ),
            devotional: DevotionalView::new(DevotionalGenerator::new(
                model.clone(),
                config.models.fast_model.clone(),
                config.target_language.clone(),
            )),
            model,
            chat_model: config.models.chat_model.clone(),
            target_language: config.target_language.clone(),
            narrator,
            narration: NarrationGate::new(),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            voice: Arc::new(RwLock::new(VoiceGender::default())),
        }
    }

    fn catalog(&self) -> &BookCatalog {
        self.loader.catalog()
    }

    fn session(&self, session_id: &str) -> Result<Arc<ConversationSession>, ApiError> {
        self.sessions
            .lock()
            .map_err(|_| ApiError::from(anyhow::anyhow!("lock poisoned")))?
            .get(session_id)
            .cloned()
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()).into())
    }

    fn transcript(&self, session_id: String, session: &ConversationSession) -> TranscriptResponse {
        TranscriptResponse {
            session_id,
            state: session.state(),
            messages: session.messages(),
            narrating: session.narration().active_slot(View::Counselor),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/books", get(list_books))
        .route("/api/books/:book/chapters/:chapter", get(get_chapter))
        .route("/api/navigate/:book/:chapter", get(navigate))
        .route("/api/search", post(search_theme))
        .route("/api/counselor/sessions", post(create_session))
        .route(
            "/api/counselor/sessions/:session_id",
            get(get_session).delete(delete_session),
        )
        .route("/api/counselor/sessions/:session_id/messages", post(send_message))
        .route("/api/counselor/sessions/:session_id/verse", post(ask_about_verse))
        .route("/api/counselor/sessions/:session_id/reset", post(reset_session))
        .route("/api/devotional", get(get_devotional))
        .route("/api/devotional/regenerate", post(regenerate_devotional))
        .route("/api/home", get(home_view))
        .route("/api/settings/voice", get(get_voice).put(set_voice))
        .route("/api/narrate", post(narrate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: AppConfig, state: AppState) -> Result<()> {
    let app = router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn list_books(State(state): State<AppState>) -> Json<Vec<BookSummary>> {
    Json(state.catalog().summaries())
}

async fn get_chapter(
    State(state): State<AppState>,
    Path((book, chapter)): Path<(String, u32)>,
) -> Result<Json<ChapterResponse>, ApiError> {
    let (_, book) = state
        .catalog()
        .find(&book)
        .ok_or(AppError::UnknownBook(book))?;

    let verses = state.loader.load(book, chapter).await?;
    Ok(Json(ChapterResponse {
        book: book.name,
        chapter,
        verses: verses.to_vec(),
    }))
}

async fn navigate(
    State(state): State<AppState>,
    Path((book, chapter)): Path<(String, u32)>,
) -> Result<Json<NavigationTarget>, ApiError> {
    let (_, found) = state
        .catalog()
        .find(&book)
        .ok_or(AppError::UnknownBook(book))?;

    if chapter == 0 || chapter > found.chapters {
        return Err(AppError::InvalidChapter {
            book: found.name.to_string(),
            chapter,
        }
        .into());
    }

    Ok(Json(NavigationTarget {
        book: found.name,
        chapter,
    }))
}

async fn search_theme(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let entries = state.search.search(&request.theme).await?;
    Ok(Json(SearchResponse {
        results: state.search.annotate(entries),
        theme: request.theme,
    }))
}

async fn create_session(State(state): State<AppState>) -> Result<Json<SessionResponse>, ApiError> {
    let session_id = Uuid::new_v4().to_string();
    let session = Arc::new(ConversationSession::new(
        state.model.clone(),
        state.chat_model.clone(),
        state.target_language.clone(),
    ));

    state
        .sessions
        .lock()
        .map_err(|_| ApiError::from(anyhow::anyhow!("lock poisoned")))?
        .insert(session_id.clone(), session);

    Ok(Json(SessionResponse { session_id }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let session = state.session(&session_id)?;
    Ok(Json(state.transcript(session_id, &session)))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let removed = state
        .sessions
        .lock()
        .map_err(|_| ApiError::from(anyhow::anyhow!("lock poisoned")))?
        .remove(&session_id);

    match removed {
        Some(_) => {
            tracing::debug!("counselor session {session_id} closed");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(AppError::SessionNotFound(session_id).into()),
    }
}

async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let session = state.session(&session_id)?;
    session.send(&request.message).await;
    Ok(Json(state.transcript(session_id, &session)))
}

async fn ask_about_verse(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<VerseContextRequest>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let session = state.session(&session_id)?;
    session.ask_about_verse(&request.reference).await;
    Ok(Json(state.transcript(session_id, &session)))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let session = state.session(&session_id)?;
    session.reset();
    Ok(Json(state.transcript(session_id, &session)))
}

async fn get_devotional(State(state): State<AppState>) -> Json<DevotionalSnapshot> {
    Json(state.devotional.ensure_today().await)
}

async fn regenerate_devotional(
    State(state): State<AppState>,
) -> Result<Json<DevotionalSnapshot>, ApiError> {
    state.devotional.regenerate().await?;
    Ok(Json(state.devotional.snapshot()))
}

async fn home_view(State(state): State<AppState>) -> Json<HomeResponse> {
    Json(HomeResponse {
        verse_of_the_day: home::VERSE_OF_THE_DAY,
        verse_reference: home::VERSE_OF_THE_DAY_REFERENCE,
        quick_links: home::quick_links(state.catalog()),
        narrating: state.narration.is_busy(View::Home),
    })
}

async fn get_voice(State(state): State<AppState>) -> Json<VoiceSetting> {
    Json(VoiceSetting {
        voice: *state.voice.read().await,
    })
}

async fn set_voice(
    State(state): State<AppState>,
    Json(request): Json<VoiceSetting>,
) -> Json<VoiceSetting> {
    *state.voice.write().await = request.voice;
    tracing::info!("narration voice set to {:?}", request.voice);
    Json(request)
}

async fn narrate(
    State(state): State<AppState>,
    Json(request): Json<NarrateRequest>,
) -> Result<Response, ApiError> {
    let supplied = request
        .text
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string);

    let text = match (request.view, supplied) {
        (_, Some(text)) => text,
        (View::Home, None) => home::verse_of_the_day_script(),
        (View::Devotional, None) => state
            .devotional
            .current()
            .map(|record| narration_script(&record))
            .ok_or_else(|| ApiError::bad_request("no devotional to narrate yet".to_string()))?,
        (View::Reader | View::Counselor, None) => {
            return Err(ApiError::bad_request("text is required".to_string()));
        }
    };

    let gate = match request.view {
        View::Counselor => {
            let session_id = request.session_id.as_deref().ok_or_else(|| {
                ApiError::bad_request("session_id is required for counselor narration".to_string())
            })?;
            state.session(session_id)?.narration().clone()
        }
        View::Home | View::Reader | View::Devotional => state.narration.clone(),
    };

    let voice = match request.voice {
        Some(voice) => voice,
        None => *state.voice.read().await,
    };

    let clip = gate
        .narrate(state.narrator.as_ref(), request.view, request.slot, &text, voice)
        .await
        .map_err(ApiError::upstream)?;

    Ok(match clip {
        Some(clip) => ([(header::CONTENT_TYPE, clip.content_type())], clip.pcm).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }

    fn upstream(err: anyhow::Error) -> Self {
        tracing::error!("upstream call failed: {err:#}");
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: value.to_string(),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        let status = match &value {
            AppError::ConnectionFailed | AppError::Generation(_) => StatusCode::BAD_GATEWAY,
            AppError::InvalidChapter { .. } | AppError::EmptyQuery => StatusCode::BAD_REQUEST,
            AppError::UnknownBook(_) | AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        };
        Self {
            status,
            message: value.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{verses, MockModel, MockNarrator, MockScripture};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn state_with(
        scripture: MockScripture,
        model: MockModel,
        narrator: Arc<MockNarrator>,
    ) -> AppState {
        let config = AppConfig::from_env();
        AppState::new(&config, Arc::new(scripture), Arc::new(model), narrator)
    }

    fn app(scripture: MockScripture, model: MockModel) -> Router {
        router(state_with(scripture, model, Arc::new(MockNarrator::new())))
    }

    fn session_count(state: &AppState) -> usize {
        state.sessions.lock().unwrap().len()
    }

    async fn open_session(app: &Router) -> String {
        let (status, body) = call(app, "POST", "/api/counselor/sessions", None).await;
        assert_eq!(status, StatusCode::OK);
        json_body(&body)["session_id"].as_str().unwrap().to_string()
    }

    async fn narrating(app: &Router, session_id: &str) -> Value {
        let uri = format!("/api/counselor/sessions/{session_id}");
        let (_, body) = call(app, "GET", &uri, None).await;
        json_body(&body)["narrating"].clone()
    }

    async fn wait_until_narrating(app: &Router, session_id: &str, slot: usize) -> bool {
        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while narrating(app, session_id).await != json!(slot) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .is_ok()
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn lists_the_canon() {
        let app = app(MockScripture::new(), MockModel::failing());
        let (status, body) = call(&app, "GET", "/api/books", None).await;
        assert_eq!(status, StatusCode::OK);
        let books = json_body(&body);
        assert_eq!(books.as_array().map(Vec::len), Some(66));
        assert_eq!(books[0]["name"], "Gênesis");
    }

    #[tokio::test]
    async fn chapter_route_serves_fallback_verses() {
        let app = app(
            MockScripture::new().with_chapter("John", 3, None, verses(20, "For God")),
            MockModel::failing(),
        );
        let (status, body) = call(&app, "GET", "/api/books/John/chapters/3", None).await;
        assert_eq!(status, StatusCode::OK);
        let chapter = json_body(&body);
        assert_eq!(chapter["book"], "João");
        assert_eq!(chapter["verses"].as_array().map(Vec::len), Some(20));
        assert_eq!(chapter["verses"][0]["verse"], 1);
    }

    #[tokio::test]
    async fn chapter_route_reports_connection_failure() {
        let app = app(MockScripture::new(), MockModel::failing());
        let (status, body) = call(&app, "GET", "/api/books/John/chapters/3", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(&body)["error"], "connection failed");
    }

    #[tokio::test]
    async fn unknown_book_is_not_found() {
        let app = app(MockScripture::new(), MockModel::failing());
        let (status, _) = call(&app, "GET", "/api/books/Enoch/chapters/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "GET", "/api/navigate/Enoch/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = call(&app, "GET", "/api/navigate/romans/8", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["book"], "Romanos");
    }

    #[tokio::test]
    async fn blank_search_is_bad_request() {
        let app = app(MockScripture::new(), MockModel::failing());
        let (status, _) = call(&app, "POST", "/api/search", Some(json!({ "theme": " " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn search_returns_annotated_hits() {
        let reply = r#"{"results": [
            {"book": "Efésios", "chapter": 4, "verse": 32, "text": "Sede bondosos"},
            {"book": "Enoque", "chapter": 1, "verse": 9, "text": "?"},
            {"book": "Mateus", "chapter": 6, "verse": 14, "text": "Porque, se perdoardes"}
        ]}"#;
        let app = app(MockScripture::new(), MockModel::replying(reply));
        let (status, body) =
            call(&app, "POST", "/api/search", Some(json!({ "theme": "forgiveness" }))).await;
        assert_eq!(status, StatusCode::OK);
        let results = json_body(&body)["results"].clone();
        assert_eq!(results.as_array().map(Vec::len), Some(3));
        assert_eq!(results[0]["book"], "Efésios");
        assert_eq!(results[1]["navigable"], false);
    }

    #[tokio::test]
    async fn counselor_session_round_trip() {
        let app = app(MockScripture::new(), MockModel::replying("Paz seja convosco."));
        let (status, body) = call(&app, "POST", "/api/counselor/sessions", None).await;
        assert_eq!(status, StatusCode::OK);
        let session_id = json_body(&body)["session_id"].as_str().unwrap().to_string();

        let uri = format!("/api/counselor/sessions/{session_id}/messages");
        let (status, body) = call(&app, "POST", &uri, Some(json!({ "message": "Olá" }))).await;
        assert_eq!(status, StatusCode::OK);
        let transcript = json_body(&body);
        assert_eq!(transcript["messages"].as_array().map(Vec::len), Some(2));
        assert_eq!(transcript["messages"][1]["role"], "assistant");

        let uri = format!("/api/counselor/sessions/{session_id}/reset");
        let (_, body) = call(&app, "POST", &uri, None).await;
        assert_eq!(json_body(&body)["messages"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let app = app(MockScripture::new(), MockModel::failing());
        let (status, _) = call(&app, "GET", "/api/counselor/sessions/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_devotional_regeneration_is_bad_gateway() {
        let app = app(MockScripture::new(), MockModel::replying("not json"));
        let (status, _) = call(&app, "POST", "/api/devotional/regenerate", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, body) = call(&app, "GET", "/api/devotional", None).await;
        assert_eq!(status, StatusCode::OK);
        let snapshot = json_body(&body);
        assert_eq!(snapshot["state"], "failed");
        assert!(snapshot["devotional"].is_null());
    }

    #[tokio::test]
    async fn home_narration_returns_audio() {
        let app = app(MockScripture::new(), MockModel::failing());
        let request = Request::builder()
            .method("POST")
            .uri("/api/narrate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "view": "home" }).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "audio/L16;rate=24000;channels=1"
        );
    }

    #[tokio::test]
    async fn reader_narration_requires_text() {
        let app = app(MockScripture::new(), MockModel::failing());
        let (status, _) = call(&app, "POST", "/api/narrate", Some(json!({ "view": "reader", "slot": 1 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn counselor_narration_requires_a_live_session() {
        let app = app(MockScripture::new(), MockModel::failing());
        let body = json!({ "view": "counselor", "slot": 0, "text": "Amém" });
        let (status, _) = call(&app, "POST", "/api/narrate", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let body = json!({ "view": "counselor", "session_id": "gone", "slot": 0, "text": "Amém" });
        let (status, _) = call(&app, "POST", "/api/narrate", Some(body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn counselor_narration_is_scoped_to_its_session() {
        let narrator = Arc::new(MockNarrator::held());
        let app = router(state_with(
            MockScripture::new(),
            MockModel::failing(),
            narrator.clone(),
        ));
        let first = open_session(&app).await;
        let second = open_session(&app).await;

        let speak = |session_id: &str, slot: usize| {
            let app = app.clone();
            let body = json!({
                "view": "counselor",
                "session_id": session_id,
                "slot": slot,
                "text": "Graça e paz",
            });
            tokio::spawn(async move { call(&app, "POST", "/api/narrate", Some(body)).await.0 })
        };

        let first_clip = speak(&first, 1);
        assert!(wait_until_narrating(&app, &first, 1).await);
        assert!(narrating(&app, &second).await.is_null());

        let second_clip = speak(&second, 0);
        assert!(wait_until_narrating(&app, &second, 0).await);
        assert_eq!(narrating(&app, &first).await, json!(1));

        narrator.release();
        narrator.release();
        assert_eq!(first_clip.await.unwrap(), StatusCode::OK);
        assert_eq!(second_clip.await.unwrap(), StatusCode::OK);
        assert!(narrating(&app, &first).await.is_null());
        assert_eq!(narrator.spoken().len(), 2);
    }

    #[tokio::test]
    async fn deleting_a_session_drops_it() {
        let state = state_with(
            MockScripture::new(),
            MockModel::failing(),
            Arc::new(MockNarrator::new()),
        );
        let app = router(state.clone());
        let first = open_session(&app).await;
        let second = open_session(&app).await;
        assert_eq!(session_count(&state), 2);

        let uri = format!("/api/counselor/sessions/{first}");
        let (status, _) = call(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(session_count(&state), 1);

        let (status, _) = call(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "GET", &format!("/api/counselor/sessions/{second}"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn voice_preference_round_trip() {
        let app = app(MockScripture::new(), MockModel::failing());
        let (_, body) = call(&app, "GET", "/api/settings/voice", None).await;
        assert_eq!(json_body(&body)["voice"], "female");
        let (status, _) =
            call(&app, "PUT", "/api/settings/voice", Some(json!({ "voice": "male" }))).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = call(&app, "GET", "/api/settings/voice", None).await;
        assert_eq!(json_body(&body)["voice"], "male");
    }
}
