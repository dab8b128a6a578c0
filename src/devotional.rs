use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate};
use serde_json::json;

use crate::error::AppError;
use crate::gemini::{parse_json_reply, GenerationRequest, GenerativeModel};
use crate::models::{DevotionalRecord, DevotionalSnapshot, OperationState};

fn devotional_prompt(target_language: &str) -> String {
    format!(
        "Write a short devotional for today in {target_language}, including an inspiring \
         title, a key Bible verse, a reflection and a brief prayer."
    )
}

#[derive(Clone)]
pub struct DevotionalGenerator {
    model: Arc<dyn GenerativeModel>,
    model_name: String,
    target_language: String,
}

impl DevotionalGenerator {
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

    pub async fn generate(&self) -> Result<DevotionalRecord, AppError> {
        let request = GenerationRequest::new(&self.model_name, devotional_prompt(&self.target_language))
            .with_schema(devotional_schema());

        let reply = self
            .model
            .generate(request)
            .await
            .map_err(|err| AppError::Generation(format!("{err:#}")))?;

        let record: DevotionalRecord =
            parse_json_reply(&reply).map_err(|err| AppError::Generation(format!("{err:#}")))?;
        validate(&record)?;
        Ok(record)
    }
}

fn devotional_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "verse": { "type": "string" },
            "message": { "type": "string" },
            "prayer": { "type": "string" }
        },
        "required": ["title", "verse", "message", "prayer"]
    })
}

fn validate(record: &DevotionalRecord) -> Result<(), AppError> {
    let fields = [
        ("title", &record.title),
        ("verse", &record.verse_text),
        ("message", &record.reflection),
        ("prayer", &record.prayer),
    ];
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(AppError::Generation(format!("devotional field {name} is blank")));
        }
    }
    Ok(())
}

/// Spoken form of a devotional, read top to bottom.
pub fn narration_script(record: &DevotionalRecord) -> String {
    format!(
        "{}. Today's verse is: {}. Reflection: {}. And we close with a prayer: {}",
        record.title, record.verse_text, record.reflection, record.prayer
    )
}

#[derive(Default)]
struct ViewState {
    state: OperationState,
    current: Option<(NaiveDate, DevotionalRecord)>,
}

/// The devotional view: the last good record plus the state of the latest
/// attempt. A failed regeneration leaves the previous record in place.
///
/// Generations are serialized: at most one model call is in flight per view.
#[derive(Clone)]
pub struct DevotionalView {
    generator: DevotionalGenerator,
    inner: Arc<Mutex<ViewState>>,
    generation: Arc<tokio::sync::Mutex<()>>,
}

impl DevotionalView {
    pub fn new(generator: DevotionalGenerator) -> Self {
        Self {
            generator,
            inner: Arc::new(Mutex::new(ViewState::default())),
            generation: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn snapshot(&self) -> DevotionalSnapshot {
        match self.inner.lock() {
            Ok(inner) => DevotionalSnapshot {
                state: inner.state,
                generated_on: inner.current.as_ref().map(|(date, _)| *date),
                devotional: inner.current.as_ref().map(|(_, record)| record.clone()),
            },
            Err(_) => DevotionalSnapshot {
                state: OperationState::Failed,
                generated_on: None,
                devotional: None,
            },
        }
    }

    pub fn current(&self) -> Option<DevotionalRecord> {
        self.snapshot().devotional
    }

    /// Produces today's devotional unless one already exists for today.
    /// Concurrent callers wait for the generation already under way.
    pub async fn ensure_today(&self) -> DevotionalSnapshot {
        let _generation = self.generation.lock().await;
        if !self.is_fresh(Local::now().date_naive()) {
            let _ = self.generate_and_store().await;
        }
        self.snapshot()
    }

    pub async fn regenerate(&self) -> Result<DevotionalRecord, AppError> {
        let _generation = self.generation.lock().await;
        self.generate_and_store().await
    }

    fn is_fresh(&self, today: NaiveDate) -> bool {
        self.inner
            .lock()
            .map(|inner| matches!(&inner.current, Some((date, _)) if *date == today))
            .unwrap_or(false)
    }

    async fn generate_and_store(&self) -> Result<DevotionalRecord, AppError> {
        self.set_state(OperationState::InFlight);

        match self.generator.generate().await {
            Ok(record) => {
                if let Ok(mut inner) = self.inner.lock() {
                    inner.current = Some((Local::now().date_naive(), record.clone()));
                    inner.state = OperationState::Succeeded;
                }
                Ok(record)
            }
            Err(err) => {
                tracing::error!("devotional generation failed: {err}");
                self.set_state(OperationState::Failed);
                Err(err)
            }
        }
    }

    fn set_state(&self, state: OperationState) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.state = state;
        }
    }
}
