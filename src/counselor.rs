use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::gemini::{sanitize_model_output, GenerationRequest, GenerativeModel};
use crate::models::{ChatMessage, OperationState};
use crate::narration::NarrationGate;

fn persona(target_language: &str) -> String {
    format!(
        "You are a Bible mentor and theologian who answers in {target_language}. \
         Always answer with wisdom, quoting verses and giving historical context. \
         If the user provides a specific verse, analyse it in depth."
    )
}

pub const REFLECTION_PROBLEM_MESSAGE: &str = "Sorry, I had trouble reflecting on that.";
pub const CONNECTION_ERROR_MESSAGE: &str =
    "Connection error with the mentor. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The exchange completed; the assistant entry holds a reply or a fallback.
    Completed,
    /// Blank input, or another send was still in flight. Nothing changed.
    Ignored,
}

/// One counselor conversation. The transcript only grows until `reset`.
pub struct ConversationSession {
    model: Arc<dyn GenerativeModel>,
    model_name: String,
    target_language: String,
    messages: Mutex<Vec<ChatMessage>>,
    in_flight: AtomicBool,
    state: Mutex<OperationState>,
    narration: NarrationGate,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ConversationSession {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        model_name: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            target_language: target_language.into(),
            messages: Mutex::new(Vec::new()),
            in_flight: AtomicBool::new(false),
            state: Mutex::new(OperationState::Idle),
            narration: NarrationGate::new(),
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    pub fn state(&self) -> OperationState {
        self.state.lock().map(|state| *state).unwrap_or_default()
    }

    /// This conversation's own narration slot, keyed by message index.
    pub fn narration(&self) -> &NarrationGate {
        &self.narration
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.clear();
        }
        self.set_state(OperationState::Idle);
    }

    pub async fn send(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("counselor send ignored: a reply is still pending");
            return SendOutcome::Ignored;
        }
        let _guard = InFlight(&self.in_flight);

        self.push(ChatMessage::user(text));
        self.set_state(OperationState::InFlight);

        let request =
            GenerationRequest::new(&self.model_name, text).with_system(persona(&self.target_language));
        let (reply, state) = match self.model.generate(request).await {
            Ok(reply) => {
                let reply = sanitize_model_output(&reply);
                if reply.is_empty() {
                    (REFLECTION_PROBLEM_MESSAGE.to_string(), OperationState::Succeeded)
                } else {
                    (reply, OperationState::Succeeded)
                }
            }
            Err(err) => {
                tracing::error!("counselor request failed: {err:#}");
                (CONNECTION_ERROR_MESSAGE.to_string(), OperationState::Failed)
            }
        };

        self.push(ChatMessage::assistant(reply));
        self.set_state(state);
        SendOutcome::Completed
    }

    /// Hands a verse from the reading view to the counselor.
    pub async fn ask_about_verse(&self, reference: &str) -> SendOutcome {
        let reference = reference.trim();
        if reference.is_empty() {
            return SendOutcome::Ignored;
        }
        self.send(&format!(
            "Explain the context and theological meaning of this verse: {reference}"
        ))
        .await
    }

    fn push(&self, message: ChatMessage) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }
    }

    fn set_state(&self, state: OperationState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }
}
