use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Instant;

use chat_core::{
    choose_default, format_response, CandidateFetch, ConversationTurn, Model, ModelClient,
    RevealScheduler, Role,
};
use chrono::{DateTime, Utc};
use providers::gemini::fallback_models;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::persist::{keys, load_field, save_field, Storage};

pub mod chat;
pub mod history;
pub mod input;
pub mod keymap;
pub mod models;

/// Shown as the assistant turn when the request job itself dies.
pub const REQUEST_FAILED_MESSAGE: &str = "Failed to fetch response. Please try again.";

/// Starter prompts offered on the empty screen.
pub const SUGGESTED_PROMPTS: [&str; 4] = [
    "Guide me through a relaxation exercise",
    "Share some positive affirmations",
    "Suggest ways to manage stress",
    "Tell me about mindfulness meditation",
];

/// Names a session field in change notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    DraftInput,
    RecentPrompt,
    PromptHistory,
    Transcript,
    DisplayedResponse,
    ResultVisible,
    Loading,
    SelectedModel,
    Models,
    ModelsLoading,
    ModelsError,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
    Revealing,
    IdleWithResult,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("model '{0}' is not in the candidate list")]
    UnknownModel(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Input,
    Sidebar,
}

#[derive(Clone)]
pub struct ConfirmState {
    pub action: ConfirmAction,
}

#[derive(Clone, Copy)]
pub enum ConfirmAction {
    ClearHistory,
}

/// Results handed back from background jobs.
pub enum BackendEvent {
    Chat {
        generation: u64,
        prompt: String,
        asked_at: DateTime<Utc>,
        response: String,
    },
    Models(CandidateFetch),
}

type Listener = Box<dyn FnMut(Field)>;

/// The session aggregate plus the bits of view state the terminal needs.
pub struct App<C: ModelClient + 'static> {
    client: Arc<C>,
    storage: Box<dyn Storage>,
    system_instruction: String,

    draft_input: String,
    recent_prompt: String,
    prompt_history: Vec<String>,
    transcript: Vec<ConversationTurn>,
    displayed_response: String,
    is_result_visible: bool,
    is_loading: bool,
    selected_model_id: String,
    /// The user's own choice, loaded from storage or picked this run.
    /// Placeholder defaults never count as one.
    stored_model_id: Option<String>,
    models: Vec<Model>,
    models_loading: bool,
    models_error: Option<String>,

    submission: u64,
    reveal: RevealScheduler,
    tx: Sender<BackendEvent>,
    rx: Receiver<BackendEvent>,
    listeners: Vec<Listener>,

    pub input_cursor: usize,
    pub history_index: Option<usize>,
    pub focus: Focus,
    pub sidebar_selected: usize,
    pub show_sidebar: bool,
    pub show_help: bool,
    pub show_transcript: bool,
    pub chat_scroll: u16,
    pub model_picker: Option<models::ModelPickerState>,
    pub confirm: Option<ConfirmState>,
    pub transcript_cache: chat::TranscriptCache,
    pub dirty: bool,
    pub should_quit: bool,
    pub tick: u64,
}

impl<C: ModelClient + 'static> App<C> {
    pub fn new(client: Arc<C>, storage: Box<dyn Storage>, system_instruction: String) -> Self {
        let st: &dyn Storage = &*storage;
        let models = fallback_models();
        let stored_model_id = load_field::<String>(st, keys::SELECTED_MODEL)
            .filter(|id| !id.trim().is_empty());
        let selected_model_id = stored_model_id
            .clone()
            .or_else(|| choose_default(&models).map(str::to_owned))
            .unwrap_or_default();
        let transcript: Vec<ConversationTurn> =
            load_field(st, keys::TRANSCRIPT).unwrap_or_default();
        let prompt_history: Vec<String> =
            load_field(st, keys::PROMPT_HISTORY).unwrap_or_default();
        info!(
            target: "tui",
            "session restored: history={} turns={} model={}",
            prompt_history.len(),
            transcript.len(),
            selected_model_id
        );
        let (tx, rx) = mpsc::channel();
        Self {
            recent_prompt: load_field(st, keys::RECENT_PROMPT).unwrap_or_default(),
            displayed_response: load_field(st, keys::DISPLAYED_RESPONSE).unwrap_or_default(),
            is_result_visible: load_field(st, keys::RESULT_VISIBLE).unwrap_or(false),
            client,
            storage,
            system_instruction,
            draft_input: String::new(),
            prompt_history,
            transcript,
            is_loading: false,
            selected_model_id,
            stored_model_id,
            models,
            models_loading: false,
            models_error: None,
            submission: 0,
            reveal: RevealScheduler::default(),
            tx,
            rx,
            listeners: Vec::new(),
            input_cursor: 0,
            history_index: None,
            focus: Focus::Input,
            sidebar_selected: 0,
            show_sidebar: true,
            show_help: false,
            show_transcript: false,
            chat_scroll: 0,
            model_picker: None,
            confirm: None,
            transcript_cache: chat::TranscriptCache::default(),
            dirty: true,
            should_quit: false,
            tick: 0,
        }
    }

    pub fn draft_input(&self) -> &str {
        &self.draft_input
    }
    pub fn recent_prompt(&self) -> &str {
        &self.recent_prompt
    }
    pub fn prompt_history(&self) -> &[String] {
        &self.prompt_history
    }
    pub fn transcript(&self) -> &[ConversationTurn] {
        &self.transcript
    }
    pub fn displayed_response(&self) -> &str {
        &self.displayed_response
    }
    pub fn is_result_visible(&self) -> bool {
        self.is_result_visible
    }
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }
    pub fn selected_model_id(&self) -> &str {
        &self.selected_model_id
    }
    pub fn models(&self) -> &[Model] {
        &self.models
    }
    pub fn models_loading(&self) -> bool {
        self.models_loading
    }
    pub fn models_error(&self) -> Option<&str> {
        self.models_error.as_deref()
    }
    pub fn is_revealing(&self) -> bool {
        self.reveal.is_active()
    }

    pub fn phase(&self) -> Phase {
        if self.is_loading {
            Phase::Submitting
        } else if self.reveal.is_active() {
            Phase::Revealing
        } else if self.is_result_visible {
            Phase::IdleWithResult
        } else {
            Phase::Idle
        }
    }

    /// Register a callback run after every field change.
    pub fn subscribe<F: FnMut(Field) + 'static>(&mut self, listener: F) {
        self.listeners.push(Box::new(listener));
    }

    fn changed(&mut self, field: Field) {
        self.persist(field);
        self.dirty = true;
        for l in self.listeners.iter_mut() {
            l(field);
        }
    }

    fn persist(&self, field: Field) {
        let st: &dyn Storage = &*self.storage;
        match field {
            Field::RecentPrompt => save_field(st, keys::RECENT_PROMPT, &self.recent_prompt),
            Field::PromptHistory => save_field(st, keys::PROMPT_HISTORY, &self.prompt_history),
            Field::Transcript => save_field(st, keys::TRANSCRIPT, &self.transcript),
            Field::DisplayedResponse => {
                save_field(st, keys::DISPLAYED_RESPONSE, &self.displayed_response)
            }
            Field::ResultVisible => save_field(st, keys::RESULT_VISIBLE, &self.is_result_visible),
            Field::SelectedModel => save_field(st, keys::SELECTED_MODEL, &self.selected_model_id),
            Field::DraftInput
            | Field::Loading
            | Field::Models
            | Field::ModelsLoading
            | Field::ModelsError => {}
        }
    }

    pub(crate) fn set_draft_input(&mut self, text: String) {
        if self.draft_input != text {
            self.draft_input = text;
            self.changed(Field::DraftInput);
        }
    }

    fn set_recent_prompt(&mut self, text: String) {
        self.recent_prompt = text;
        self.changed(Field::RecentPrompt);
    }

    fn set_displayed_response(&mut self, text: String) {
        self.displayed_response = text;
        self.changed(Field::DisplayedResponse);
    }

    fn set_result_visible(&mut self, v: bool) {
        self.is_result_visible = v;
        self.changed(Field::ResultVisible);
    }

    fn set_loading(&mut self, v: bool) {
        self.is_loading = v;
        self.changed(Field::Loading);
    }

    /// Run `job` on its own thread and runtime; its event comes back through
    /// `on_tick`. If the job panics or no runtime can be built, `fallback`
    /// is delivered instead so the session never waits forever on a dead job.
    fn spawn_job<F, Fut>(&self, fallback: BackendEvent, job: F)
    where
        F: FnOnce(Arc<C>) -> Fut + Send + 'static,
        Fut: Future<Output = BackendEvent>,
    {
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!(target: "tui", "cannot start background runtime: {}", e);
                    let _ = tx.send(fallback);
                    return;
                }
            };
            let event = match catch_unwind(AssertUnwindSafe(|| rt.block_on(job(client)))) {
                Ok(ev) => ev,
                Err(_) => {
                    error!(target: "tui", "background job panicked");
                    fallback
                }
            };
            // The receiver is gone once the app is torn down.
            let _ = tx.send(event);
        });
    }

    /// Submit a prompt. With no override the draft is sent and recorded in
    /// the prompt history; a blank draft is ignored. Returns whether a
    /// request was dispatched.
    pub fn on_sent(&mut self, prompt_override: Option<String>) -> bool {
        let from_draft = prompt_override.is_none();
        let prompt = match prompt_override {
            Some(p) => p,
            None if self.draft_input.trim().is_empty() => return false,
            None => self.draft_input.clone(),
        };

        self.submission += 1;
        let generation = self.submission;
        self.reveal.cancel();
        self.set_displayed_response(String::new());
        self.set_loading(true);
        self.set_result_visible(true);
        if from_draft {
            self.prompt_history.push(self.draft_input.clone());
            self.history_index = None;
            self.changed(Field::PromptHistory);
        }
        self.set_recent_prompt(prompt.clone());

        let model = self.selected_model_id.clone();
        let system = self.system_instruction.clone();
        let asked_at = Utc::now();
        info!(target: "tui", "submit: generation={} model={} input_len={}", generation, model, prompt.len());
        let fallback = BackendEvent::Chat {
            generation,
            prompt: prompt.clone(),
            asked_at,
            response: REQUEST_FAILED_MESSAGE.to_string(),
        };
        self.spawn_job(fallback, move |client| async move {
            let response = client.run(&prompt, &model, &system).await;
            BackendEvent::Chat {
                generation,
                prompt,
                asked_at,
                response,
            }
        });
        self.chat_scroll = 0;
        true
    }

    /// Back to the empty screen. History and transcript are kept.
    pub fn new_session(&mut self) {
        self.submission += 1;
        self.reveal.cancel();
        self.set_loading(false);
        self.set_result_visible(false);
        self.set_displayed_response(String::new());
        self.set_recent_prompt(String::new());
        self.chat_scroll = 0;
        info!(target: "tui", "new session");
    }

    /// Forget everything the user has sent so far.
    pub fn clear_history(&mut self) {
        self.new_session();
        self.prompt_history.clear();
        self.history_index = None;
        self.sidebar_selected = 0;
        self.changed(Field::PromptHistory);
        self.transcript.clear();
        self.changed(Field::Transcript);
        info!(target: "tui", "history cleared");
    }

    pub fn set_selected_model(&mut self, id: &str) -> Result<(), SessionError> {
        if !self.models.iter().any(|m| m.id == id) {
            warn!(target: "tui", "rejecting unknown model {}", id);
            return Err(SessionError::UnknownModel(id.to_string()));
        }
        self.stored_model_id = Some(id.to_string());
        if self.selected_model_id != id {
            self.selected_model_id = id.to_string();
            self.changed(Field::SelectedModel);
            info!(target: "tui", "model set to {}", id);
        }
        Ok(())
    }

    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Chat {
                generation,
                prompt,
                asked_at,
                response,
            } => self.complete_exchange(generation, prompt, asked_at, response),
            BackendEvent::Models(fetched) => self.apply_candidates(fetched),
        }
    }

    fn complete_exchange(
        &mut self,
        generation: u64,
        prompt: String,
        asked_at: DateTime<Utc>,
        response: String,
    ) {
        self.transcript.push(ConversationTurn {
            role: Role::User,
            content: prompt,
            timestamp: asked_at,
        });
        self.transcript.push(ConversationTurn::assistant(response.clone()));
        self.changed(Field::Transcript);

        if generation != self.submission {
            debug!(target: "tui", "stale reply generation={} current={}", generation, self.submission);
            return;
        }
        self.reveal.start(&format_response(&response));
        self.set_loading(false);
        self.set_draft_input(String::new());
        self.input_cursor = 0;
    }

    /// Drain finished background work, then advance the reveal by at most
    /// one token.
    pub fn on_tick_at(&mut self, now: Instant) {
        self.tick = self.tick.wrapping_add(1);
        for _ in 0..64 {
            match self.rx.try_recv() {
                Ok(ev) => self.handle_backend_event(ev),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if let Some(step) = self.reveal.tick(now) {
            self.displayed_response.push_str(&step.chunk);
            self.changed(Field::DisplayedResponse);
        }
        if self.is_loading {
            self.dirty = true;
        }
    }

    pub fn on_tick(&mut self) {
        self.on_tick_at(Instant::now());
    }
}
