use chat_core::{choose_default, CandidateFetch, ModelClient};
use providers::gemini::fallback_models;
use tracing::{info, warn};

use super::{App, BackendEvent, Field};

pub const MODELS_LOADING_LABEL: &str = "Loading...";
pub const MODELS_FALLBACK_LABEL: &str = "Using default";

#[derive(Clone, Debug, Default)]
pub struct ModelPickerState {
    pub selected: usize,
}

impl<C: ModelClient + 'static> App<C> {
    /// Fetch the live model list once in the background.
    pub fn start_model_bootstrap(&mut self) {
        self.models_loading = true;
        self.changed(Field::ModelsLoading);
        let fallback = BackendEvent::Models(CandidateFetch::failed("model list request failed"));
        self.spawn_job(fallback, |client| async move {
            BackendEvent::Models(client.fetch_candidates().await)
        });
    }

    pub(super) fn apply_candidates(&mut self, fetched: CandidateFetch) {
        if fetched.models.is_empty() {
            let reason = fetched
                .warning
                .unwrap_or_else(|| "no models available".to_string());
            warn!(target: "tui", "using fallback models: {}", reason);
            self.models = fallback_models();
            self.models_error = Some(reason);
            self.recompute_selection();
        } else {
            info!(target: "tui", "{} models available", fetched.models.len());
            self.models = fetched.models;
            self.models_error = None;
            let kept = self
                .stored_model_id
                .clone()
                .filter(|id| self.models.iter().any(|m| &m.id == id));
            match kept {
                Some(id) if id == self.selected_model_id => {}
                Some(id) => {
                    self.selected_model_id = id;
                    self.changed(Field::SelectedModel);
                }
                None => self.recompute_selection(),
            }
        }
        self.changed(Field::Models);
        self.changed(Field::ModelsError);
        if let Some(picker) = self.model_picker.as_mut() {
            picker.selected = picker.selected.min(self.models.len().saturating_sub(1));
        }
        self.models_loading = false;
        self.changed(Field::ModelsLoading);
    }

    fn recompute_selection(&mut self) {
        let Some(pick) = choose_default(&self.models).map(str::to_owned) else {
            return;
        };
        if pick != self.selected_model_id {
            info!(target: "tui", "default model {} replaces '{}'", pick, self.selected_model_id);
            self.selected_model_id = pick;
            self.changed(Field::SelectedModel);
        }
    }

    /// Header text for the model control.
    pub fn model_status_label(&self) -> String {
        if self.models_loading {
            return MODELS_LOADING_LABEL.to_string();
        }
        let current = self
            .models
            .iter()
            .find(|m| m.id == self.selected_model_id)
            .map(|m| m.label())
            .unwrap_or_else(|| self.selected_model_id.clone());
        if self.models_error.is_some() {
            format!("{} ({})", current, MODELS_FALLBACK_LABEL)
        } else {
            current
        }
    }

    pub fn can_pick_model(&self) -> bool {
        !self.is_loading && !self.models_loading
    }

    pub fn open_model_picker(&mut self) {
        if !self.can_pick_model() {
            return;
        }
        let selected = self
            .models
            .iter()
            .position(|m| m.id == self.selected_model_id)
            .unwrap_or(0);
        self.model_picker = Some(ModelPickerState { selected });
        self.dirty = true;
    }

    pub fn model_picker_move(&mut self, down: bool) {
        let len = self.models.len();
        if let Some(p) = self.model_picker.as_mut() {
            if down {
                p.selected = (p.selected + 1).min(len.saturating_sub(1));
            } else {
                p.selected = p.selected.saturating_sub(1);
            }
            self.dirty = true;
        }
    }

    pub fn model_picker_confirm(&mut self) {
        let Some(p) = self.model_picker.take() else {
            return;
        };
        self.dirty = true;
        let Some(id) = self.models.get(p.selected).map(|m| m.id.clone()) else {
            return;
        };
        if let Err(e) = self.set_selected_model(&id) {
            warn!(target: "tui", "{}", e);
        }
    }
}
