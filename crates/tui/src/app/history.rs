use chat_core::ModelClient;

use super::App;

impl<C: ModelClient + 'static> App<C> {
    /// Step back through sent prompts into the draft. Duplicates are
    /// visited as recorded.
    pub fn history_prev(&mut self) {
        let len = self.prompt_history().len();
        if len == 0 {
            return;
        }
        let idx = match self.history_index {
            None => len - 1,
            Some(0) => 0,
            Some(i) => i - 1,
        };
        let text = self.prompt_history()[idx].clone();
        self.replace_draft(text);
        self.history_index = Some(idx);
    }

    /// Step forward; past the newest entry the draft is emptied.
    pub fn history_next(&mut self) {
        let Some(i) = self.history_index else {
            return;
        };
        if i + 1 < self.prompt_history().len() {
            let text = self.prompt_history()[i + 1].clone();
            self.replace_draft(text);
            self.history_index = Some(i + 1);
        } else {
            self.replace_draft(String::new());
            self.history_index = None;
        }
    }

    /// Re-send the sidebar's highlighted prompt. The history is not extended.
    pub fn resend_selected(&mut self) -> bool {
        // Sidebar lists newest first.
        let len = self.prompt_history().len();
        if self.sidebar_selected >= len {
            return false;
        }
        let prompt = self.prompt_history()[len - 1 - self.sidebar_selected].clone();
        self.on_sent(Some(prompt))
    }
}

#[cfg(test)]
mod tests {
    use crate::app::tests::{app_with, settle_one, MockClient};

    fn sent(app: &mut crate::app::App<MockClient>, s: &str) {
        app.insert_text(s);
        app.on_sent(None);
        settle_one(app);
    }

    #[test]
    fn recall_walks_back_and_forth() {
        let mut app = app_with(MockClient::default());
        sent(&mut app, "one");
        sent(&mut app, "two");
        sent(&mut app, "two");

        app.history_prev();
        assert_eq!(app.draft_input(), "two");
        app.history_prev();
        assert_eq!(app.draft_input(), "two");
        app.history_prev();
        assert_eq!(app.draft_input(), "one");
        app.history_prev();
        assert_eq!(app.draft_input(), "one");
        app.history_next();
        assert_eq!(app.draft_input(), "two");
        app.history_next();
        app.history_next();
        assert_eq!(app.draft_input(), "");
        assert_eq!(app.history_index, None);
    }

    #[test]
    fn resend_uses_newest_first_order() {
        let mut app = app_with(MockClient::default());
        sent(&mut app, "old");
        sent(&mut app, "new");
        app.sidebar_selected = 1;
        assert!(app.resend_selected());
        assert_eq!(app.recent_prompt(), "old");
        assert_eq!(app.prompt_history().len(), 2);
        settle_one(&mut app);
        assert_eq!(app.transcript().len(), 6);
    }

    #[test]
    fn resend_out_of_range_does_nothing() {
        let mut app = app_with(MockClient::default());
        assert!(!app.resend_selected());
        assert!(!app.is_loading());
    }
}
