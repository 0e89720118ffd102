use chat_core::ModelClient;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::{App, ConfirmAction, ConfirmState, Focus, SUGGESTED_PROMPTS};

impl<C: ModelClient + 'static> App<C> {
    pub fn on_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        self.dirty = true;
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && matches!(key.code, KeyCode::Char('c')) {
            self.should_quit = true;
            return;
        }
        if self.confirm.is_some() {
            self.on_confirm_key(key);
            return;
        }
        if self.model_picker.is_some() {
            match key.code {
                KeyCode::Up => self.model_picker_move(false),
                KeyCode::Down => self.model_picker_move(true),
                KeyCode::Enter => self.model_picker_confirm(),
                KeyCode::Esc | KeyCode::F(4) => self.model_picker = None,
                _ => {}
            }
            return;
        }
        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?')) {
                self.show_help = false;
            }
            return;
        }

        match key.code {
            KeyCode::F(1) => {
                self.show_help = true;
                return;
            }
            KeyCode::F(2) => {
                self.show_sidebar = !self.show_sidebar;
                if !self.show_sidebar {
                    self.focus = Focus::Input;
                }
                return;
            }
            KeyCode::F(3) => {
                self.show_transcript = !self.show_transcript;
                self.chat_scroll = 0;
                return;
            }
            KeyCode::F(4) => {
                self.open_model_picker();
                return;
            }
            KeyCode::F(n @ 5..=8) => {
                if !self.is_result_visible() {
                    self.on_sent(Some(SUGGESTED_PROMPTS[(n - 5) as usize].to_string()));
                }
                return;
            }
            KeyCode::Char('n') if ctrl => {
                self.new_session();
                return;
            }
            KeyCode::Char('l') if ctrl => {
                self.confirm = Some(ConfirmState {
                    action: ConfirmAction::ClearHistory,
                });
                return;
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Input if self.show_sidebar => Focus::Sidebar,
                    _ => Focus::Input,
                };
                return;
            }
            KeyCode::PageUp => {
                self.chat_scroll = self.chat_scroll.saturating_add(5);
                return;
            }
            KeyCode::PageDown => {
                self.chat_scroll = self.chat_scroll.saturating_sub(5);
                return;
            }
            KeyCode::Esc => {
                if self.show_transcript {
                    self.show_transcript = false;
                } else {
                    self.should_quit = true;
                }
                return;
            }
            _ => {}
        }

        match self.focus {
            Focus::Sidebar => self.on_sidebar_key(key),
            Focus::Input => self.on_input_key(key),
        }
    }

    fn on_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                if let Some(c) = self.confirm.take() {
                    match c.action {
                        ConfirmAction::ClearHistory => self.clear_history(),
                    }
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.confirm = None,
            _ => {}
        }
    }

    fn on_sidebar_key(&mut self, key: KeyEvent) {
        let len = self.prompt_history().len();
        match key.code {
            KeyCode::Up => self.sidebar_selected = self.sidebar_selected.saturating_sub(1),
            KeyCode::Down => {
                self.sidebar_selected = (self.sidebar_selected + 1).min(len.saturating_sub(1))
            }
            KeyCode::Enter => {
                if self.resend_selected() {
                    self.focus = Focus::Input;
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') => self.new_session(),
            KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Delete => {
                self.confirm = Some(ConfirmState {
                    action: ConfirmAction::ClearHistory,
                })
            }
            _ => {}
        }
    }

    fn on_input_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Enter if shift || alt => self.insert_text("\n"),
            KeyCode::Enter => {
                self.on_sent(None);
            }
            KeyCode::Up => self.history_prev(),
            KeyCode::Down => self.history_next(),
            KeyCode::Left if ctrl => self.move_cursor_word_left(),
            KeyCode::Right if ctrl => self.move_cursor_word_right(),
            KeyCode::Left => self.move_cursor_left(),
            KeyCode::Right => self.move_cursor_right(),
            KeyCode::Home => self.move_cursor_line_start(),
            KeyCode::End => self.move_cursor_line_end(),
            KeyCode::Backspace => self.delete_left_grapheme(),
            KeyCode::Delete => self.delete_right_grapheme(),
            KeyCode::Char('a') if ctrl => self.move_cursor_line_start(),
            KeyCode::Char('e') if ctrl => self.move_cursor_line_end(),
            KeyCode::Char('w') if ctrl => self.delete_prev_word(),
            KeyCode::Char('u') if ctrl => self.kill_to_line_start(),
            KeyCode::Char('k') if ctrl => self.kill_to_line_end(),
            KeyCode::Char('?') if self.draft_input().is_empty() => self.show_help = true,
            KeyCode::Char(c) if !ctrl => {
                let mut buf = [0u8; 4];
                self.insert_text(c.encode_utf8(&mut buf));
            }
            _ => {}
        }
    }
}
