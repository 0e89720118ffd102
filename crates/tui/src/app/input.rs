use chat_core::ModelClient;
use unicode_segmentation::UnicodeSegmentation;

use super::App;

/// Draft editing. The cursor counts graphemes, not bytes.
impl<C: ModelClient + 'static> App<C> {
    fn grapheme_count(&self) -> usize {
        self.draft_input().graphemes(true).count()
    }

    /// Byte offset of the `idx`-th grapheme boundary.
    fn byte_at(&self, idx: usize) -> usize {
        self.draft_input()
            .grapheme_indices(true)
            .nth(idx)
            .map(|(b, _)| b)
            .unwrap_or(self.draft_input().len())
    }

    fn splice(&mut self, from: usize, to: usize, with: &str) {
        let (a, b) = (self.byte_at(from), self.byte_at(to));
        let mut next = String::with_capacity(self.draft_input().len() + with.len());
        next.push_str(&self.draft_input()[..a]);
        next.push_str(with);
        next.push_str(&self.draft_input()[b..]);
        self.set_draft_input(next);
    }

    fn line_start(&self) -> usize {
        let g: Vec<&str> = self.draft_input().graphemes(true).collect();
        let mut i = self.input_cursor.min(g.len());
        while i > 0 && g[i - 1] != "\n" {
            i -= 1;
        }
        i
    }

    fn line_end(&self) -> usize {
        let g: Vec<&str> = self.draft_input().graphemes(true).collect();
        let mut i = self.input_cursor.min(g.len());
        while i < g.len() && g[i] != "\n" {
            i += 1;
        }
        i
    }

    fn word_left(&self) -> usize {
        let g: Vec<&str> = self.draft_input().graphemes(true).collect();
        let mut i = self.input_cursor.min(g.len());
        while i > 0 && g[i - 1].trim().is_empty() {
            i -= 1;
        }
        while i > 0 && !g[i - 1].trim().is_empty() {
            i -= 1;
        }
        i
    }

    fn word_right(&self) -> usize {
        let g: Vec<&str> = self.draft_input().graphemes(true).collect();
        let mut i = self.input_cursor.min(g.len());
        while i < g.len() && g[i].trim().is_empty() {
            i += 1;
        }
        while i < g.len() && !g[i].trim().is_empty() {
            i += 1;
        }
        i
    }

    pub fn insert_text(&mut self, s: &str) {
        let at = self.input_cursor.min(self.grapheme_count());
        self.splice(at, at, s);
        self.input_cursor = (at + s.graphemes(true).count()).min(self.grapheme_count());
        self.history_index = None;
    }

    /// Replace the whole draft, cursor at the end.
    pub fn replace_draft(&mut self, s: String) {
        self.set_draft_input(s);
        self.input_cursor = self.grapheme_count();
    }

    pub fn delete_left_grapheme(&mut self) {
        let at = self.input_cursor.min(self.grapheme_count());
        if at == 0 {
            return;
        }
        self.splice(at - 1, at, "");
        self.input_cursor = at - 1;
    }

    pub fn delete_right_grapheme(&mut self) {
        let at = self.input_cursor.min(self.grapheme_count());
        if at < self.grapheme_count() {
            self.splice(at, at + 1, "");
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.input_cursor = (self.input_cursor + 1).min(self.grapheme_count());
    }

    pub fn move_cursor_line_start(&mut self) {
        self.input_cursor = self.line_start();
    }

    pub fn move_cursor_line_end(&mut self) {
        self.input_cursor = self.line_end();
    }

    pub fn move_cursor_word_left(&mut self) {
        self.input_cursor = self.word_left();
    }

    pub fn move_cursor_word_right(&mut self) {
        self.input_cursor = self.word_right();
    }

    pub fn delete_prev_word(&mut self) {
        let end = self.input_cursor.min(self.grapheme_count());
        let start = self.word_left();
        self.splice(start, end, "");
        self.input_cursor = start;
    }

    pub fn kill_to_line_start(&mut self) {
        let end = self.input_cursor.min(self.grapheme_count());
        let start = self.line_start();
        self.splice(start, end, "");
        self.input_cursor = start;
    }

    pub fn kill_to_line_end(&mut self) {
        let start = self.input_cursor.min(self.grapheme_count());
        let end = self.line_end();
        self.splice(start, end, "");
    }
}

#[cfg(test)]
mod tests {
    use crate::app::tests::{app_with, MockClient};

    #[test]
    fn inserts_at_cursor_by_grapheme() {
        let mut app = app_with(MockClient::default());
        app.insert_text("héllo");
        app.input_cursor = 1;
        app.insert_text("👋🏽");
        assert_eq!(app.draft_input(), "h👋🏽éllo");
        assert_eq!(app.input_cursor, 2);
        app.delete_left_grapheme();
        assert_eq!(app.draft_input(), "héllo");
        app.delete_right_grapheme();
        assert_eq!(app.draft_input(), "hllo");
    }

    #[test]
    fn word_and_line_editing() {
        let mut app = app_with(MockClient::default());
        app.insert_text("first line\nsecond  word");
        app.delete_prev_word();
        assert_eq!(app.draft_input(), "first line\nsecond  ");
        app.move_cursor_word_left();
        assert_eq!(app.input_cursor, 11);
        app.kill_to_line_end();
        assert_eq!(app.draft_input(), "first line\n");
        app.move_cursor_left();
        app.kill_to_line_start();
        assert_eq!(app.draft_input(), "\n");
        assert_eq!(app.input_cursor, 0);
    }

    #[test]
    fn replace_draft_moves_cursor_to_end() {
        let mut app = app_with(MockClient::default());
        app.replace_draft("abc".into());
        assert_eq!(app.input_cursor, 3);
        app.move_cursor_right();
        assert_eq!(app.input_cursor, 3);
    }
}
