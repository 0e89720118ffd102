use chat_core::{ConversationTurn, ModelClient, Role};
use textwrap::{wrap, Options};
use unicode_width::UnicodeWidthStr;

use crate::strings::{PREFIX_ASSISTANT, PREFIX_USER};

use super::App;

impl<C: ModelClient + 'static> App<C> {
    pub fn transcript_lines(&mut self, width: u16) -> &[TranscriptLine] {
        self.transcript_cache.refresh(&self.transcript, width)
    }
}

/// One wrapped display line of the transcript view.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptLine {
    pub role: Role,
    /// First line of a turn; carries the role prefix.
    pub head: bool,
    pub text: String,
}

/// Wrapped transcript lines, rebuilt when the width changes and extended
/// when turns are appended.
#[derive(Default)]
pub struct TranscriptCache {
    width: u16,
    turns: usize,
    lines: Vec<TranscriptLine>,
}

impl TranscriptCache {
    pub fn refresh(&mut self, turns: &[ConversationTurn], width: u16) -> &[TranscriptLine] {
        let width = width.max(1);
        if width != self.width || turns.len() < self.turns {
            self.lines.clear();
            self.turns = 0;
            self.width = width;
        }
        for turn in &turns[self.turns..] {
            self.lines.extend(wrap_turn(turn, width));
        }
        self.turns = turns.len();
        &self.lines
    }
}

fn wrap_turn(turn: &ConversationTurn, width: u16) -> Vec<TranscriptLine> {
    let prefix = match turn.role {
        Role::User => PREFIX_USER,
        Role::Assistant => PREFIX_ASSISTANT,
    };
    let indent = " ".repeat(UnicodeWidthStr::width(prefix));
    let full = format!("{}{}", prefix, turn.content);
    let opts = Options::new(width as usize).subsequent_indent(&indent);
    let mut out: Vec<TranscriptLine> = wrap(&full, opts)
        .into_iter()
        .enumerate()
        .map(|(i, l)| TranscriptLine {
            role: turn.role,
            head: i == 0,
            text: l.into_owned(),
        })
        .collect();
    // Blank line between turns.
    out.push(TranscriptLine {
        role: turn.role,
        head: false,
        text: String::new(),
    });
    out
}
