// UI strings and labels. ASCII-friendly apart from the model sparkle.

use unicode_width::UnicodeWidthStr;

pub const PREFIX_USER: &str = "| ";
pub const PREFIX_ASSISTANT: &str = "> ";

pub const INPUT_HINT: &str = "Enter a prompt here (Enter: send, Shift+Enter: newline)";

pub const TITLE_RECENT: &str = " Recent ";
pub const TITLE_CHAT: &str = " Chat ";
pub const TITLE_TRANSCRIPT: &str = " Transcript ";
pub const TITLE_INPUT: &str = " Prompt ";
pub const TITLE_HELP: &str = " Help / Shortcuts ";
pub const TITLE_CONFIRM: &str = " Confirm ";
pub const TITLE_MODEL: &str = " Select Model ";

pub const APP_NAME: &str = "Gemini";
pub const GREETING: &str = "Hello, Dev.";
pub const GREETING_SUB: &str = "How can I help you today?";
pub const THINKING: &str = "Thinking";
pub const EMPTY_HISTORY: &str = "No prompts yet";
pub const EMPTY_TRANSCRIPT: &str = "Nothing has been said yet.";
pub const DISCLAIMER: &str =
    "Responses may be inaccurate. This is not a substitute for professional help.";

pub const CONFIRM_CLEAR_HISTORY: &str =
    "Clear all prompt history and the transcript? Press Y to confirm, N/Esc to cancel.";

/// Animated dots for the loading indicator.
pub fn thinking_label(tick: u64) -> String {
    let dots = (tick / 4 % 4) as usize;
    format!("{}{}", THINKING, ".".repeat(dots))
}

/// Status bar text, dropping trailing segments that do not fit.
pub fn build_status_line(
    model: &str,
    focus: &str,
    scroll: u16,
    history_len: usize,
    turns: usize,
    max_width: u16,
) -> String {
    let mut segments = vec![
        format!("[{}]", model),
        format!("[{}]", focus),
        if scroll == 0 {
            "Bottom".to_string()
        } else {
            format!("+{} lines", scroll)
        },
        format!("Hist:{}", history_len),
        format!("Turns:{}", turns),
    ];
    for h in [
        "F4: model",
        "Ctrl+N: new chat",
        "F3: transcript",
        "F2: recent",
        "F1: help",
    ] {
        segments.push(h.to_string());
    }

    let sep = "  |  ";
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        let extra = if i == 0 { 0 } else { sep.width() };
        if out.width() + extra + seg.width() > max_width as usize {
            break;
        }
        if i > 0 {
            out.push_str(sep);
        }
        out.push_str(seg);
    }
    out
}

pub fn help_lines() -> &'static [&'static str] {
    &[
        "Basic",
        "  Enter: Send    Shift+Enter: Newline    Esc/Ctrl-C: Quit",
        "  Ctrl+N: New chat    Ctrl+L: Clear history    F4: Choose model",
        "  F5-F8: Suggested prompts (empty screen only)",
        "Input Editing",
        "  Arrow: Move cursor    Backspace/Delete: Delete prev/next char",
        "  Home/End, Ctrl+A/E: Line start/end    Ctrl+Arrow: Word move",
        "  Ctrl+W: Delete prev word    Ctrl+U/K: Kill to line start/end",
        "  Up/Down: Recall sent prompts",
        "Views",
        "  PgUp/PgDn, mouse wheel: Scroll    F3: Transcript    F2: Recent prompts",
        "  Tab: Focus recent    Recent focus: Up/Down, Enter re-send, N new, D clear",
        "Help",
        "  ?: Open/close this panel    F1: Open/close this panel",
    ]
}
