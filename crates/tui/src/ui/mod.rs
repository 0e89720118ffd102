use chat_core::{ModelClient, Role};
use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::{App, ConfirmAction, Focus, Phase, SUGGESTED_PROMPTS};
use crate::strings::{
    build_status_line, help_lines, thinking_label, APP_NAME, CONFIRM_CLEAR_HISTORY, DISCLAIMER,
    EMPTY_HISTORY, EMPTY_TRANSCRIPT, GREETING, GREETING_SUB, INPUT_HINT, PREFIX_ASSISTANT,
    PREFIX_USER, TITLE_CHAT, TITLE_CONFIRM, TITLE_HELP, TITLE_INPUT, TITLE_MODEL, TITLE_RECENT,
    TITLE_TRANSCRIPT,
};
use crate::theme::THEME;

pub mod markup;

const SIDEBAR_WIDTH: u16 = 28;
const INPUT_MAX_LINES: u16 = 6;

pub fn draw<C: ModelClient + 'static>(f: &mut Frame, app: &mut App<C>) {
    let area = f.area();
    let main_area = if app.show_sidebar {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
            .split(area);
        draw_sidebar(f, cols[0], app);
        cols[1]
    } else {
        area
    };
    draw_main(f, main_area, app);

    if app.confirm.is_some() {
        draw_confirm(f, area, app);
    }
    if app.model_picker.is_some() {
        draw_model_picker(f, area, app);
    }
    if app.show_help {
        draw_help(f, area);
    }
}

fn border(focused: bool) -> Style {
    if focused {
        Style::default().fg(THEME.border_focus)
    } else {
        Style::default().fg(THEME.border_inactive)
    }
}

fn inner(area: Rect) -> Rect {
    Rect {
        x: area.x.saturating_add(1),
        y: area.y.saturating_add(1),
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    }
}

fn draw_sidebar<C: ModelClient + 'static>(f: &mut Frame, area: Rect, app: &App<C>) {
    let focused = matches!(app.focus, Focus::Sidebar);
    let block = Block::default()
        .title(Span::styled(
            TITLE_RECENT,
            Style::default().fg(THEME.warning).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(border(focused));
    let width = area.width.saturating_sub(4) as usize;
    let height = area.height.saturating_sub(2) as usize;
    let history = app.prompt_history();
    if history.is_empty() {
        let para = Paragraph::new(Line::from(Span::styled(
            EMPTY_HISTORY,
            Style::default().fg(THEME.muted),
        )))
        .block(block);
        f.render_widget(para, area);
        return;
    }
    let selected = app.sidebar_selected.min(history.len() - 1);
    let start = selected.saturating_sub(height.saturating_sub(1));
    let lines: Vec<Line> = history
        .iter()
        .rev()
        .enumerate()
        .skip(start)
        .take(height)
        .map(|(i, prompt)| {
            let first = prompt.trim().lines().next().unwrap_or("");
            let text = truncate_to_width(first, width);
            let style = if i == selected && focused {
                Style::default()
                    .fg(THEME.selected_fg)
                    .bg(THEME.selected_bg)
                    .add_modifier(Modifier::BOLD)
            } else if i == selected {
                Style::default().fg(THEME.border_focus)
            } else {
                Style::default()
            };
            let marker = if i == selected { "> " } else { "  " };
            Line::from(Span::styled(format!("{}{}", marker, text), style))
        })
        .collect();
    f.render_widget(Paragraph::new(lines).block(block), area);

    if history.len() > height {
        let mut sb_state = ScrollbarState::new(history.len()).position(selected);
        let sb = Scrollbar::default().orientation(ScrollbarOrientation::VerticalRight);
        f.render_stateful_widget(sb, inner(area), &mut sb_state);
    }
}

fn draw_main<C: ModelClient + 'static>(f: &mut Frame, area: Rect, app: &mut App<C>) {
    let inner_width = area.width.saturating_sub(2);
    let input_lines = (measure_total_lines(app.draft_input(), inner_width) as u16)
        .clamp(1, INPUT_MAX_LINES);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(input_lines + 2),
        ])
        .split(area);

    draw_header(f, rows[0], app);
    if app.show_transcript {
        draw_transcript(f, rows[1], app);
    } else {
        draw_chat(f, rows[1], app);
    }
    draw_status(f, rows[2], app);
    draw_input(f, rows[3], app, input_lines, inner_width);
}

fn draw_header<C: ModelClient + 'static>(f: &mut Frame, area: Rect, app: &App<C>) {
    let mut spans = vec![
        Span::styled(
            format!(" {} ", APP_NAME),
            Style::default().fg(THEME.accent).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            app.model_status_label(),
            if app.can_pick_model() {
                Style::default()
            } else {
                Style::default().fg(THEME.muted)
            },
        ),
    ];
    if let Some(err) = app.models_error() {
        spans.push(Span::styled(
            format!("  ! {}", err),
            Style::default().fg(THEME.warning),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Idle screen, or the current prompt with its (possibly partial) reply.
fn draw_chat<C: ModelClient + 'static>(f: &mut Frame, area: Rect, app: &mut App<C>) {
    let block = Block::default()
        .title(TITLE_CHAT)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(THEME.chat_border));
    let body = inner(area);

    let mut lines: Vec<Line> = Vec::new();
    if !app.is_result_visible() {
        lines.push(Line::from(Span::styled(
            GREETING,
            Style::default().fg(THEME.accent).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(GREETING_SUB));
        lines.push(Line::default());
        for (i, s) in SUGGESTED_PROMPTS.iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(format!("F{}  ", i + 5), Style::default().fg(THEME.muted)),
                Span::raw(*s),
            ]));
        }
    } else {
        let head = Style::default().fg(THEME.user).add_modifier(Modifier::BOLD);
        for (i, l) in app.recent_prompt().split('\n').enumerate() {
            let prefix = if i == 0 { PREFIX_USER } else { "  " };
            lines.push(Line::from(vec![
                Span::styled(prefix, head),
                Span::raw(l.to_string()),
            ]));
        }
        lines.push(Line::default());
        if app.phase() == Phase::Submitting {
            lines.push(Line::from(Span::styled(
                thinking_label(app.tick),
                Style::default().fg(THEME.muted).add_modifier(Modifier::ITALIC),
            )));
        } else {
            let mut reply = markup::to_lines(app.displayed_response(), Style::default());
            if let Some(first) = reply.first_mut() {
                first.spans.insert(
                    0,
                    Span::styled(
                        PREFIX_ASSISTANT,
                        Style::default().fg(THEME.assistant).add_modifier(Modifier::BOLD),
                    ),
                );
            }
            lines.extend(reply);
            if app.phase() == Phase::IdleWithResult {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    DISCLAIMER,
                    Style::default().fg(THEME.muted),
                )));
            }
        }
    }

    let total = estimate_rows(&lines, body.width);
    let viewport = body.height as usize;
    let max_scroll = total.saturating_sub(viewport);
    app.chat_scroll = app.chat_scroll.min(max_scroll as u16);
    let top = max_scroll - app.chat_scroll as usize;
    let para = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((top as u16, 0));
    f.render_widget(para, area);
    if total > viewport {
        let mut sb_state = ScrollbarState::new(total).position(top);
        let sb = Scrollbar::default().orientation(ScrollbarOrientation::VerticalRight);
        f.render_stateful_widget(sb, body, &mut sb_state);
    }
}

fn draw_transcript<C: ModelClient + 'static>(f: &mut Frame, area: Rect, app: &mut App<C>) {
    let block = Block::default()
        .title(TITLE_TRANSCRIPT)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(THEME.border_focus));
    let body = inner(area);
    let viewport = body.height as usize;
    let scroll = app.chat_scroll;
    let all = app.transcript_lines(body.width);
    if all.is_empty() {
        let para = Paragraph::new(Line::from(Span::styled(
            EMPTY_TRANSCRIPT,
            Style::default().fg(THEME.muted),
        )))
        .block(block);
        f.render_widget(para, area);
        return;
    }
    let total = all.len();
    let max_scroll = total.saturating_sub(viewport);
    let scroll = (scroll as usize).min(max_scroll);
    let top = max_scroll - scroll;
    let lines: Vec<Line> = all[top..(top + viewport).min(total)]
        .iter()
        .map(|l| {
            if !l.head {
                return Line::from(l.text.clone());
            }
            let (color, prefix) = match l.role {
                Role::User => (THEME.user, PREFIX_USER),
                Role::Assistant => (THEME.assistant, PREFIX_ASSISTANT),
            };
            let cut = prefix.len().min(l.text.len());
            Line::from(vec![
                Span::styled(
                    l.text[..cut].to_string(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(l.text[cut..].to_string()),
            ])
        })
        .collect();
    app.chat_scroll = scroll as u16;
    f.render_widget(Paragraph::new(lines).block(block), area);
    if total > viewport {
        let mut sb_state = ScrollbarState::new(total).position(top);
        let sb = Scrollbar::default().orientation(ScrollbarOrientation::VerticalRight);
        f.render_stateful_widget(sb, body, &mut sb_state);
    }
}

fn draw_status<C: ModelClient + 'static>(f: &mut Frame, area: Rect, app: &App<C>) {
    let focus = match app.focus {
        Focus::Input => "Prompt",
        Focus::Sidebar => "Recent",
    };
    let text = build_status_line(
        &app.model_status_label(),
        focus,
        app.chat_scroll,
        app.prompt_history().len(),
        app.transcript().len(),
        area.width,
    );
    f.render_widget(
        Paragraph::new(Span::styled(text, Style::default().fg(THEME.muted))),
        area,
    );
}

fn draw_input<C: ModelClient + 'static>(
    f: &mut Frame,
    area: Rect,
    app: &App<C>,
    visible_lines: u16,
    inner_width: u16,
) {
    let focused = matches!(app.focus, Focus::Input) && app.model_picker.is_none();
    let block = Block::default()
        .title(TITLE_INPUT)
        .borders(Borders::ALL)
        .border_style(border(focused));
    let graphemes: Vec<&str> = app.draft_input().graphemes(true).collect();
    let upto = app.input_cursor.min(graphemes.len());
    let (line_idx, col) = measure_prefix_line_col(&graphemes, upto, inner_width);
    let offset_y = line_idx.saturating_sub(visible_lines.saturating_sub(1));

    let para = if app.draft_input().is_empty() {
        Paragraph::new(Line::from(Span::styled(
            INPUT_HINT,
            Style::default().fg(THEME.muted),
        )))
        .block(block)
    } else {
        Paragraph::new(app.draft_input().to_string())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((offset_y, 0))
    };
    f.render_widget(para, area);

    if focused {
        f.set_cursor_position(Position::new(
            area.x + 1 + col,
            area.y + 1 + line_idx.saturating_sub(offset_y),
        ));
    }
}

fn draw_model_picker<C: ModelClient + 'static>(f: &mut Frame, area: Rect, app: &App<C>) {
    let Some(state) = &app.model_picker else {
        return;
    };
    let popup = centered_rect(60, 50, area);
    let block = Block::default()
        .title(Span::styled(
            TITLE_MODEL,
            Style::default().fg(THEME.warning).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL);
    let lines: Vec<Line> = app
        .models()
        .iter()
        .enumerate()
        .take(popup.height.saturating_sub(2) as usize)
        .map(|(i, m)| {
            let current = if m.id == app.selected_model_id() { "*" } else { " " };
            let style = if i == state.selected {
                Style::default()
                    .fg(THEME.selected_fg)
                    .bg(THEME.selected_bg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(Span::styled(format!("{} {}", current, m.label()), style))
        })
        .collect();
    f.render_widget(Clear, popup);
    f.render_widget(Paragraph::new(lines).block(block), popup);
}

fn draw_confirm<C: ModelClient + 'static>(f: &mut Frame, area: Rect, app: &App<C>) {
    let Some(confirm) = &app.confirm else {
        return;
    };
    let popup = centered_rect(60, 20, area);
    let block = Block::default()
        .title(Span::styled(
            TITLE_CONFIRM,
            Style::default().fg(THEME.warning).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL);
    let text = match confirm.action {
        ConfirmAction::ClearHistory => CONFIRM_CLEAR_HISTORY,
    };
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
        popup,
    );
}

fn draw_help(f: &mut Frame, area: Rect) {
    let popup = centered_rect(70, 70, area);
    let block = Block::default()
        .title(Span::styled(
            TITLE_HELP,
            Style::default().fg(THEME.warning).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL);
    let lines: Vec<Line> = help_lines()
        .iter()
        .map(|s| {
            if s.starts_with(' ') {
                Line::from(*s)
            } else {
                Line::from(Span::styled(*s, Style::default().add_modifier(Modifier::BOLD)))
            }
        })
        .collect();
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        popup,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1])[1]
}

fn truncate_to_width(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for g in s.graphemes(true) {
        let w = g.width();
        if used + w + 1 > width {
            break;
        }
        out.push_str(g);
        used += w;
    }
    out.push('~');
    out
}

/// Rows `lines` occupy once wrapped at `width` (character wrap, so an
/// upper bound for word wrap in most cases).
fn estimate_rows(lines: &[Line], width: u16) -> usize {
    let w = width.max(1) as usize;
    lines
        .iter()
        .map(|l| l.width().max(1).div_ceil(w))
        .sum()
}

fn measure_total_lines(s: &str, width: u16) -> usize {
    let g: Vec<&str> = s.graphemes(true).collect();
    measure_prefix_line_col(&g, g.len(), width).0 as usize + 1
}

/// Line and column of the caret after `upto` graphemes, wrapping at `width`.
fn measure_prefix_line_col(graphemes: &[&str], upto: usize, width: u16) -> (u16, u16) {
    if width == 0 {
        return (0, 0);
    }
    let (mut line, mut col) = (0usize, 0usize);
    for g in graphemes.iter().take(upto) {
        if *g == "\n" {
            line += 1;
            col = 0;
            continue;
        }
        let w = g.width();
        if col + w > width as usize {
            line += 1;
            col = 0;
        }
        col += w;
    }
    (line as u16, col as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{app_with, settle_one, MockClient};
    use ratatui::{backend::TestBackend, Terminal};

    fn screen(app: &mut App<MockClient>) -> String {
        let mut term = Terminal::new(TestBackend::new(100, 30)).unwrap();
        term.draw(|f| draw(f, app)).unwrap();
        let buf = term.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn caret_tracks_wraps_and_newlines() {
        let g: Vec<&str> = "abcdef".graphemes(true).collect();
        assert_eq!(measure_prefix_line_col(&g, 5, 5), (0, 5));
        assert_eq!(measure_prefix_line_col(&g, 6, 5), (1, 1));
        let g: Vec<&str> = "ab\ncd".graphemes(true).collect();
        assert_eq!(measure_prefix_line_col(&g, 5, 80), (1, 2));
        assert_eq!(measure_total_lines("ab\ncd", 80), 2);
        assert_eq!(measure_total_lines("", 80), 1);
    }

    #[test]
    fn truncation_marks_cut() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("a longer prompt", 6), "a lon~");
    }

    #[test]
    fn idle_screen_offers_suggestions() {
        let mut app = app_with(MockClient::default());
        let s = screen(&mut app);
        assert!(s.contains(GREETING));
        assert!(s.contains(SUGGESTED_PROMPTS[0]));
        assert!(s.contains(EMPTY_HISTORY));
    }

    #[test]
    fn result_screen_shows_prompt_and_reply() {
        let mut app = app_with(MockClient::default());
        app.insert_text("tell me something");
        app.on_sent(None);
        assert!(screen(&mut app).contains("Thinking"));
        settle_one(&mut app);
        crate::app::tests::reveal_all(&mut app, std::time::Instant::now());
        let s = screen(&mut app);
        assert!(s.contains("tell me something"));
        assert!(s.contains("re: tell me something"));
        assert!(!s.contains("<b>"));
    }

    #[test]
    fn transcript_view_lists_turns() {
        let mut app = app_with(MockClient::default());
        app.on_sent(Some("first".into()));
        settle_one(&mut app);
        app.show_transcript = true;
        let s = screen(&mut app);
        assert!(s.contains("| first"));
        assert!(s.contains("> re: first"));
    }
}
