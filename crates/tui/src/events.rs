use std::time::{Duration, Instant};

use chat_core::ModelClient;
use crossterm::event::{self, Event, MouseEventKind};
use ratatui::{backend::Backend, Terminal};
use tracing::info;

use crate::app::{App, Focus};
use crate::ui;

/// Short enough that the 50 ms reveal cadence is kept.
const POLL: Duration = Duration::from_millis(25);
const HEARTBEAT: Duration = Duration::from_millis(500);

pub fn run<B: Backend, C: ModelClient + 'static>(
    terminal: &mut Terminal<B>,
    app: &mut App<C>,
) -> anyhow::Result<()> {
    let mut last_draw = Instant::now();
    loop {
        if app.dirty || last_draw.elapsed() >= HEARTBEAT {
            terminal.draw(|f| ui::draw(f, app))?;
            app.dirty = false;
            last_draw = Instant::now();
        }
        if matches!(app.focus, Focus::Input) && app.model_picker.is_none() {
            let _ = terminal.show_cursor();
        } else {
            let _ = terminal.hide_cursor();
        }

        if event::poll(POLL)? {
            match event::read()? {
                Event::Key(key) => app.on_key(key),
                Event::Paste(s) => {
                    // Pasted newlines are text, never a submit.
                    app.insert_text(&s.replace("\r\n", "\n").replace('\r', "\n"));
                }
                Event::Resize(_, _) => app.dirty = true,
                Event::Mouse(me) => match me.kind {
                    MouseEventKind::ScrollUp => {
                        app.chat_scroll = app.chat_scroll.saturating_add(3);
                        app.dirty = true;
                    }
                    MouseEventKind::ScrollDown => {
                        app.chat_scroll = app.chat_scroll.saturating_sub(3);
                        app.dirty = true;
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        app.on_tick();

        if app.should_quit {
            info!(target: "tui", "quit requested");
            break;
        }
    }
    Ok(())
}
