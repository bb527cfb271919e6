use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::warn;

use bizchat_core::Notice;

use crate::app::{App, InputMode, Screen};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key)?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick(),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work on any screen
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    match app.screen {
        Screen::Landing => handle_landing(app, key),
        Screen::Intake => handle_intake(app, key),
        Screen::Chat => match app.input_mode {
            InputMode::Normal => handle_chat_normal(app, key)?,
            InputMode::Editing => handle_chat_editing(app, key),
        },
    }
    Ok(())
}

fn handle_landing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter | KeyCode::Char(' ') => app.get_started(),
        _ => {}
    }
}

fn handle_intake(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.screen = if app.session.is_profile_submitted() {
                Screen::Chat
            } else {
                Screen::Landing
            };
        }
        KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.submit_form();
        }
        KeyCode::Enter => {
            if app.form.is_last_field() {
                app.submit_form();
            } else {
                app.form.next_field();
            }
        }
        KeyCode::Tab | KeyCode::Down => app.form.next_field(),
        KeyCode::BackTab | KeyCode::Up => app.form.prev_field(),
        KeyCode::Backspace => {
            app.form.focused_value_mut().pop();
        }
        KeyCode::Char(c) => {
            app.form.focused_value_mut().push(c);
            app.form.error = None;
        }
        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Back to typing
        KeyCode::Char('i') | KeyCode::Tab | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.selected_message = None;
            app.input_cursor = app.session.pending_input().chars().count();
        }

        // Message selection (for copy)
        KeyCode::Up => app.select_prev_message(),
        KeyCode::Down => app.select_next_message(),
        KeyCode::Esc => app.selected_message = None,

        // Scroll
        KeyCode::Char('k') => app.scroll_up(1),
        KeyCode::Char('j') => app.scroll_down(1),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(app.chat_height / 2);
        }
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(app.chat_height / 2);
        }
        KeyCode::Char('g') => app.scroll_up(u16::MAX),
        KeyCode::Char('G') => app.follow_bottom = true,

        KeyCode::Char('c') => match app.copy_to_clipboard() {
            Ok(true) => app.push_toast(Notice::info("Message copied to clipboard")),
            Ok(false) => app.push_toast(Notice::info("Select an assistant message to copy")),
            Err(e) => {
                warn!(error = %e, "clipboard copy failed");
                app.push_toast(Notice::error("Clipboard is not available"));
            }
        },

        KeyCode::Char('e') => match app.export_transcript() {
            Ok(path) => app.push_toast(Notice::info(format!("Saved {}", path.display()))),
            Err(e) => {
                warn!(error = %e, "transcript export failed");
                app.push_toast(Notice::error("Could not export the conversation"));
            }
        },

        KeyCode::Char('p') => app.edit_profile(),

        _ => {}
    }
    Ok(())
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        // Alt/Shift+Enter adds a line, plain Enter sends
        KeyCode::Enter
            if key.modifiers.intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) =>
        {
            insert_char(app, '\n');
        }
        KeyCode::Enter => {
            app.send_message();
        }
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(app.session.pending_input(), app.input_cursor);
                app.session.input_mut().remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.session.pending_input().chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(app.session.pending_input(), app.input_cursor);
                app.session.input_mut().remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.session.pending_input().chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.session.pending_input().chars().count();
        }
        KeyCode::Char(c) => insert_char(app, c),
        _ => {}
    }
}

fn insert_char(app: &mut App, c: char) {
    let byte_pos = char_to_byte_index(app.session.pending_input(), app.input_cursor);
    app.session.input_mut().insert(byte_pos, c);
    app.input_cursor += 1;
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.screen != Screen::Chat {
        return;
    }
    let in_chat = app
        .chat_area
        .is_some_and(|r| point_in_rect(mouse.column, mouse.row, r));
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}
