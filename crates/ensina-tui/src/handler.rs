use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::App;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => insert_str(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c') if ctrl => app.should_quit = true,

        // Stop generation
        KeyCode::Esc => {
            app.stop();
            app.view.clear_selection();
        }

        // Pick a message for copy/edit
        KeyCode::Up if ctrl => app.view.select_prev(),
        KeyCode::Down if ctrl => app.view.select_next(),

        // Edit a question (cancels a reply in flight)
        KeyCode::Char('e') if ctrl => {
            app.edit_selected();
        }

        // Copy a message's source text
        KeyCode::Char('y') if ctrl => {
            if let Some(text) = app.copy_source() {
                app.status = Some(match copy_to_clipboard(text) {
                    Ok(()) => "Copied".to_string(),
                    Err(e) => format!("Copy failed: {}", e),
                });
            }
        }

        // Alt+Enter / Shift+Enter insert a newline; plain Enter sends
        KeyCode::Enter
            if key.modifiers.intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) =>
        {
            insert_str(app, "\n");
        }
        KeyCode::Enter => {
            app.submit();
        }

        // Chat scrolling
        KeyCode::Up => app.view.scroll_up(1),
        KeyCode::Down => app.view.scroll_down(1),
        KeyCode::PageUp => app.view.scroll_up(app.view.height.max(2) / 2),
        KeyCode::PageDown => app.view.scroll_down(app.view.height.max(2) / 2),

        // Composer editing
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) if !ctrl => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

fn insert_str(app: &mut App, text: &str) {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let byte_pos = char_to_byte_index(&app.input, app.cursor);
    app.input.insert_str(byte_pos, &text);
    app.cursor += text.chars().count();
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.view.scroll_up(3),
        MouseEventKind::ScrollDown => app.view.scroll_down(3),
        _ => {}
    }
}

/// Pipe `text` into the first clipboard tool that is available
fn copy_to_clipboard(text: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::process::{Command, Stdio};

    const TOOLS: &[(&str, &[&str])] = &[
        ("pbcopy", &[]),
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
    ];

    let mut last_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no clipboard tool found");
    for (program, args) in TOOLS {
        match Command::new(program).args(*args).stdin(Stdio::piped()).spawn() {
            Ok(mut child) => {
                if let Some(mut stdin) = child.stdin.take() {
                    stdin.write_all(text.as_bytes())?;
                }
                child.wait()?;
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(program, error = %e, "clipboard tool unavailable");
                last_err = e;
            }
        }
    }
    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use ensina_core::{ChatClient, Locale, Role};

    fn key(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c), KeyModifiers::NONE));
        }
    }

    fn app() -> App {
        // Nothing listens here; requests fail in the background
        let client = Arc::new(ChatClient::new("http://127.0.0.1:9"));
        App::new(client, Locale::En).0
    }

    #[tokio::test]
    async fn test_editing_is_utf8_safe() {
        let mut app = app();
        type_text(&mut app, "açaí");
        handle_event(&mut app, key(KeyCode::Left, KeyModifiers::NONE));
        handle_event(&mut app, key(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(app.input, "açí");
        assert_eq!(app.cursor, 2);

        handle_event(&mut app, key(KeyCode::Home, KeyModifiers::NONE));
        handle_event(&mut app, key(KeyCode::Delete, KeyModifiers::NONE));
        assert_eq!(app.input, "çí");
    }

    #[tokio::test]
    async fn test_enter_on_blank_input_does_nothing() {
        let mut app = app();
        type_text(&mut app, "   ");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));
        assert!(app.assembler.conversation().is_empty());
        assert_eq!(app.input, "   ");
    }

    #[tokio::test]
    async fn test_enter_submits_and_esc_stops() {
        let mut app = app();
        type_text(&mut app, "Hello");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));

        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert!(app.is_generating());
        assert_eq!(app.assembler.conversation().len(), 2);
        assert_eq!(app.view.mounted(), 2);
        assert!(app.is_waiting_for_first_token());

        // Send is unavailable while a reply is in flight
        type_text(&mut app, "again");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(app.assembler.conversation().len(), 2);
        assert_eq!(app.input, "again");

        handle_event(&mut app, key(KeyCode::Esc, KeyModifiers::NONE));
        assert!(!app.is_generating());
        let reply = &app.assembler.conversation().messages()[1];
        assert_eq!(reply.content, Locale::En.interrupted_notice());
    }

    #[tokio::test]
    async fn test_alt_enter_inserts_newline() {
        let mut app = app();
        type_text(&mut app, "a");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::ALT));
        type_text(&mut app, "b");
        assert_eq!(app.input, "a\nb");
        assert!(app.assembler.conversation().is_empty());
    }

    #[tokio::test]
    async fn test_paste_normalizes_line_endings() {
        let mut app = app();
        handle_event(&mut app, AppEvent::Paste("one\r\ntwo".to_string()));
        assert_eq!(app.input, "one\ntwo");
        assert_eq!(app.cursor, 7);
    }

    /// Two exchanges, both stopped: [user "first", reply, user "second", reply]
    fn two_exchanges() -> App {
        let mut app = app();
        for text in ["first", "second"] {
            type_text(&mut app, text);
            handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));
            handle_event(&mut app, key(KeyCode::Esc, KeyModifiers::NONE));
        }
        assert_eq!(app.assembler.conversation().len(), 4);
        app
    }

    fn select_up(app: &mut App, times: usize) {
        for _ in 0..times {
            handle_event(app, key(KeyCode::Up, KeyModifiers::CONTROL));
        }
    }

    #[tokio::test]
    async fn test_ctrl_e_edits_an_earlier_selected_question() {
        let mut app = two_exchanges();
        select_up(&mut app, 4);
        assert_eq!(app.view.selected(), Some(0));

        handle_event(&mut app, key(KeyCode::Char('e'), KeyModifiers::CONTROL));

        assert_eq!(app.input, "first");
        assert_eq!(app.cursor, 5);
        assert_eq!(app.view.selected(), None);
        let messages = app.assembler.conversation().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[1].content, "second");
    }

    #[tokio::test]
    async fn test_ctrl_e_on_a_reply_changes_nothing() {
        let mut app = two_exchanges();
        select_up(&mut app, 3);
        assert_eq!(app.view.selected(), Some(1));

        handle_event(&mut app, key(KeyCode::Char('e'), KeyModifiers::CONTROL));

        assert!(app.input.is_empty());
        assert!(app.status.is_some());
        assert_eq!(app.assembler.conversation().len(), 4);
    }

    #[tokio::test]
    async fn test_copy_source_follows_the_selection() {
        let mut app = two_exchanges();
        assert_eq!(app.copy_source(), Some(Locale::En.interrupted_notice()));

        select_up(&mut app, 2);
        assert_eq!(app.copy_source(), Some("second"));

        select_up(&mut app, 2);
        assert_eq!(app.copy_source(), Some("first"));

        handle_event(&mut app, key(KeyCode::Down, KeyModifiers::CONTROL));
        handle_event(&mut app, key(KeyCode::Down, KeyModifiers::CONTROL));
        assert_eq!(app.copy_source(), Some("second"));
    }

    #[tokio::test]
    async fn test_ctrl_e_without_selection_edits_last_question() {
        let mut app = app();
        type_text(&mut app, "first try");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));
        handle_event(&mut app, key(KeyCode::Char('e'), KeyModifiers::CONTROL));

        assert_eq!(app.input, "first try");
        assert_eq!(app.cursor, 9);
        assert!(!app.is_generating());
        let messages = app.assembler.conversation().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_ctrl_c_quits() {
        let mut app = app();
        handle_event(&mut app, key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
        assert!(app.input.is_empty());
    }
}
