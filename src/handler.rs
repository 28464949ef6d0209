use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

use crate::app::{App, FocusPane, InputMode, PendingRequest};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent, tx: &UnboundedSender<AppEvent>) {
    match event {
        AppEvent::Key(key) => handle_key(app, key, tx),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::Chat(epoch, result) => match result {
            Ok(reply) => app.apply_reply(epoch, reply),
            Err(err) => app.apply_error(epoch, &err.to_string()),
        },
    }
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('n') => {
                app.new_conversation();
                return;
            }
            KeyCode::Char('t') => {
                app.toggle_theme();
                return;
            }
            _ => {}
        }
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key, tx),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Back to the input box
        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.cursor = app.input.chars().count();
        }

        KeyCode::Char('n') => app.new_conversation(),
        KeyCode::Char('t') => app.toggle_theme(),

        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Chat => FocusPane::Sources,
                FocusPane::Sources => FocusPane::Chat,
            };
        }

        // Scroll the focused pane
        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Chat => app.chat_scroll_down(1),
            FocusPane::Sources => app.sources_scroll_down(1),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Chat => app.chat_scroll_up(1),
            FocusPane::Sources => app.sources_scroll_up(1),
        },

        // Half-page scroll for chat
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.chat_scroll_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.chat_scroll_up(app.chat_height / 2);
        }

        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            if let Some(pending) = app.submit() {
                spawn_request(app, pending, tx);
            }
        }
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
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

fn spawn_request(app: &App, pending: PendingRequest, tx: &UnboundedSender<AppEvent>) {
    let client = app.client.clone();
    let tx = tx.clone();
    let PendingRequest {
        question,
        conversation_id,
        epoch,
    } = pending;

    tokio::spawn(async move {
        let result = client.ask(&question, &conversation_id).await;
        let _ = tx.send(AppEvent::Chat(epoch, result));
    });
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    // Position-based scrolling: the wheel moves the pane under the cursor
    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_sources = app
        .sources_area
        .map(|r| point_in_rect(x, y, r))
        .unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.chat_scroll_down(3);
            } else if in_sources {
                app.sources_scroll_down(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.chat_scroll_up(3);
            } else if in_sources {
                app.sources_scroll_up(3);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{ChatRole, SendState};
    use crate::api::{ChatReply, SourceRef};
    use crate::config::Config;
    use tokio::sync::mpsc;

    fn test_app() -> App {
        App::new(&Config::new()).unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        let s = "héllo";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 1), 1);
        assert_eq!(char_to_byte_index(s, 2), 3); // 'é' is two bytes
        assert_eq!(char_to_byte_index(s, 99), s.len());
    }

    #[test]
    fn test_editing_inserts_at_cursor() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app();

        for c in "héllo".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)), &tx);
        }
        handle_key(&mut app, key(KeyCode::Left), &tx);
        handle_key(&mut app, key(KeyCode::Left), &tx);
        handle_key(&mut app, key(KeyCode::Char('x')), &tx);

        assert_eq!(app.input, "hélxlo");
        assert_eq!(app.cursor, 4);
    }

    #[test]
    fn test_editing_backspace_and_delete() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app();
        app.input = "café".to_string();
        app.cursor = 4;

        handle_key(&mut app, key(KeyCode::Backspace), &tx);
        assert_eq!(app.input, "caf");

        handle_key(&mut app, key(KeyCode::Home), &tx);
        handle_key(&mut app, key(KeyCode::Delete), &tx);
        assert_eq!(app.input, "af");
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn test_chat_event_success_renders_reply() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app();
        app.input = "question".to_string();
        let pending = app.submit().unwrap();

        let reply = ChatReply {
            response: "answer".to_string(),
            source_documents: vec![SourceRef {
                source: "a/b/doc.pdf".to_string(),
                content: "snippet".to_string(),
            }],
            conversation_id: None,
        };
        handle_event(&mut app, AppEvent::Chat(pending.epoch, Ok(reply)), &tx);

        assert_eq!(app.send_state, SendState::Idle);
        assert_eq!(app.messages.last().unwrap().role, ChatRole::Assistant);
        assert_eq!(app.sources.len(), 1);
    }

    #[test]
    fn test_chat_event_failure_renders_system_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app();
        app.input = "question".to_string();
        let pending = app.submit().unwrap();

        handle_event(
            &mut app,
            AppEvent::Chat(pending.epoch, Err(anyhow::anyhow!("Backend down"))),
            &tx,
        );

        assert_eq!(app.send_state, SendState::Idle);
        let last = app.messages.last().unwrap();
        assert_eq!(last.role, ChatRole::System);
        assert!(last.content.contains("Backend down"));
    }

    #[tokio::test]
    async fn test_enter_while_sending_sends_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // Port 1 refuses immediately, so the spawned request fails fast
        let mut app = App::new(&Config {
            theme: None,
            api_url: Some("http://127.0.0.1:1".to_string()),
        })
        .unwrap();
        app.input = "first".to_string();
        handle_key(&mut app, key(KeyCode::Enter), &tx);
        assert_eq!(app.send_state, SendState::Sending);
        let sent = app.messages.len();

        app.input = "second".to_string();
        handle_key(&mut app, key(KeyCode::Enter), &tx);
        assert_eq!(app.messages.len(), sent);

        // Nothing new is queued synchronously for the second press
        drop(tx);
        let mut chat_events = 0;
        while let Some(event) = rx.recv().await {
            if matches!(event, AppEvent::Chat(..)) {
                chat_events += 1;
            }
        }
        assert!(chat_events <= 1);
    }

    #[test]
    fn test_normal_mode_new_conversation_key() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app();
        app.input_mode = InputMode::Normal;
        let old_id = app.conversation_id.clone();

        handle_key(&mut app, key(KeyCode::Char('n')), &tx);

        assert_eq!(app.messages.len(), 1);
        assert_ne!(app.conversation_id, old_id);
    }

    #[test]
    fn test_point_in_rect() {
        let rect = Rect::new(2, 2, 4, 4);
        assert!(point_in_rect(2, 2, rect));
        assert!(point_in_rect(5, 5, rect));
        assert!(!point_in_rect(6, 2, rect));
        assert!(!point_in_rect(1, 3, rect));
    }
}
