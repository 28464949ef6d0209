use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use ratatui::layout::Rect;

use crate::api::{ChatClient, ChatReply, SourceRef};
use crate::config::Config;
use crate::theme::Theme;

pub const GREETING: &str = "New conversation started. How can I help?";
pub const WELCOME: &str = "Hello! Ask me anything about the indexed documents.";

/// Source excerpts longer than this many characters are shown cut, with an
/// ellipsis appended.
pub const EXCERPT_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Sources,
}

/// Admission gate for the backend: at most one request in flight. A submit
/// while `Sending` is silently ignored rather than queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Idle,
    Sending,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// Everything the handler needs to fire one request. Produced by
/// `App::submit` so the guard and the UI effects stay in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub question: String,
    pub conversation_id: String,
    pub epoch: u64,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub theme: Theme,

    // Conversation state
    pub conversation_id: String,
    pub send_state: SendState,
    pub messages: Vec<ChatMessage>,
    pub sources: Vec<SourceRef>,
    // Bumped on every reset; replies from an earlier epoch are dropped.
    epoch: u64,

    // Input state
    pub input: String,
    pub cursor: usize, // char index into input

    // Scroll state
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub sources_scroll: u16,
    pub sources_height: u16,
    pub sources_width: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for the thinking dots

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub sources_area: Option<Rect>,

    // Where theme changes are persisted; `None` means the user config file.
    pub config_path: Option<PathBuf>,

    pub client: ChatClient,
}

impl App {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let theme = config
            .theme
            .as_deref()
            .and_then(Theme::from_str)
            .unwrap_or(Theme::Light);

        let client = ChatClient::new(&config.resolve_api_url())?;

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Chat,
            theme,

            conversation_id: "default".to_string(),
            send_state: SendState::Idle,
            messages: vec![ChatMessage {
                role: ChatRole::System,
                content: WELCOME.to_string(),
            }],
            sources: Vec::new(),
            epoch: 0,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            sources_scroll: 0,
            sources_height: 0,
            sources_width: 0,

            animation_frame: 0,

            chat_area: None,
            sources_area: None,

            config_path: None,

            client,
        })
    }

    pub fn push_message(&mut self, role: ChatRole, content: String) {
        self.messages.push(ChatMessage { role, content });
        self.scroll_chat_to_bottom();
    }

    /// Accept the current input for sending. Returns `None` (and changes
    /// nothing) when the trimmed input is empty or a request is in flight.
    pub fn submit(&mut self) -> Option<PendingRequest> {
        let question = self.input.trim().to_string();
        if question.is_empty() || self.send_state == SendState::Sending {
            return None;
        }

        self.push_message(ChatRole::User, question.clone());
        self.input.clear();
        self.cursor = 0;
        self.send_state = SendState::Sending;
        self.scroll_chat_to_bottom();

        Some(PendingRequest {
            question,
            conversation_id: self.conversation_id.clone(),
            epoch: self.epoch,
        })
    }

    pub fn apply_reply(&mut self, epoch: u64, reply: ChatReply) {
        self.send_state = SendState::Idle;
        if epoch != self.epoch {
            // Answer to a conversation that was reset while it was in
            // flight. Don't render it into the new one.
            return;
        }

        self.push_message(ChatRole::Assistant, reply.response);
        self.sources = reply.source_documents;
        self.sources_scroll = 0;

        if let Some(id) = reply.conversation_id {
            self.conversation_id = id;
        }
    }

    pub fn apply_error(&mut self, epoch: u64, message: &str) {
        self.send_state = SendState::Idle;
        if epoch != self.epoch {
            return;
        }

        self.push_message(ChatRole::System, format!("Error: {}", message));
    }

    /// Reset the transcript and sources and start a fresh conversation id.
    /// A request still in flight is not cancelled; its reply is dropped by
    /// the epoch guard.
    pub fn new_conversation(&mut self) {
        self.epoch += 1;
        self.conversation_id = next_conversation_id();
        self.messages = vec![ChatMessage {
            role: ChatRole::System,
            content: GREETING.to_string(),
        }];
        self.sources.clear();
        self.chat_scroll = 0;
        self.sources_scroll = 0;
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        let _ = match &self.config_path {
            Some(path) => {
                let mut config = Config::load_from(path).unwrap_or_else(|_| Config::new());
                config.theme = Some(self.theme.as_str().to_string());
                config.save_to(path)
            }
            None => Config::save_theme(self.theme.as_str()),
        };
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.send_state == SendState::Sending {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat scrolling
    pub fn chat_scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn chat_scroll_down(&mut self, lines: u16) {
        let max = self.chat_line_count().saturating_sub(self.chat_height);
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
    }

    pub fn sources_scroll_up(&mut self, lines: u16) {
        self.sources_scroll = self.sources_scroll.saturating_sub(lines);
    }

    pub fn sources_scroll_down(&mut self, lines: u16) {
        let max = self.sources_line_count().saturating_sub(self.sources_height);
        self.sources_scroll = self.sources_scroll.saturating_add(lines).min(max);
    }

    /// Scroll chat so the latest message (or the thinking indicator) is
    /// visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        let total_lines = self.chat_line_count();
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.chat_scroll = 0;
        }
    }

    fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.messages {
            total_lines += 1; // Role line ("You:" / "Assistant:" / "--")
            for line in msg.content.lines() {
                // Character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.send_state == SendState::Sending {
            total_lines += 2; // "Assistant:" + thinking dots
        }

        total_lines
    }

    fn sources_line_count(&self) -> u16 {
        let wrap_width = if self.sources_width > 0 {
            self.sources_width as usize
        } else {
            30
        };

        if self.sources.is_empty() {
            return 1; // Placeholder
        }

        let mut total_lines: u16 = 0;
        for source in &self.sources {
            // Title line, possibly wrapped
            let title_chars = "Source 0: ".len() + source.source.chars().count();
            total_lines += ((title_chars / wrap_width) + 1) as u16;
            // Excerpt as rendered, i.e. after the ellipsis cut
            let excerpt_chars = source.content.chars().count().min(EXCERPT_LIMIT + 3);
            total_lines += ((excerpt_chars / wrap_width) + 1) as u16;
            total_lines += 1; // Blank line after entry
        }

        total_lines
    }
}

fn next_conversation_id() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .to_string()
}
