use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::{App, ChatRole, FocusPane, InputMode, SendState, EXCERPT_LIMIT};
use crate::theme::Palette;

/// The input box grows with its content up to this many text rows, then
/// scrolls internally.
const INPUT_MAX_ROWS: u16 = 5;

pub const SOURCES_IDLE_PLACEHOLDER: &str = "Sources for answers will appear here.";
pub const SOURCES_EMPTY_PLACEHOLDER: &str = "No specific sources for this answer.";

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let palette = app.theme.palette();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area, &palette);

    // Body: chat column on the left, sources panel on the right
    let [chat_column, sources_area] =
        Layout::horizontal([Constraint::Percentage(70), Constraint::Percentage(30)])
            .areas(body_area);

    let input_height = input_box_height(&app.input, chat_column.width.saturating_sub(2));
    let [messages_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(input_height)])
            .areas(chat_column);

    render_messages(app, frame, messages_area, &palette);
    render_input(app, frame, input_area, &palette);
    render_sources(app, frame, sources_area, &palette);

    render_footer(app, frame, footer_area, &palette);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let busy = if app.send_state == SendState::Sending {
        " [waiting for answer]"
    } else {
        ""
    };

    let title = Line::from(vec![
        Span::styled(" Document Assistant ", palette.header.bold()),
        Span::styled(busy, palette.dim),
        Span::raw(" "),
        Span::styled(app.theme.indicator(), palette.dim),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            palette.dim,
        ),
    ]);

    let header = Paragraph::new(title).style(palette.header);
    frame.render_widget(header, area);
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let focused = app.focus == FocusPane::Chat && app.input_mode == InputMode::Normal;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Chat ")
        .border_style(if focused {
            palette.border_focused
        } else {
            palette.border
        });

    let inner = block.inner(area);
    app.chat_area = Some(inner);
    app.chat_height = inner.height;
    app.chat_width = inner.width;

    let mut lines: Vec<Line> = Vec::new();
    for msg in &app.messages {
        let (label, style) = match msg.role {
            ChatRole::User => ("You:", palette.user.add_modifier(Modifier::BOLD)),
            ChatRole::Assistant => ("Assistant:", palette.assistant.add_modifier(Modifier::BOLD)),
            ChatRole::System => ("--", palette.system),
        };
        lines.push(Line::from(Span::styled(label, style)));

        let body_style = match msg.role {
            ChatRole::User => palette.user,
            ChatRole::Assistant => palette.assistant,
            ChatRole::System => palette.system,
        };
        for content_line in msg.content.lines() {
            lines.push(Line::from(Span::styled(content_line.to_string(), body_style)));
        }
        lines.push(Line::default());
    }

    if app.send_state == SendState::Sending {
        lines.push(Line::from(Span::styled(
            "Assistant:",
            palette.assistant.add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            thinking_indicator(app.animation_frame),
            palette.dim,
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let editing = app.input_mode == InputMode::Editing;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Ask a question ")
        .border_style(if editing {
            palette.border_focused
        } else {
            palette.border
        });

    let inner = block.inner(area);
    let width = inner.width.max(1) as usize;

    // Keep the cursor row in view once the box has hit its height cap
    let cursor_row = (app.cursor / width) as u16;
    let scroll = cursor_row.saturating_sub(inner.height.saturating_sub(1));

    let paragraph = Paragraph::new(app.input.as_str())
        .style(palette.text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);

    if editing {
        let cursor_col = (app.cursor % width) as u16;
        frame.set_cursor_position(Position::new(
            inner.x + cursor_col,
            inner.y + cursor_row - scroll,
        ));
    }
}

fn render_sources(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let focused = app.focus == FocusPane::Sources && app.input_mode == InputMode::Normal;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Sources ")
        .border_style(if focused {
            palette.border_focused
        } else {
            palette.border
        });

    let inner = block.inner(area);
    app.sources_area = Some(inner);
    app.sources_height = inner.height;
    app.sources_width = inner.width;

    let lines = source_lines(&app.sources, has_assistant_reply(app), palette);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.sources_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let key_style = Style::default().add_modifier(Modifier::REVERSED);
    let label_style = palette.dim;

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" browse ", label_style),
            Span::styled(" ^N ", key_style),
            Span::styled(" new chat ", label_style),
            Span::styled(" ^T ", key_style),
            Span::styled(" theme ", label_style),
            Span::styled(" ^C ", key_style),
            Span::styled(" quit ", label_style),
        ],
        InputMode::Normal => vec![
            Span::styled(" i ", key_style),
            Span::styled(" write ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" focus ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" n ", key_style),
            Span::styled(" new chat ", label_style),
            Span::styled(" t ", key_style),
            Span::styled(" theme ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

/// Lines for the sources panel: one numbered, filename-titled entry per
/// source, or a placeholder. The placeholder depends on whether the
/// transcript has an answer yet: before the first one the panel explains
/// itself, after an answer without sources it says so.
fn source_lines(
    sources: &[crate::api::SourceRef],
    has_reply: bool,
    palette: &Palette,
) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = Vec::new();

    if sources.is_empty() {
        let placeholder = if has_reply {
            SOURCES_EMPTY_PLACEHOLDER
        } else {
            SOURCES_IDLE_PLACEHOLDER
        };
        lines.push(Line::from(Span::styled(placeholder, palette.dim)));
        return lines;
    }

    for (index, source) in sources.iter().enumerate() {
        lines.push(Line::from(Span::styled(
            format!("Source {}: {}", index + 1, file_name(&source.source)),
            palette.text.add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            truncate_excerpt(&source.content),
            palette.text,
        )));
        lines.push(Line::default());
    }

    lines
}

fn thinking_indicator(frame: u8) -> String {
    let dots = (frame as usize % 3) + 1;
    format!("Thinking{}", ".".repeat(dots))
}

fn has_assistant_reply(app: &App) -> bool {
    app.messages.iter().any(|m| m.role == ChatRole::Assistant)
}

/// Trailing path segment, as shown in the sources panel.
fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// At most `EXCERPT_LIMIT` characters of an excerpt, with an ellipsis when cut.
fn truncate_excerpt(content: &str) -> String {
    if content.chars().count() > EXCERPT_LIMIT {
        let cut: String = content.chars().take(EXCERPT_LIMIT).collect();
        format!("{}...", cut)
    } else {
        content.to_string()
    }
}

/// Input box height (including borders): grows with wrapped content up to
/// the row cap, then the content scrolls.
fn input_box_height(input: &str, inner_width: u16) -> u16 {
    let width = inner_width.max(1) as usize;

    let mut rows: u16 = 0;
    for line in input.lines() {
        let char_count = line.chars().count();
        rows += ((char_count / width) + 1) as u16;
    }

    rows.max(1).min(INPUT_MAX_ROWS) + 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SourceRef;
    use crate::theme::Theme;

    fn refs(n: usize) -> Vec<SourceRef> {
        (0..n)
            .map(|i| SourceRef {
                source: format!("documents/doc{}.pdf", i),
                content: format!("excerpt {}", i),
            })
            .collect()
    }

    #[test]
    fn test_source_lines_are_one_indexed_with_filenames() {
        let palette = Theme::Light.palette();
        let sources = refs(3);

        let lines = source_lines(&sources, true, &palette);

        // Title, excerpt, and a blank line per source
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0].spans[0].content, "Source 1: doc0.pdf");
        assert_eq!(lines[1].spans[0].content, "excerpt 0");
        assert_eq!(lines[3].spans[0].content, "Source 2: doc1.pdf");
        assert_eq!(lines[6].spans[0].content, "Source 3: doc2.pdf");
    }

    #[test]
    fn test_source_lines_truncate_long_excerpts() {
        let palette = Theme::Light.palette();
        let sources = vec![SourceRef {
            source: "a/b/long.pdf".to_string(),
            content: "y".repeat(EXCERPT_LIMIT + 10),
        }];

        let lines = source_lines(&sources, true, &palette);

        assert_eq!(lines[0].spans[0].content, "Source 1: long.pdf");
        let excerpt = &lines[1].spans[0].content;
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.chars().count(), EXCERPT_LIMIT + 3);
    }

    #[test]
    fn test_source_lines_placeholder_before_first_answer() {
        let palette = Theme::Light.palette();
        let lines = source_lines(&[], false, &palette);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].spans[0].content, SOURCES_IDLE_PLACEHOLDER);
    }

    #[test]
    fn test_source_lines_placeholder_for_answer_without_sources() {
        let palette = Theme::Light.palette();
        let lines = source_lines(&[], true, &palette);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].spans[0].content, SOURCES_EMPTY_PLACEHOLDER);
    }

    #[test]
    fn test_file_name_takes_trailing_segment() {
        assert_eq!(file_name("./documents/doc1.pdf"), "doc1.pdf");
        assert_eq!(file_name("doc2.pdf"), "doc2.pdf");
        assert_eq!(file_name("a/b/c/notes.txt"), "notes.txt");
    }

    #[test]
    fn test_truncate_excerpt_short_is_untouched() {
        assert_eq!(truncate_excerpt("short excerpt"), "short excerpt");
    }

    #[test]
    fn test_truncate_excerpt_exactly_at_limit() {
        let exact: String = "x".repeat(EXCERPT_LIMIT);
        assert_eq!(truncate_excerpt(&exact), exact);
    }

    #[test]
    fn test_truncate_excerpt_cuts_by_chars_not_bytes() {
        let long: String = "é".repeat(EXCERPT_LIMIT + 50);
        let truncated = truncate_excerpt(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), EXCERPT_LIMIT + 3);
    }

    #[test]
    fn test_input_box_grows_then_caps() {
        // Empty input: one row plus borders
        assert_eq!(input_box_height("", 40), 3);
        // A line wrapping over two rows
        assert_eq!(input_box_height(&"x".repeat(50), 40), 4);
        // Far past the cap: stays at the cap
        assert_eq!(input_box_height(&"x".repeat(4000), 40), INPUT_MAX_ROWS + 2);
    }

    #[test]
    fn test_thinking_indicator_cycles_dots() {
        assert_eq!(thinking_indicator(0), "Thinking.");
        assert_eq!(thinking_indicator(1), "Thinking..");
        assert_eq!(thinking_indicator(2), "Thinking...");
    }
}
