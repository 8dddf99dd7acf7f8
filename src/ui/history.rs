//! Conversation history display: role-styled message blocks rendered from
//! the bottom so the newest content is always in view.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

use crate::session::{Conversation, Message, Role};

/// Two visual treatments: the user's own messages, and everything else.
fn content_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::Blue),
        Role::Assistant | Role::System => Style::default().fg(Color::Green),
    }
}

/// Lazy, restartable sequence of styled line blocks, one per message, in
/// stored order.
pub fn message_blocks(
    conversation: &Conversation,
    width: u16,
) -> impl Iterator<Item = Vec<Line<'static>>> + '_ {
    conversation
        .messages
        .iter()
        .map(move |message| render_message(message, width))
}

fn render_message(message: &Message, width: u16) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let timestamp = message
        .timestamp
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    let header = format!("{} {} {}", message.role, timestamp, "─".repeat(16));
    lines.push(Line::from(vec![Span::styled(
        header,
        Style::default().fg(Color::DarkGray),
    )]));

    let style = content_style(message.role);
    for content_line in wrap_text(&message.content, width.saturating_sub(2) as usize) {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, style),
        ]));
    }

    lines
}

/// Wrap text to fit within the given width
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();

        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();
            if !current_line.is_empty()
                && current_line.chars().count() + word_len + 1 > width
            {
                lines.push(std::mem::take(&mut current_line));
            }

            // A single token wider than the pane is hard-split so no part
            // of it falls off the edge.
            if word_len > width {
                let chars: Vec<char> = word.chars().collect();
                for chunk in chars.chunks(width) {
                    let piece: String = chunk.iter().collect();
                    if chunk.len() == width {
                        lines.push(piece);
                    } else {
                        current_line = piece;
                    }
                }
                continue;
            }

            if !current_line.is_empty() {
                current_line.push(' ');
            }
            current_line.push_str(word);
        }

        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Render wrapper for the active conversation's history pane
pub struct HistoryView<'a> {
    pub conversation: Option<&'a Conversation>,
    pub streaming: bool,
}

impl Widget for HistoryView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = self
            .conversation
            .map(|c| c.title.clone())
            .unwrap_or_else(|| "Parley".to_string());
        let block = Block::default().borders(Borders::ALL).title(title);

        let inner = block.inner(area);
        block.render(area, buf);

        let Some(conversation) = self.conversation else {
            let welcome = Line::from(vec![Span::styled(
                "Type below to start a conversation.",
                Style::default().fg(Color::Gray),
            )]);
            buf.set_line(inner.x, inner.y, &welcome, inner.width);
            return;
        };

        let mut all_lines: Vec<Line> = Vec::new();
        for block_lines in message_blocks(conversation, inner.width) {
            all_lines.extend(block_lines);
            all_lines.push(Line::from(vec![Span::raw("")]));
        }

        // While streaming, mark the growing trailing message with a cursor.
        if self.streaming {
            // Drop the spacer so the cursor sits under the last content line.
            all_lines.pop();
            all_lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled("▋", Style::default().fg(Color::Yellow)),
            ]));
        }

        // Show the newest content: take a window from the bottom.
        let height = inner.height as usize;
        let start = all_lines.len().saturating_sub(height);
        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(inner.x, inner.y + i as u16, line, inner.width);
        }
    }
}
