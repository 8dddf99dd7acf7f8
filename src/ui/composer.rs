use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result of feeding a key event to the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    None,
}

/// Text input for the next user message. Cursor position is tracked in
/// characters so multi-byte input edits stay on boundaries.
pub struct Composer {
    content: String,
    cursor: usize,
    placeholder: String,
}

impl Composer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            placeholder: placeholder.into(),
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if !self.content.trim().is_empty() {
                    let content = std::mem::take(&mut self.content);
                    self.cursor = 0;
                    return ComposerResult::Submitted(content);
                }
            }
            KeyCode::Char(c) => {
                self.content.insert(self.byte_index(self.cursor), c);
                self.cursor += 1;
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.content.remove(self.byte_index(self.cursor));
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.char_count() {
                    self.content.remove(self.byte_index(self.cursor));
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.cursor < self.char_count() {
                    self.cursor += 1;
                }
            }
            KeyCode::Home => {
                self.cursor = 0;
            }
            KeyCode::End => {
                self.cursor = self.char_count();
            }
            _ => {}
        }

        ComposerResult::None
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Put text back after a submission the app did not accept, cursor at
    /// the end so the user can keep typing.
    pub fn restore(&mut self, text: String) {
        self.cursor = text.chars().count();
        self.content = text;
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// Byte offset of the given character position
    fn byte_index(&self, char_pos: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    /// Content with the cursor bar spliced in, for rendering
    fn display_text(&self) -> String {
        let mut text = self.content.clone();
        text.insert(self.byte_index(self.cursor), '▌');
        text
    }
}

/// Render wrapper borrowing the composer state
pub struct ComposerView<'a> {
    pub composer: &'a Composer,
}

impl Widget for ComposerView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Message")
            .style(Style::default().fg(Color::Green));

        let inner = block.inner(area);
        block.render(area, buf);

        let line = if self.composer.content.is_empty() {
            Line::from(vec![Span::styled(
                self.composer.placeholder.clone(),
                Style::default().fg(Color::DarkGray),
            )])
        } else {
            Line::from(vec![Span::raw(self.composer.display_text())])
        };
        buf.set_line(inner.x, inner.y, &line, inner.width);
    }
}
