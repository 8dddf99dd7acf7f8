pub mod composer;
pub mod history;

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};
use uuid::Uuid;

use crate::app::App;
use crate::session::Conversation;
use composer::ComposerView;
use history::HistoryView;

/// Draw one frame: sidebar on the left, then history, composer, and the
/// transient notification line.
pub fn draw(frame: &mut Frame, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(20)])
        .split(frame.size());

    frame.render_widget(
        SidebarView {
            conversations: app.conversations(),
            active_id: app.active_id(),
        },
        columns[0],
    );

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(columns[1]);

    frame.render_widget(
        HistoryView {
            conversation: app.active_conversation(),
            streaming: app.is_streaming(),
        },
        main[0],
    );

    frame.render_widget(
        ComposerView {
            composer: app.composer(),
        },
        main[1],
    );

    if let Some(notice) = app.notice() {
        let line = Line::from(vec![Span::styled(
            notice.to_string(),
            Style::default().fg(Color::Red),
        )]);
        frame.render_widget(Paragraph::new(line), main[2]);
    }
}

/// Conversation list in insertion order, active one highlighted
struct SidebarView<'a> {
    conversations: &'a [Conversation],
    active_id: Option<Uuid>,
}

impl Widget for SidebarView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("Conversations");
        let inner = block.inner(area);
        block.render(area, buf);

        if self.conversations.is_empty() {
            let hint = Line::from(vec![Span::styled(
                "Ctrl+N to start",
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner.x, inner.y, &hint, inner.width);
            return;
        }

        for (i, conversation) in self.conversations.iter().enumerate() {
            if i >= inner.height as usize {
                break;
            }

            let is_active = self.active_id == Some(conversation.id);
            let (marker, style) = if is_active {
                (
                    "▶ ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )
            } else {
                ("  ", Style::default().fg(Color::Gray))
            };

            let line = Line::from(vec![
                Span::styled(marker, style),
                Span::styled(conversation.title.clone(), style),
            ]);
            buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
        }
    }
}
