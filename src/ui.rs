use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use codereel::playback::{Phase, PlaybackStatus};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 2;
const CURSOR: &str = "▌";

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let status = self.controller.status();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Min(3),    // code panel
                Constraint::Length(1), // status
                Constraint::Length(1), // key hints
            ])
            .split(area);

        header(&status, chunks[0].width).render(chunks[0], buf);
        self.code_panel(&status, chunks[1], buf);
        self.status_line(&status).render(chunks[2], buf);

        Paragraph::new(Span::styled(
            "←/→ navigate  1-9 jump  space pause  +/- speed  m sound  q quit",
            Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    }
}

fn header(status: &PlaybackStatus, width: u16) -> Paragraph<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let position = format!("{}/{}", status.index + 1, status.count);
    let used = status.title.width() + position.width();
    let padding = (width as usize).saturating_sub(used).max(1);

    Paragraph::new(Line::from(vec![
        Span::styled(status.title.clone(), bold.fg(Color::Cyan)),
        Span::raw(" ".repeat(padding)),
        Span::styled(position, Style::default().fg(Color::Magenta)),
    ]))
}

fn phase_style(phase: Phase) -> Style {
    let color = match phase {
        Phase::Idle => Color::Gray,
        Phase::Typing => Color::Green,
        Phase::Paused(_) => Color::Yellow,
        Phase::Completed => Color::Blue,
        Phase::Error => Color::Red,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

impl App {
    fn code_panel(&self, status: &PlaybackStatus, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", self.screen.language()))
            .border_style(Style::default().fg(Color::DarkGray));
        let inner_height = block.inner(area).height as usize;

        let text = self.screen.text();
        let mut lines: Vec<Line> = text.split('\n').map(|l| Line::raw(l.to_string())).collect();
        if matches!(status.phase, Phase::Typing | Phase::Paused(_)) {
            if let Some(last) = lines.last_mut() {
                last.push_span(Span::styled(CURSOR, Style::default().fg(Color::Green)));
            }
        }

        // Follow the cursor once the code outgrows the panel
        let offset = lines.len().saturating_sub(inner_height) as u16;
        Paragraph::new(lines)
            .block(block)
            .scroll((offset, 0))
            .render(area, buf);
    }

    fn status_line(&self, status: &PlaybackStatus) -> Paragraph<'static> {
        let dim = Style::default().add_modifier(Modifier::DIM);
        let mut spans = vec![
            Span::styled(status.phase.label().to_uppercase(), phase_style(status.phase)),
            Span::styled(format!("  {}/{} chars", status.typed, status.total), dim),
            Span::styled(
                format!("  {:.0}ms/char", self.controller.base_delay_ms()),
                dim,
            ),
            Span::styled(
                if self.sound.is_enabled() {
                    "  sound on"
                } else {
                    "  sound off"
                },
                dim,
            ),
        ];
        if !status.auto_rotate {
            spans.push(Span::styled("  rotation off", dim));
        } else if status.interacting {
            spans.push(Span::styled("  rotation held", dim));
        }
        if status.phase == Phase::Error {
            spans.push(Span::styled(
                "  navigate to continue",
                Style::default().fg(Color::Red),
            ));
        }

        Paragraph::new(Line::from(spans))
    }
}
