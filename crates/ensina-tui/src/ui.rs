use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::app::App;

/// Composer rows shown before it starts scrolling
const MAX_COMPOSER_ROWS: u16 = 6;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let composer_rows = (app.input.split('\n').count() as u16).clamp(1, MAX_COMPOSER_ROWS);

    // Main layout: header, chat, composer, footer
    let [header_area, chat_area, composer_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(composer_rows + 2),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_composer(app, frame, composer_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Ensina ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.base_url.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let border_color = if app.is_generating() { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    // Store inner size for scroll calculations
    let inner = block.inner(area);
    app.view.resize(inner.width, inner.height);

    if app.view.is_empty() {
        let placeholder = Paragraph::new(app.locale().empty_hint())
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let mut lines = app.view.lines();

    // Typing indicator replaces the empty reply until the first token lands
    if app.is_waiting_for_first_token() {
        // Drop the trailing spacer so the indicator sits under the header
        lines.pop();
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("{}{}", app.locale().thinking(), dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    if app.view.follow {
        app.view.scroll_to_bottom();
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.view.scroll, 0));

    frame.render_widget(chat, area);
}

fn render_composer(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.is_generating() { Color::DarkGray } else { Color::Yellow };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);

    let (row, col) = cursor_row_col(&app.input, app.cursor);

    // Keep the cursor row and column visible
    let v_offset = row.saturating_sub(inner.height.saturating_sub(1) as usize);
    let h_offset = col.saturating_sub(inner.width.saturating_sub(1) as usize);

    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::Cyan))
        .block(block)
        .scroll((v_offset as u16, h_offset as u16));
    frame.render_widget(input, area);

    frame.set_cursor_position((
        inner.x + (col - h_offset) as u16,
        inner.y + (row - v_offset) as u16,
    ));
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let disabled_style = Style::default().bg(Color::Black).fg(Color::DarkGray);

    let (send_style, stop_style) = if app.is_generating() {
        (disabled_style, label_style)
    } else if app.can_send() {
        (label_style, disabled_style)
    } else {
        (disabled_style, disabled_style)
    };

    let mut hints = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", send_style),
        Span::styled(" Alt+Enter ", key_style),
        Span::styled(" newline ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" stop ", stop_style),
        Span::styled(" ^↑/^↓ ", key_style),
        Span::styled(" select ", label_style),
        Span::styled(" ^E ", key_style),
        Span::styled(" edit ", label_style),
        Span::styled(" ^Y ", key_style),
        Span::styled(" copy ", label_style),
        Span::styled(" ^C ", key_style),
        Span::styled(" quit ", label_style),
    ];

    if let Some(status) = &app.status {
        hints.push(Span::styled(
            format!(" {} ", status),
            Style::default().bg(Color::Black).fg(Color::Red),
        ));
    }

    let footer = Paragraph::new(Line::from(hints)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

/// Row and column of a char cursor in multi-line input
fn cursor_row_col(input: &str, cursor: usize) -> (usize, usize) {
    let before: String = input.chars().take(cursor).collect();
    let row = before.matches('\n').count();
    let col = before
        .rsplit('\n')
        .next()
        .map(|line| line.chars().count())
        .unwrap_or(0);
    (row, col)
}
