//! Terminal projection of the conversation
//!
//! Each message owns a cached block of styled lines and its wrapped row
//! count. A full repaint rebuilds every block; the streaming path swaps the
//! body of one block.

use ensina_core::{ConversationStore, LineKind, Locale, Message, RenderedContent, Role, StyledSpan, View};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// Wrap width used before the first draw reports the pane size
const DEFAULT_WIDTH: u16 = 50;
const DEFAULT_HEIGHT: u16 = 20;

#[derive(Debug, Clone)]
struct MessageBlock {
    header: Line<'static>,
    body: Vec<Line<'static>>,
    /// Rows after wrapping, spacer included
    rows: usize,
}

impl MessageBlock {
    fn new(header: Line<'static>, body: Vec<Line<'static>>, width: u16) -> Self {
        let mut block = Self { header, body, rows: 0 };
        block.measure(width);
        block
    }

    fn measure(&mut self, width: u16) {
        let width = width.max(1) as usize;
        let wrapped = |line: &Line| line.width().div_ceil(width).max(1);
        // header + body + blank spacer
        self.rows = wrapped(&self.header) + self.body.iter().map(wrapped).sum::<usize>() + 1;
    }
}

#[derive(Debug)]
pub struct ChatView {
    locale: Locale,
    blocks: Vec<MessageBlock>,
    /// Message picked for copy/edit
    selected: Option<usize>,
    /// Top line of the chat pane
    pub scroll: u16,
    /// Keep the newest text in view while streaming
    pub follow: bool,
    // Inner size of the chat pane, updated on every draw
    pub height: u16,
    width: u16,
}

impl ChatView {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            blocks: Vec::new(),
            selected: None,
            scroll: 0,
            follow: true,
            height: 0,
            width: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn mounted(&self) -> usize {
        self.blocks.len()
    }

    /// Record the pane size; row counts are re-measured when the width changes
    pub fn resize(&mut self, width: u16, height: u16) {
        self.height = height;
        if width != self.width {
            self.width = width;
            let wrap = self.wrap_width();
            for block in &mut self.blocks {
                block.measure(wrap);
            }
        }
        self.refresh_scroll();
    }

    /// Every block flattened, with a blank line between messages
    pub fn lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for (i, block) in self.blocks.iter().enumerate() {
            if self.selected == Some(i) {
                lines.push(block.header.clone().patch_style(Style::default().add_modifier(Modifier::REVERSED)));
            } else {
                lines.push(block.header.clone());
            }
            lines.extend(block.body.iter().cloned());
            lines.push(Line::default());
        }
        lines
    }

    /// Body of the block at `index`
    #[cfg(test)]
    pub fn body(&self, index: usize) -> Option<&[Line<'static>]> {
        self.blocks.get(index).map(|b| b.body.as_slice())
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Move the selection one message up; starts from the newest message
    pub fn select_prev(&mut self) {
        if self.blocks.is_empty() {
            return;
        }
        let index = match self.selected {
            Some(i) => i.saturating_sub(1),
            None => self.blocks.len() - 1,
        };
        self.select(index);
    }

    /// Move the selection one message down; past the newest clears it
    pub fn select_next(&mut self) {
        match self.selected {
            Some(i) if i + 1 < self.blocks.len() => self.select(i + 1),
            Some(_) => {
                self.selected = None;
                self.scroll_to_bottom();
            }
            None => {}
        }
    }

    fn select(&mut self, index: usize) {
        self.selected = Some(index);
        // Bring the selected header into view
        let top = self.block_top(index);
        let visible = self.visible_height() as usize;
        let scroll = self.scroll as usize;
        if top < scroll || top >= scroll + visible {
            self.scroll = top.min(self.max_scroll() as usize) as u16;
        }
        self.follow = self.scroll >= self.max_scroll();
    }

    pub fn scroll_up(&mut self, amount: u16) {
        self.scroll = self.scroll.saturating_sub(amount);
        self.follow = false;
    }

    pub fn scroll_down(&mut self, amount: u16) {
        let max = self.max_scroll();
        self.scroll = self.scroll.saturating_add(amount).min(max);
        self.follow = self.scroll >= max;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow = true;
        self.scroll = self.max_scroll();
    }

    /// Total rows after wrapping at the current width
    pub fn total_rows(&self) -> u16 {
        let rows: usize = self.blocks.iter().map(|b| b.rows).sum();
        rows.min(u16::MAX as usize) as u16
    }

    /// First row of the block at `index`
    fn block_top(&self, index: usize) -> usize {
        self.blocks.iter().take(index).map(|b| b.rows).sum()
    }

    fn wrap_width(&self) -> u16 {
        if self.width > 0 { self.width } else { DEFAULT_WIDTH }
    }

    fn visible_height(&self) -> u16 {
        if self.height > 0 { self.height } else { DEFAULT_HEIGHT }
    }

    fn max_scroll(&self) -> u16 {
        self.total_rows().saturating_sub(self.visible_height())
    }

    fn refresh_scroll(&mut self) {
        if self.follow {
            self.scroll = self.max_scroll();
        } else {
            self.scroll = self.scroll.min(self.max_scroll());
        }
    }

    fn block_for(&self, message: &Message) -> MessageBlock {
        let (label, color) = match message.role {
            Role::User => (self.locale.user_label(), Color::Cyan),
            Role::Assistant => (self.locale.assistant_label(), Color::Yellow),
        };

        let header = Line::from(vec![
            Span::styled(
                format!("{}:", label),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" {}", message.timestamp), Style::default().fg(Color::DarkGray)),
        ]);

        let body = match (&message.role, &message.rendered) {
            (Role::Assistant, Some(rendered)) => rendered_lines(rendered),
            _ => message
                .content
                .lines()
                .map(|line| Line::from(line.to_string()))
                .collect(),
        };

        MessageBlock::new(header, body, self.wrap_width())
    }
}

impl View for ChatView {
    fn render_all(&mut self, conversation: &ConversationStore) {
        self.blocks = conversation
            .messages()
            .iter()
            .map(|message| self.block_for(message))
            .collect();
        if self.selected.is_some_and(|i| i >= self.blocks.len()) {
            self.selected = None;
        }
        self.refresh_scroll();
    }

    fn render_incremental(&mut self, index: usize, rendered: &RenderedContent) -> bool {
        let wrap = self.wrap_width();
        let Some(block) = self.blocks.get_mut(index) else {
            return false;
        };
        block.body = rendered_lines(rendered);
        block.measure(wrap);
        self.refresh_scroll();
        true
    }
}

/// Convert a rendered markdown document into styled terminal lines
pub fn rendered_lines(rendered: &RenderedContent) -> Vec<Line<'static>> {
    rendered
        .lines
        .iter()
        .map(|line| {
            let spans = line.spans.iter().map(span_for);
            match &line.kind {
                LineKind::Text => Line::from(spans.collect::<Vec<_>>()),
                LineKind::Heading(_) => Line::from(
                    spans
                        .map(|s| s.patch_style(Style::default().fg(Color::Cyan)))
                        .collect::<Vec<_>>(),
                ),
                LineKind::Bullet => prefixed("  • ".to_string(), Style::default(), spans),
                LineKind::Ordered(marker) => prefixed(format!("  {} ", marker), Style::default(), spans),
                LineKind::Quote => prefixed(
                    "│ ".to_string(),
                    Style::default().fg(Color::DarkGray),
                    spans.map(|s| s.patch_style(Style::default().add_modifier(Modifier::ITALIC))),
                ),
                LineKind::Code => prefixed("  ".to_string(), Style::default(), spans),
                LineKind::Rule => Line::from(Span::styled(
                    "─".repeat(24),
                    Style::default().fg(Color::DarkGray),
                )),
                LineKind::Blank => Line::default(),
            }
        })
        .collect()
}

fn prefixed(
    prefix: String,
    prefix_style: Style,
    spans: impl Iterator<Item = Span<'static>>,
) -> Line<'static> {
    let mut all = vec![Span::styled(prefix, prefix_style)];
    all.extend(spans);
    Line::from(all)
}

fn span_for(span: &StyledSpan) -> Span<'static> {
    let mut style = Style::default();
    if span.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if span.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if span.code {
        style = style.fg(Color::Green);
    }
    Span::styled(span.text.clone(), style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensina_core::{MarkdownRenderer, TerminalMarkdown};

    fn text_of(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn conversation() -> ConversationStore {
        let mut store = ConversationStore::new();
        store.push(Message::user("Hello"));
        let mut reply = Message::assistant();
        reply.content = "**Hi**".to_string();
        reply.rendered = Some(TerminalMarkdown.render(&reply.content));
        store.push(reply);
        store
    }

    #[test]
    fn test_render_all_mounts_every_message() {
        let mut view = ChatView::new(Locale::En);
        view.render_all(&conversation());

        assert_eq!(view.mounted(), 2);
        let lines = view.lines();
        assert!(text_of(&lines[0]).starts_with("You:"));
        assert_eq!(text_of(&lines[1]), "Hello");
        assert!(text_of(&lines[3]).starts_with("Assistant:"));
        assert_eq!(text_of(&lines[4]), "Hi");
        assert!(lines[4].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_incremental_replaces_one_block() {
        let mut view = ChatView::new(Locale::En);
        view.render_all(&conversation());

        let update = TerminalMarkdown.render("**Hi** there\n- item");
        assert!(view.render_incremental(1, &update));

        let body = view.body(1).unwrap();
        assert_eq!(body.len(), 2);
        assert_eq!(text_of(&body[0]), "Hi there");
        assert_eq!(text_of(&body[1]), "  • item");
        assert_eq!(text_of(&view.body(0).unwrap()[0]), "Hello");
    }

    #[test]
    fn test_incremental_on_unmounted_index_reports_false() {
        let mut view = ChatView::new(Locale::En);
        assert!(!view.render_incremental(0, &RenderedContent::default()));
        view.render_all(&conversation());
        assert!(!view.render_incremental(5, &RenderedContent::default()));
    }

    #[test]
    fn test_follow_keeps_bottom_in_view() {
        let mut view = ChatView::new(Locale::En);
        view.resize(40, 3);
        view.render_all(&conversation());
        // 2 headers + 2 bodies + 2 spacers = 6 rows
        assert_eq!(view.total_rows(), 6);
        assert_eq!(view.scroll, 3);

        view.scroll_up(2);
        assert!(!view.follow);
        view.render_incremental(1, &TerminalMarkdown.render("a\nb\nc"));
        assert_eq!(view.scroll, 1);

        view.scroll_down(100);
        assert!(view.follow);
        assert_eq!(view.scroll, 5);
    }

    #[test]
    fn test_row_counts_follow_incremental_updates_and_width() {
        let mut view = ChatView::new(Locale::En);
        view.resize(20, 5);
        view.render_all(&conversation());
        assert_eq!(view.total_rows(), 6);

        // 25 chars wrap to 2 rows at width 20
        view.render_incremental(1, &TerminalMarkdown.render(&"x".repeat(25)));
        assert_eq!(view.total_rows(), 7);

        view.resize(5, 5);
        // Headers wrap too: "You: HH:MM" is 10 wide, "Assistant: HH:MM" is 16
        assert_eq!(view.total_rows(), (2 + 1 + 1) + (4 + 5 + 1));
    }

    #[test]
    fn test_scroll_down_saturates_near_row_limit() {
        let mut store = ConversationStore::new();
        store.push(Message::user("line\n".repeat(70_000)));
        let mut view = ChatView::new(Locale::En);
        view.resize(40, 1);
        view.render_all(&store);
        assert_eq!(view.total_rows(), u16::MAX);
        assert_eq!(view.scroll, u16::MAX - 1);

        view.scroll_down(3);
        assert_eq!(view.scroll, u16::MAX - 1);
        assert!(view.follow);
    }

    #[test]
    fn test_selection_walks_messages_and_highlights_header() {
        let mut view = ChatView::new(Locale::En);
        view.render_all(&conversation());
        assert_eq!(view.selected(), None);

        view.select_prev();
        assert_eq!(view.selected(), Some(1));
        view.select_prev();
        view.select_prev();
        assert_eq!(view.selected(), Some(0));

        let lines = view.lines();
        assert!(lines[0].style.add_modifier.contains(Modifier::REVERSED));
        assert!(!lines[3].style.add_modifier.contains(Modifier::REVERSED));

        view.select_next();
        assert_eq!(view.selected(), Some(1));
        view.select_next();
        assert_eq!(view.selected(), None);
        assert!(view.follow);
    }

    #[test]
    fn test_selection_past_the_end_is_cleared_on_repaint() {
        let mut view = ChatView::new(Locale::En);
        view.render_all(&conversation());
        view.select_prev();
        assert_eq!(view.selected(), Some(1));

        let mut shorter = ConversationStore::new();
        shorter.push(Message::user("only"));
        view.render_all(&shorter);
        assert_eq!(view.selected(), None);
    }
}
