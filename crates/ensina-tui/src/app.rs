use std::sync::Arc;

use ensina_core::{
    Assembler, ChatClient, EndReason, Locale, Role, SessionUpdate, SessionUpdates, TerminalMarkdown,
};

pub type ChatAssembler = Assembler<ChatClient, TerminalMarkdown>;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub assembler: ChatAssembler,
    pub view: crate::view::ChatView,
    pub base_url: String,

    // Composer state
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Transient message shown in the footer
    pub status: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(client: Arc<ChatClient>, locale: Locale) -> (Self, SessionUpdates) {
        let base_url = client.base_url().to_string();
        let (assembler, updates) = Assembler::new(client, TerminalMarkdown, locale);
        let app = Self {
            should_quit: false,
            assembler,
            view: crate::view::ChatView::new(locale),
            base_url,
            input: String::new(),
            cursor: 0,
            status: None,
            animation_frame: 0,
        };
        (app, updates)
    }

    pub fn locale(&self) -> Locale {
        self.assembler.locale()
    }

    pub fn is_generating(&self) -> bool {
        self.assembler.is_generating()
    }

    /// Send is available only with text to send and no reply in flight
    pub fn can_send(&self) -> bool {
        !self.input.trim().is_empty() && !self.is_generating()
    }

    /// Send the composer text. Returns `false` when sending is unavailable.
    pub fn submit(&mut self) -> bool {
        if !self.can_send() {
            return false;
        }
        let text = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.status = None;
        self.view.scroll_to_bottom();
        self.assembler.start(&text, &mut self.view)
    }

    /// Stop the reply in flight, if any
    pub fn stop(&mut self) {
        self.assembler.cancel(&mut self.view);
    }

    pub fn on_update(&mut self, update: SessionUpdate) {
        if let Some(reason) = self.assembler.apply(update, &mut self.view) {
            self.status = match reason {
                EndReason::Failed(err) => Some(err.to_string()),
                EndReason::Completed | EndReason::UserCancelled => None,
            };
        }
    }

    /// Move the selected user message back into the composer; without a
    /// selection, the most recent user message.
    pub fn edit_selected(&mut self) -> bool {
        let conversation = self.assembler.conversation();
        let index = match self.view.selected() {
            Some(i) => i,
            None => match conversation.last_of_role(Role::User) {
                Some(i) => i,
                None => return false,
            },
        };
        if !conversation.get(index).is_some_and(|m| m.is_user()) {
            self.status = Some("Only your own messages can be edited".to_string());
            return false;
        }

        match self.assembler.retract_for_edit(index, &mut self.view) {
            Some(text) => {
                self.view.clear_selection();
                self.cursor = text.chars().count();
                self.input = text;
                true
            }
            None => false,
        }
    }

    /// Source text of the selected message, or of the newest one
    pub fn copy_source(&self) -> Option<&str> {
        let messages = self.assembler.conversation().messages();
        let message = match self.view.selected() {
            Some(i) => messages.get(i),
            None => messages.last(),
        };
        message.map(|m| m.content.as_str()).filter(|c| !c.is_empty())
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_generating() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// The reply in flight has not produced any text yet
    pub fn is_waiting_for_first_token(&self) -> bool {
        self.assembler
            .target()
            .and_then(|i| self.assembler.conversation().get(i))
            .is_some_and(|m| m.content.is_empty())
    }
}
