use crate::conversation::ConversationStore;
use crate::markdown::RenderedContent;

/// Projection of the conversation onto a display.
pub trait View {
    /// Rebuild the whole message list.
    fn render_all(&mut self, conversation: &ConversationStore);

    /// Replace only the content region of message `index`.
    ///
    /// Returns `false` when that region is not mounted; the caller then
    /// falls back to [`View::render_all`].
    fn render_incremental(&mut self, index: usize, rendered: &RenderedContent) -> bool;
}

/// A view that draws nothing, for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NullView;

impl View for NullView {
    fn render_all(&mut self, _conversation: &ConversationStore) {}

    fn render_incremental(&mut self, _index: usize, _rendered: &RenderedContent) -> bool {
        true
    }
}
