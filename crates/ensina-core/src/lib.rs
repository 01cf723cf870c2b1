pub mod assembler;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod locale;
pub mod markdown;
pub mod sse;
pub mod state;
pub mod view;

// Re-export main types for convenience
pub use assembler::{Assembler, GenerationState, SessionId, SessionUpdate, SessionUpdates, UpdateKind};
pub use client::{reset_in_background, ByteStream, ChatClient, CompletionService, DEFAULT_BASE_URL};
pub use config::Config;
pub use conversation::ConversationStore;
pub use error::{ChatError, DecodeError, EndReason};
pub use locale::Locale;
pub use markdown::{LineKind, MarkdownRenderer, RenderedContent, RenderedLine, StyledSpan, TerminalMarkdown};
pub use sse::{event_stream, ServerEvent};
pub use state::{Message, Role};
pub use view::{NullView, View};
