//! Response assembly for one streamed exchange at a time
//!
//! [`Assembler::start`] appends the user and (empty) assistant messages and
//! spawns a reader task. The task only decodes: it forwards every event as
//! a [`SessionUpdate`] over a channel, and the owner of the assembler feeds
//! those back through [`Assembler::apply`]. All conversation mutation
//! therefore happens on the caller's side, one update at a time, and
//! [`Assembler::cancel`] can run between any two updates.

use std::pin::pin;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::CompletionService;
use crate::conversation::ConversationStore;
use crate::error::{ChatError, DecodeError, EndReason};
use crate::locale::Locale;
use crate::markdown::MarkdownRenderer;
use crate::sse::{event_stream, ServerEvent};
use crate::state::Message;
use crate::view::View;

pub type SessionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    Generating,
}

/// One item forwarded by a reader task
#[derive(Debug)]
pub struct SessionUpdate {
    pub session: SessionId,
    pub kind: UpdateKind,
}

#[derive(Debug)]
pub enum UpdateKind {
    Event(ServerEvent),
    /// A frame that failed to decode; skipped
    Malformed(DecodeError),
    /// The request failed or the body broke off
    Failed(ChatError),
    /// The body ended without a `done` event
    Closed,
}

/// Receiving end of the reader tasks' channel
pub struct SessionUpdates {
    rx: mpsc::UnboundedReceiver<SessionUpdate>,
}

impl SessionUpdates {
    pub async fn recv(&mut self) -> Option<SessionUpdate> {
        self.rx.recv().await
    }
}

/// The in-flight exchange. Dropping it cancels the token and aborts the
/// reader task, so the reader stops on every exit path.
struct Session {
    id: SessionId,
    target: usize,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

pub struct Assembler<S, R> {
    service: Arc<S>,
    renderer: R,
    locale: Locale,
    conversation: ConversationStore,
    session: Option<Session>,
    next_session: SessionId,
    updates_tx: mpsc::UnboundedSender<SessionUpdate>,
}

impl<S: CompletionService, R: MarkdownRenderer> Assembler<S, R> {
    pub fn new(service: Arc<S>, renderer: R, locale: Locale) -> (Self, SessionUpdates) {
        let (updates_tx, rx) = mpsc::unbounded_channel();
        let assembler = Self {
            service,
            renderer,
            locale,
            conversation: ConversationStore::new(),
            session: None,
            next_session: 1,
            updates_tx,
        };
        (assembler, SessionUpdates { rx })
    }

    pub fn state(&self) -> GenerationState {
        if self.session.is_some() {
            GenerationState::Generating
        } else {
            GenerationState::Idle
        }
    }

    pub fn is_generating(&self) -> bool {
        self.state() == GenerationState::Generating
    }

    pub fn conversation(&self) -> &ConversationStore {
        &self.conversation
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Index of the assistant message being streamed into
    pub fn target(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.target)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Submit `user_text` and start streaming the reply.
    ///
    /// Blank input is ignored and returns `false`. An active exchange is
    /// cancelled before anything is appended. Must be called from within a
    /// tokio runtime.
    pub fn start(&mut self, user_text: &str, view: &mut dyn View) -> bool {
        let text = user_text.trim();
        if text.is_empty() {
            return false;
        }

        if self.cancel(view) {
            debug!("cancelled previous generation before starting a new one");
        }

        self.conversation.push(Message::user(text));
        let target = self.conversation.push(Message::assistant());

        let id = self.next_session;
        self.next_session += 1;
        let cancel = CancellationToken::new();

        let task = tokio::spawn(read_reply(
            Arc::clone(&self.service),
            text.to_string(),
            id,
            cancel.clone(),
            self.updates_tx.clone(),
        ));

        self.session = Some(Session { id, target, cancel, task });
        info!(session = id, target, "generation started");

        view.render_all(&self.conversation);
        true
    }

    /// Apply one update from a reader task. Returns how the session ended
    /// if this update ended it.
    pub fn apply(&mut self, update: SessionUpdate, view: &mut dyn View) -> Option<EndReason> {
        let target = match &self.session {
            Some(session) if session.id == update.session => session.target,
            _ => {
                debug!(session = update.session, "dropping update from finished session");
                return None;
            }
        };

        match update.kind {
            UpdateKind::Event(ServerEvent::Message { text }) => {
                self.append(target, &text, view);
                None
            }
            UpdateKind::Event(ServerEvent::Done) | UpdateKind::Closed => {
                Some(self.finish(EndReason::Completed, view))
            }
            UpdateKind::Event(ServerEvent::Unknown { kind, .. }) => {
                debug!(kind = %kind, "ignoring unknown event kind");
                None
            }
            UpdateKind::Malformed(err) => {
                warn!(error = %err, "skipping malformed event");
                None
            }
            UpdateKind::Failed(err) => Some(self.finish(EndReason::Failed(err), view)),
        }
    }

    /// Stop the active exchange. Returns `false` (and does nothing) when idle.
    pub fn cancel(&mut self, view: &mut dyn View) -> bool {
        if self.session.is_none() {
            return false;
        }
        self.finish(EndReason::UserCancelled, view);
        true
    }

    /// Take back the user message at `index` for editing, cancelling any
    /// active exchange first. Returns the message text.
    pub fn retract_for_edit(&mut self, index: usize, view: &mut dyn View) -> Option<String> {
        if !self.conversation.get(index).is_some_and(Message::is_user) {
            return None;
        }
        self.cancel(view);
        let message = self.conversation.retract(index)?;
        view.render_all(&self.conversation);
        Some(message.content)
    }

    /// Apply updates until the active session ends.
    pub async fn pump_until_idle(&mut self, updates: &mut SessionUpdates, view: &mut dyn View) -> Option<EndReason> {
        while self.is_generating() {
            let update = updates.recv().await?;
            if let Some(reason) = self.apply(update, view) {
                return Some(reason);
            }
        }
        None
    }

    fn append(&mut self, target: usize, text: &str, view: &mut dyn View) {
        let Some(message) = self.conversation.get_mut(target) else {
            return;
        };
        message.content.push_str(text);
        // Whole-text render: earlier markup can change meaning as text arrives
        let rendered = self.renderer.render(&message.content);
        let mounted = view.render_incremental(target, &rendered);
        message.rendered = Some(rendered);

        if !mounted {
            view.render_all(&self.conversation);
        }
    }

    /// The single exit path of a session.
    fn finish(&mut self, reason: EndReason, view: &mut dyn View) -> EndReason {
        let Some(session) = self.session.take() else {
            return reason;
        };
        let (id, target) = (session.id, session.target);
        // Stops the reader before anything else is touched
        drop(session);

        let notice = match &reason {
            EndReason::Completed => None,
            EndReason::UserCancelled => Some(self.locale.interrupted_notice()),
            EndReason::Failed(_) => Some(self.locale.error_notice()),
        };

        if let Some(message) = self.conversation.get_mut(target) {
            if let Some(notice) = notice {
                message.content.push_str(notice);
            }
            message.rendered = Some(self.renderer.render(&message.content));
        }

        match &reason {
            EndReason::Completed => info!(session = id, "generation completed"),
            EndReason::UserCancelled => info!(session = id, "generation interrupted by user"),
            EndReason::Failed(err) => error!(session = id, error = %err, "generation failed"),
        }

        view.render_all(&self.conversation);
        reason
    }
}

/// Reader task: open the request, decode the body, forward events until
/// `done`, end of body, failure, or cancellation.
async fn read_reply<S: CompletionService>(
    service: Arc<S>,
    message: String,
    session: SessionId,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<SessionUpdate>,
) {
    let send = |kind: UpdateKind| tx.send(SessionUpdate { session, kind }).is_ok();

    let body = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(session, "cancelled before the service answered");
            return;
        }
        result = service.open_chat(&message) => match result {
            Ok(body) => body,
            Err(err) => {
                send(UpdateKind::Failed(err));
                return;
            }
        },
    };

    let mut events = pin!(event_stream(body));

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(session, "stopped reading after cancellation");
                return;
            }
            next = events.next() => next,
        };

        let (kind, last) = match next {
            Some(Ok(ServerEvent::Done)) => (UpdateKind::Event(ServerEvent::Done), true),
            Some(Ok(event)) => (UpdateKind::Event(event), false),
            Some(Err(ChatError::Malformed(err))) => (UpdateKind::Malformed(err), false),
            Some(Err(err)) => (UpdateKind::Failed(err), true),
            None => (UpdateKind::Closed, true),
        };

        if !send(kind) || last {
            return;
        }
    }
}
