//! Mutation notifications.
//!
//! Every effective mutation of a [`SessionStore`](super::SessionStore)
//! produces one [`StoreEvent`], delivered to the store's [`StoreObserver`]
//! together with the snapshot the mutation produced. No-op mutations (unknown
//! ids) emit nothing.
//!
//! | Observer | Use |
//! |---|---|
//! | [`NoopObserver`] | Default, ignores everything |
//! | [`LoggingObserver`] | `tracing` output per mutation |
//! | [`FnObserver`] | Closures in tests and the CLI |
//! | [`CompositeObserver`] | Fan-out in registration order |

use tracing::debug;

use super::model::{Role, Session};
use crate::prompt::Genre;

// ── Events ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    MessageAppended { id: String, role: Role },
    MessagesReset { cleared: usize },
    GenreSelected { genre: Genre },
    /// Genre changed and the conversation was cleared with it.
    GenreSwitched { from: Genre, to: Genre, cleared: usize },
    ProjectCreated { id: String },
    ProjectUpdated { id: String },
    ProjectDeleted { id: String },
    ChapterAdded { project_id: String, chapter_id: String },
    GoalCreated { id: String },
    GoalToggled { id: String, completed: bool },
    GoalDeleted { id: String },
    CurrentProjectChanged { id: Option<String> },
}

impl StoreEvent {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreEvent::MessageAppended { .. } => "message_appended",
            StoreEvent::MessagesReset { .. } => "messages_reset",
            StoreEvent::GenreSelected { .. } => "genre_selected",
            StoreEvent::GenreSwitched { .. } => "genre_switched",
            StoreEvent::ProjectCreated { .. } => "project_created",
            StoreEvent::ProjectUpdated { .. } => "project_updated",
            StoreEvent::ProjectDeleted { .. } => "project_deleted",
            StoreEvent::ChapterAdded { .. } => "chapter_added",
            StoreEvent::GoalCreated { .. } => "goal_created",
            StoreEvent::GoalToggled { .. } => "goal_toggled",
            StoreEvent::GoalDeleted { .. } => "goal_deleted",
            StoreEvent::CurrentProjectChanged { .. } => "current_project_changed",
        }
    }
}

// ── Observers ──────────────────────────────────────────────────────

/// Receives store mutations after the new snapshot is in place.
pub trait StoreObserver: Send + Sync {
    fn on_event(&self, event: &StoreEvent, session: &Session) {
        let _ = (event, session);
    }
}

pub struct NoopObserver;
impl StoreObserver for NoopObserver {}

/// Logs each mutation at debug level.
pub struct LoggingObserver;

impl StoreObserver for LoggingObserver {
    fn on_event(&self, event: &StoreEvent, session: &Session) {
        debug!(
            event = event.kind(),
            messages = session.messages.len(),
            projects = session.projects.len(),
            goals = session.goals.len(),
            "Session updated: {event:?}"
        );
    }
}

/// An observer backed by a closure.
pub struct FnObserver<F>(F)
where
    F: Fn(&StoreEvent, &Session) + Send + Sync;

impl<F> FnObserver<F>
where
    F: Fn(&StoreEvent, &Session) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> StoreObserver for FnObserver<F>
where
    F: Fn(&StoreEvent, &Session) + Send + Sync,
{
    fn on_event(&self, event: &StoreEvent, session: &Session) {
        (self.0)(event, session)
    }
}

/// Dispatches every event to each inner observer in registration order.
///
/// ```ignore
/// let observer = CompositeObserver::new()
///     .with(LoggingObserver)
///     .with_if(verbose, FnObserver::new(|e, _| eprintln!("{}", e.kind())));
/// ```
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Box<dyn StoreObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: impl StoreObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn with_if(self, condition: bool, observer: impl StoreObserver + 'static) -> Self {
        if condition { self.with(observer) } else { self }
    }
}

impl StoreObserver for CompositeObserver {
    fn on_event(&self, event: &StoreEvent, session: &Session) {
        for observer in &self.observers {
            observer.on_event(event, session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn composite_dispatches_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let a = seen.clone();
        let b = seen.clone();
        let observer = CompositeObserver::new()
            .with(FnObserver::new(move |e: &StoreEvent, _: &Session| {
                a.lock().unwrap().push(format!("a:{}", e.kind()))
            }))
            .with(NoopObserver)
            .with(FnObserver::new(move |e: &StoreEvent, _: &Session| {
                b.lock().unwrap().push(format!("b:{}", e.kind()))
            }));
        observer.on_event(&StoreEvent::MessagesReset { cleared: 2 }, &Session::default());
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["a:messages_reset".to_string(), "b:messages_reset".to_string()]
        );
    }

    #[test]
    fn with_if_skips_disabled_observers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hidden = seen.clone();
        let shown = seen.clone();
        let observer = CompositeObserver::new()
            .with(LoggingObserver)
            .with_if(
                false,
                FnObserver::new(move |_: &StoreEvent, _: &Session| {
                    hidden.lock().unwrap().push("hidden")
                }),
            )
            .with_if(
                true,
                FnObserver::new(move |_: &StoreEvent, _: &Session| {
                    shown.lock().unwrap().push("shown")
                }),
            );

        observer.on_event(&StoreEvent::MessagesReset { cleared: 0 }, &Session::default());
        assert_eq!(*seen.lock().unwrap(), vec!["shown"]);
    }
}
