//! The session store: owner of all durable session state.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::clock::{MonotonicClock, new_id};
use super::events::{NoopObserver, StoreEvent, StoreObserver};
use super::model::{Chapter, Goal, Message, Project, ProjectUpdate, Role, Session};
use super::persist;
use crate::prompt::Genre;

struct StoreState {
    session: Arc<Session>,
    clock: MonotonicClock,
}

/// Thread-safe owner of a [`Session`].
///
/// Mutations are applied one at a time: each clones the current snapshot,
/// edits the clone, swaps it in and (when backed by a file) rewrites the
/// blob before releasing the lock. Observers are notified afterwards with
/// the new snapshot, in the same order the mutations were applied; an
/// observer must not mutate the store it observes. Readers get
/// `Arc<Session>` snapshots that never change.
///
/// Operations that name an unknown id do nothing: no write, no event, and a
/// `false`/`None` result.
pub struct SessionStore {
    state: Mutex<StoreState>,
    path: Option<PathBuf>,
    observer: Box<dyn StoreObserver>,
    delivery: Mutex<()>,
}

impl SessionStore {
    // ── Lifecycle ──────────────────────────────────────────────────

    /// Open the store backed by `path`.
    ///
    /// A missing blob starts an empty session. An unreadable, corrupt or
    /// newer-version blob is logged and also starts an empty session; it is
    /// overwritten by the first mutation.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let session = match persist::load(&path) {
            Ok(Some(session)) => {
                info!(
                    path = %path.display(),
                    messages = session.messages.len(),
                    projects = session.projects.len(),
                    goals = session.goals.len(),
                    "Restored session"
                );
                session
            }
            Ok(None) => {
                info!(path = %path.display(), "No saved session, starting fresh");
                Session::default()
            }
            Err(e) => {
                warn!(path = %path.display(), "Discarding saved session: {e}");
                Session::default()
            }
        };
        Self::with_session(session, Some(path))
    }

    /// A store with no backing file.
    pub fn in_memory() -> Self {
        Self::with_session(Session::default(), None)
    }

    fn with_session(session: Session, path: Option<PathBuf>) -> Self {
        let clock = MonotonicClock::after(session.latest_instant());
        Self {
            state: Mutex::new(StoreState {
                session: Arc::new(session),
                clock,
            }),
            path,
            observer: Box::new(NoopObserver),
            delivery: Mutex::new(()),
        }
    }

    /// Replace the observer notified after each mutation.
    pub fn with_observer(mut self, observer: impl StoreObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the current snapshot now. No-op for in-memory stores.
    pub fn flush(&self) -> Result<(), String> {
        let state = self.lock();
        match &self.path {
            Some(path) => persist::save(path, &state.session),
            None => Ok(()),
        }
    }

    /// Final flush before shutdown. Failures are logged.
    pub fn close(&self) {
        if let Err(e) = self.flush() {
            warn!("Failed to save session on close: {e}");
        } else {
            debug!("Session store closed");
        }
    }

    // ── Reads ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<Session> {
        self.lock().session.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.snapshot().messages.clone()
    }

    pub fn genre(&self) -> Genre {
        self.snapshot().genre
    }

    pub fn project(&self, id: &str) -> Option<Project> {
        self.snapshot().project(id).cloned()
    }

    pub fn goal(&self, id: &str) -> Option<Goal> {
        self.snapshot().goal(id).cloned()
    }

    pub fn current_project(&self) -> Option<Project> {
        self.snapshot().current_project().cloned()
    }

    // ── Conversation ───────────────────────────────────────────────

    /// Append a message with a fresh id and timestamp.
    pub fn append_message(
        &self,
        role: Role,
        content: impl Into<String>,
        choices: Option<Vec<String>>,
        image_url: Option<String>,
    ) -> Message {
        let content = content.into();
        self.mutate(|session, clock| {
            let message = Message {
                id: new_id(),
                role,
                content,
                choices,
                image_url,
                timestamp: clock.now(),
            };
            session.messages.push(message.clone());
            let event = StoreEvent::MessageAppended {
                id: message.id.clone(),
                role,
            };
            (message, event)
        })
    }

    /// Clear the conversation. Projects, goals and genre are untouched.
    pub fn reset_messages(&self) {
        self.mutate(|session, _| {
            let cleared = session.messages.len();
            session.messages.clear();
            ((), StoreEvent::MessagesReset { cleared })
        });
    }

    /// Set the genre without touching the conversation.
    pub fn select_genre(&self, genre: Genre) {
        self.mutate(|session, _| {
            session.genre = genre;
            ((), StoreEvent::GenreSelected { genre })
        });
    }

    /// Set the genre and clear the conversation in one step.
    ///
    /// Returns `false` and changes nothing when `genre` is already selected.
    pub fn switch_genre(&self, genre: Genre) -> bool {
        self.try_mutate(|session, _| {
            if session.genre == genre {
                return None;
            }
            let from = session.genre;
            let cleared = session.messages.len();
            session.genre = genre;
            session.messages.clear();
            Some((
                (),
                StoreEvent::GenreSwitched {
                    from,
                    to: genre,
                    cleared,
                },
            ))
        })
        .is_some()
    }

    // ── Projects ───────────────────────────────────────────────────

    pub fn create_project(
        &self,
        title: impl Into<String>,
        genre: Genre,
        description: impl Into<String>,
    ) -> Project {
        let (title, description) = (title.into(), description.into());
        self.mutate(|session, clock| {
            let now = clock.now();
            let project = Project {
                id: new_id(),
                title,
                genre,
                description,
                chapters: Vec::new(),
                created_at: now,
                updated_at: now,
            };
            session.projects.push(project.clone());
            let event = StoreEvent::ProjectCreated {
                id: project.id.clone(),
            };
            (project, event)
        })
    }

    /// Merge the set fields of `update` into the project.
    pub fn update_project(&self, id: &str, update: ProjectUpdate) -> bool {
        self.try_mutate(|session, clock| {
            let project = session.projects.iter_mut().find(|p| p.id == id)?;
            if let Some(title) = update.title {
                project.title = title;
            }
            if let Some(genre) = update.genre {
                project.genre = genre;
            }
            if let Some(description) = update.description {
                project.description = description;
            }
            project.updated_at = clock.now();
            Some(((), StoreEvent::ProjectUpdated { id: id.to_string() }))
        })
        .is_some()
    }

    /// Remove a project, clearing the current-project reference if it
    /// pointed at it.
    pub fn delete_project(&self, id: &str) -> bool {
        self.try_mutate(|session, _| {
            let index = session.projects.iter().position(|p| p.id == id)?;
            session.projects.remove(index);
            if session.current_project_id.as_deref() == Some(id) {
                session.current_project_id = None;
            }
            Some(((), StoreEvent::ProjectDeleted { id: id.to_string() }))
        })
        .is_some()
    }

    /// Append a chapter and refresh the project's `updated_at`.
    pub fn add_chapter(
        &self,
        project_id: &str,
        title: impl Into<String>,
        content: impl Into<String>,
        word_count: u32,
    ) -> Option<Chapter> {
        let (title, content) = (title.into(), content.into());
        self.try_mutate(|session, clock| {
            let project = session.projects.iter_mut().find(|p| p.id == project_id)?;
            let now = clock.now();
            let chapter = Chapter {
                id: new_id(),
                title,
                content,
                word_count,
                created_at: now,
            };
            project.chapters.push(chapter.clone());
            project.updated_at = now;
            let event = StoreEvent::ChapterAdded {
                project_id: project_id.to_string(),
                chapter_id: chapter.id.clone(),
            };
            Some((chapter, event))
        })
    }

    /// Point the current-project reference at an existing project, or clear
    /// it with `None`. Unknown ids leave it unchanged.
    pub fn set_current_project(&self, id: Option<&str>) -> bool {
        self.try_mutate(|session, _| {
            if let Some(id) = id {
                session.project(id)?;
            }
            session.current_project_id = id.map(str::to_string);
            Some((
                (),
                StoreEvent::CurrentProjectChanged {
                    id: id.map(str::to_string),
                },
            ))
        })
        .is_some()
    }

    // ── Goals ──────────────────────────────────────────────────────

    pub fn create_goal(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        due_date: Option<DateTime<Utc>>,
    ) -> Goal {
        let (title, description) = (title.into(), description.into());
        self.mutate(|session, clock| {
            let goal = Goal {
                id: new_id(),
                title,
                description,
                completed: false,
                due_date,
                created_at: clock.now(),
            };
            session.goals.push(goal.clone());
            let event = StoreEvent::GoalCreated {
                id: goal.id.clone(),
            };
            (goal, event)
        })
    }

    /// Flip a goal's completion flag. Returns the new value.
    pub fn toggle_goal(&self, id: &str) -> Option<bool> {
        self.try_mutate(|session, _| {
            let goal = session.goals.iter_mut().find(|g| g.id == id)?;
            goal.completed = !goal.completed;
            let completed = goal.completed;
            Some((
                completed,
                StoreEvent::GoalToggled {
                    id: id.to_string(),
                    completed,
                },
            ))
        })
    }

    pub fn delete_goal(&self, id: &str) -> bool {
        self.try_mutate(|session, _| {
            let index = session.goals.iter().position(|g| g.id == id)?;
            session.goals.remove(index);
            Some(((), StoreEvent::GoalDeleted { id: id.to_string() }))
        })
        .is_some()
    }

    // ── Internals ──────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `edit` to a copy of the current session, install the copy as
    /// the current snapshot, persist it and deliver the event.
    fn mutate<T>(
        &self,
        edit: impl FnOnce(&mut Session, &mut MonotonicClock) -> (T, StoreEvent),
    ) -> T {
        let mut state = self.lock();
        let mut next = Session::clone(&state.session);
        let (value, event) = edit(&mut next, &mut state.clock);
        let snapshot = self.install(&mut state, next, &event);
        self.deliver(state, &event, &snapshot);
        value
    }

    /// Like [`mutate`](Self::mutate), but `None` from `edit` discards the
    /// copy: nothing is persisted and no event is delivered.
    fn try_mutate<T>(
        &self,
        edit: impl FnOnce(&mut Session, &mut MonotonicClock) -> Option<(T, StoreEvent)>,
    ) -> Option<T> {
        let mut state = self.lock();
        let mut next = Session::clone(&state.session);
        let (value, event) = edit(&mut next, &mut state.clock)?;
        let snapshot = self.install(&mut state, next, &event);
        self.deliver(state, &event, &snapshot);
        Some(value)
    }

    fn install(&self, state: &mut StoreState, next: Session, event: &StoreEvent) -> Arc<Session> {
        let snapshot = Arc::new(next);
        state.session = snapshot.clone();
        if let Some(path) = &self.path
            && let Err(e) = persist::save(path, &snapshot)
        {
            warn!(event = event.kind(), "Failed to save session: {e}");
        }
        snapshot
    }

    /// Notify the observer outside the state lock, in install order.
    ///
    /// The delivery lock is taken before `state` is released, so the next
    /// mutation cannot reach the observer until this one has.
    fn deliver(
        &self,
        state: MutexGuard<'_, StoreState>,
        event: &StoreEvent,
        snapshot: &Session,
    ) {
        let _delivery = self
            .delivery
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        drop(state);
        self.observer.on_event(event, snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FnObserver;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_store() -> (SessionStore, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let store = SessionStore::in_memory().with_observer(FnObserver::new(
            move |_: &StoreEvent, _: &Session| {
                seen.fetch_add(1, Ordering::SeqCst);
            },
        ));
        (store, count)
    }

    #[test]
    fn unknown_ids_do_not_notify() {
        let (store, count) = counting_store();
        assert!(!store.update_project("nope", ProjectUpdate::default()));
        assert!(!store.delete_project("nope"));
        assert!(store.add_chapter("nope", "t", "c", 1).is_none());
        assert!(store.toggle_goal("nope").is_none());
        assert!(!store.delete_goal("nope"));
        assert!(!store.set_current_project(Some("nope")));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn every_effective_mutation_notifies_once() {
        let (store, count) = counting_store();
        store.append_message(Role::User, "hi", None, None);
        let project = store.create_project("Dragon's Call", Genre::Fantasy, "");
        store.add_chapter(&project.id, "One", "It began.", 2);
        store.reset_messages();
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn snapshots_are_immutable() {
        let store = SessionStore::in_memory();
        let before = store.snapshot();
        store.append_message(Role::User, "hi", None, None);
        assert!(before.messages.is_empty());
        assert_eq!(store.snapshot().messages.len(), 1);
    }

    #[test]
    fn in_memory_flush_is_a_no_op() {
        let store = SessionStore::in_memory();
        assert!(store.path().is_none());
        assert!(store.flush().is_ok());
    }

    #[test]
    fn switch_to_same_genre_is_a_no_op() {
        let (store, count) = counting_store();
        store.append_message(Role::User, "hi", None, None);
        assert!(!store.switch_genre(Genre::Fantasy));
        assert_eq!(store.messages().len(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
