//! Durable session state.
//!
//! - [`model`]: the [`Session`] aggregate and its records.
//! - [`session_store`]: [`SessionStore`], the single writer of a session.
//! - [`events`]: [`StoreEvent`] and the [`StoreObserver`] implementations.
//! - [`persist`]: the versioned JSON blob and its atomic write.
//! - [`clock`]: record ids and the strictly increasing millisecond clock.

pub mod clock;
pub mod events;
pub mod model;
pub mod persist;
pub mod session_store;

pub use clock::{MonotonicClock, new_id};
pub use events::{
    CompositeObserver, FnObserver, LoggingObserver, NoopObserver, StoreEvent, StoreObserver,
};
pub use model::{Chapter, Goal, Message, Project, ProjectUpdate, Role, Session};
pub use persist::{STORAGE_KEY, default_file_name};
pub use session_store::SessionStore;
