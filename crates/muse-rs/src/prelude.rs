//! Convenience re-exports for common `muse-rs` types.
//!
//! ```ignore
//! use muse_rs::prelude::*;
//! ```
//!
//! Covers the client, configuration, the conversation driver, the store
//! with its observers, and the genre/mode catalog. Persistence internals and
//! the instruction builder are left to their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{ChatMessage, ChatRequest, ChatRole, ImageRequest, OpenAiClient};

// ── Generation boundary ─────────────────────────────────────────────
pub use crate::api::{GenerationError, GenerationFuture, GenerationService};

// ── Configuration and turns ─────────────────────────────────────────
pub use crate::config::MuseConfig;
pub use crate::conversation::{CHAT_APOLOGY, Conversation, IMAGE_APOLOGY};

// ── Prompt composition ──────────────────────────────────────────────
pub use crate::prompt::{Genre, Mode, compose_instruction};

// ── Session store ───────────────────────────────────────────────────
pub use crate::store::{
    Chapter, CompositeObserver, FnObserver, Goal, LoggingObserver, Message, NoopObserver,
    Project, ProjectUpdate, Role, Session, SessionStore, StoreEvent, StoreObserver,
};
