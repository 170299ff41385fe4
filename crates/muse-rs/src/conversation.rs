//! Turn driver.
//!
//! A turn appends the user's message, composes the request from the session
//! as it stood before the turn, calls the [`GenerationService`] and appends
//! either the reply or a fixed apology. Turns and illustrations pass through
//! one FIFO gate, so a second turn starts only after the first has written
//! its reply.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::{GenerationError, GenerationService};
use crate::config::MuseConfig;
use crate::prompt::{
    Genre, Mode, assemble_request, compose_image_prompt, compose_instruction, extract_choices,
};
use crate::store::{Message, Role, SessionStore};

/// Stored in place of a reply when text generation fails.
pub const CHAT_APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

/// Stored in place of an illustration when image generation fails.
pub const IMAGE_APOLOGY: &str = "Sorry, I couldn't generate an image. Please try again.";

/// Caption of a successful illustration message.
pub const IMAGE_CAPTION: &str = "Here's a visual representation of your story:";

pub struct Conversation<S> {
    service: S,
    store: Arc<SessionStore>,
    config: MuseConfig,
    turn_gate: Mutex<()>,
}

impl<S: GenerationService> Conversation<S> {
    pub fn new(service: S, store: Arc<SessionStore>, config: MuseConfig) -> Self {
        Self {
            service,
            store,
            config,
            turn_gate: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &MuseConfig {
        &self.config
    }

    /// Run one turn in `mode`. Returns the stored assistant message, or
    /// `None` when `text` is blank.
    ///
    /// Failures never escape: they are logged and answered with
    /// [`CHAT_APOLOGY`].
    pub async fn send(&self, mode: Mode, text: &str) -> Option<Message> {
        if text.trim().is_empty() {
            return None;
        }
        let _turn = self.turn_gate.lock().await;

        let session = self.store.snapshot();
        let history = self.windowed(&session.messages);
        let instruction = compose_instruction(session.genre, mode);
        let request = self
            .config
            .chat_request(assemble_request(&instruction, history, text));
        self.store.append_message(Role::User, text, None, None);

        debug!(
            mode = %mode,
            genre = %session.genre,
            history = history.len(),
            "Sending turn"
        );
        let started = Instant::now();
        let outcome = self
            .service
            .complete(&request)
            .await
            .and_then(non_empty);

        let reply = match outcome {
            Ok(reply) => {
                info!(
                    chars = reply.chars().count(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Reply received"
                );
                let choices = match mode {
                    Mode::InteractiveStory => extract_choices(&reply),
                    _ => None,
                };
                self.store
                    .append_message(Role::Assistant, reply, choices, None)
            }
            Err(e) => {
                warn!("Turn failed: {e}");
                self.store
                    .append_message(Role::Assistant, CHAT_APOLOGY, None, None)
            }
        };
        Some(reply)
    }

    /// Illustrate the last few messages in the current genre's style.
    ///
    /// Returns `None` without calling the service when there is nothing to
    /// illustrate. Failures are answered with [`IMAGE_APOLOGY`].
    pub async fn illustrate(&self) -> Option<Message> {
        let _turn = self.turn_gate.lock().await;

        let session = self.store.snapshot();
        let Some(prompt) = compose_image_prompt(&session.messages, session.genre) else {
            debug!("Nothing to illustrate yet");
            return None;
        };
        let request = self.config.image_request(prompt);

        let outcome = self
            .service
            .illustrate(&request)
            .await
            .and_then(non_empty);

        let message = match outcome {
            Ok(url) => {
                info!(genre = %session.genre, "Illustration generated");
                self.store
                    .append_message(Role::Assistant, IMAGE_CAPTION, None, Some(url))
            }
            Err(e) => {
                warn!("Illustration failed: {e}");
                self.store
                    .append_message(Role::Assistant, IMAGE_APOLOGY, None, None)
            }
        };
        Some(message)
    }

    /// Change genre and start a fresh conversation, after any turn in
    /// flight has finished. Returns `false` if `genre` was already active.
    pub async fn switch_genre(&self, genre: Genre) -> bool {
        let _turn = self.turn_gate.lock().await;
        self.store.switch_genre(genre)
    }

    /// Clear the conversation after any turn in flight has finished.
    pub async fn reset(&self) {
        let _turn = self.turn_gate.lock().await;
        self.store.reset_messages();
    }

    fn windowed<'a>(&self, messages: &'a [Message]) -> &'a [Message] {
        match self.config.history_window {
            Some(window) if messages.len() > window => {
                messages.get(messages.len() - window..).unwrap_or(messages)
            }
            _ => messages,
        }
    }
}

fn non_empty(text: String) -> Result<String, GenerationError> {
    if text.trim().is_empty() {
        Err(GenerationError::Empty)
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::GenerationFuture;
    use crate::{ChatRequest, ImageRequest};

    struct Echo;

    impl GenerationService for Echo {
        fn complete<'a>(&'a self, request: &'a ChatRequest) -> GenerationFuture<'a, String> {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Box::pin(async move { Ok(format!("echo: {last}")) })
        }

        fn illustrate<'a>(&'a self, _request: &'a ImageRequest) -> GenerationFuture<'a, String> {
            Box::pin(async { Ok(String::new()) })
        }
    }

    fn conversation(window: Option<usize>) -> Conversation<Echo> {
        let config = MuseConfig {
            history_window: window,
            ..MuseConfig::default()
        };
        Conversation::new(Echo, Arc::new(SessionStore::in_memory()), config)
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let convo = conversation(None);
        assert!(convo.send(Mode::Feedback, "   ").await.is_none());
        assert!(convo.store().messages().is_empty());
    }

    #[tokio::test]
    async fn reply_follows_user_message() {
        let convo = conversation(None);
        let reply = convo.send(Mode::Feedback, "Is my pacing slow?").await.unwrap();
        assert_eq!(reply.content, "echo: Is my pacing slow?");
        let messages = convo.store().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn empty_image_url_is_a_failure() {
        let convo = conversation(None);
        convo.send(Mode::InteractiveStory, "A dragon lands.").await;
        let message = convo.illustrate().await.unwrap();
        assert_eq!(message.content, IMAGE_APOLOGY);
        assert!(message.image_url.is_none());
    }

    #[test]
    fn window_keeps_most_recent_messages() {
        let convo = conversation(Some(2));
        for text in ["a", "b", "c"] {
            convo.store().append_message(Role::User, text, None, None);
        }
        let messages = convo.store().messages();
        let kept: Vec<&str> = convo
            .windowed(&messages)
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(kept, vec!["b", "c"]);
    }
}
