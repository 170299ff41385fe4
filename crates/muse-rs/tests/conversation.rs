//! Integration tests for the turn driver.
//!
//! A scripted [`GenerationService`] records every request and replays
//! queued outcomes, so turns run without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use muse_rs::api::{GenerationError, GenerationFuture, GenerationService};
use muse_rs::config::MuseConfig;
use muse_rs::conversation::{CHAT_APOLOGY, Conversation, IMAGE_APOLOGY, IMAGE_CAPTION};
use muse_rs::prompt::{Genre, Mode, compose_instruction};
use muse_rs::store::{Role, SessionStore};
use muse_rs::{ChatRequest, ChatRole, ImageRequest};

type Outcome = Result<String, GenerationError>;

#[derive(Default)]
struct Scripted {
    replies: Mutex<VecDeque<(Duration, Outcome)>>,
    images: Mutex<VecDeque<Outcome>>,
    chat_requests: Mutex<Vec<ChatRequest>>,
    image_requests: Mutex<Vec<ImageRequest>>,
}

impl Scripted {
    fn reply(self, text: &str) -> Self {
        self.reply_after(Duration::ZERO, Ok(text.to_string()))
    }

    fn fail(self, error: GenerationError) -> Self {
        self.reply_after(Duration::ZERO, Err(error))
    }

    fn reply_after(self, delay: Duration, outcome: Outcome) -> Self {
        self.replies.lock().unwrap().push_back((delay, outcome));
        self
    }

    fn image(self, outcome: Outcome) -> Self {
        self.images.lock().unwrap().push_back(outcome);
        self
    }
}

impl GenerationService for Scripted {
    fn complete<'a>(&'a self, request: &'a ChatRequest) -> GenerationFuture<'a, String> {
        self.chat_requests.lock().unwrap().push(request.clone());
        let (delay, outcome) = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((Duration::ZERO, Err(GenerationError::Empty)));
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            outcome
        })
    }

    fn illustrate<'a>(&'a self, request: &'a ImageRequest) -> GenerationFuture<'a, String> {
        self.image_requests.lock().unwrap().push(request.clone());
        let outcome = self
            .images
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerationError::Empty));
        Box::pin(async move { outcome })
    }
}

fn driver(service: Scripted) -> (Arc<Scripted>, Conversation<Arc<Scripted>>) {
    driver_with(service, MuseConfig::default())
}

fn driver_with(service: Scripted, config: MuseConfig) -> (Arc<Scripted>, Conversation<Arc<Scripted>>) {
    let service = Arc::new(service);
    let store = Arc::new(SessionStore::in_memory());
    (service.clone(), Conversation::new(service, store, config))
}

// ── Turns ────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_story_turn_sends_instruction_then_user_text() {
    let (service, convo) = driver(Scripted::default().reply("The attic door groans open."));

    let reply = convo
        .send(Mode::InteractiveStory, "I discover a mysterious door in my attic")
        .await
        .unwrap();
    assert_eq!(reply.content, "The attic door groans open.");

    let requests = service.chat_requests.lock().unwrap();
    let request = &requests[0];
    assert_eq!(request.model, "gpt-4o");
    assert_eq!(request.max_tokens, 2000);
    assert!((request.temperature - 0.8).abs() < f32::EPSILON);
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, ChatRole::System);
    assert_eq!(
        request.messages[0].content,
        compose_instruction(Genre::Fantasy, Mode::InteractiveStory)
    );
    assert!(request.messages[0].content.contains("What do you do?"));
    assert_eq!(request.messages[1].role, ChatRole::User);
    assert_eq!(request.messages[1].content, "I discover a mysterious door in my attic");
}

#[tokio::test]
async fn later_turns_carry_prior_history() {
    let (service, convo) = driver(Scripted::default().reply("one").reply("two"));

    convo.send(Mode::Feedback, "Review this opening chapter...").await;
    convo.send(Mode::Feedback, "And the dialogue?").await;

    let requests = service.chat_requests.lock().unwrap();
    let second: Vec<(ChatRole, &str)> = requests[1]
        .messages
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        second[1..],
        [
            (ChatRole::User, "Review this opening chapter..."),
            (ChatRole::Assistant, "one"),
            (ChatRole::User, "And the dialogue?"),
        ]
    );
    assert_eq!(
        requests[1].messages[0].content,
        compose_instruction(Genre::Fantasy, Mode::Feedback)
    );
}

#[tokio::test]
async fn instruction_follows_store_genre() {
    let (service, convo) = driver(Scripted::default().reply("ok"));
    convo.store().select_genre(Genre::Horror);

    convo.send(Mode::GenreTransform, "Reimagine my fantasy story as a thriller").await;

    let requests = service.chat_requests.lock().unwrap();
    assert_eq!(
        requests[0].messages[0].content,
        compose_instruction(Genre::Horror, Mode::GenreTransform)
    );
}

#[tokio::test]
async fn history_window_trims_oldest_messages() {
    let config = MuseConfig {
        history_window: Some(2),
        ..MuseConfig::default()
    };
    let (service, convo) = driver_with(
        Scripted::default().reply("a1").reply("a2"),
        config,
    );

    convo.send(Mode::InteractiveStory, "u1").await;
    convo.send(Mode::InteractiveStory, "u2").await;

    let requests = service.chat_requests.lock().unwrap();
    let contents: Vec<&str> = requests[1]
        .messages
        .iter()
        .skip(1)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["u1", "a1", "u2"]);
    assert_eq!(convo.store().messages().len(), 4);
}

#[tokio::test]
async fn story_choices_are_attached_but_not_sent_back() {
    let reply = "You stand at the edge of the forest.\n\nWhat do you do?\n1. Enter the forest\n2. Follow the river";
    let (service, convo) = driver(Scripted::default().reply(reply).reply("next"));

    let message = convo.send(Mode::InteractiveStory, "Begin").await.unwrap();
    assert_eq!(
        message.choices,
        Some(vec!["Enter the forest".to_string(), "Follow the river".to_string()])
    );

    convo.send(Mode::InteractiveStory, "Enter the forest").await;
    let requests = service.chat_requests.lock().unwrap();
    assert_eq!(requests[1].messages[2].content, reply);
}

#[tokio::test]
async fn feedback_replies_have_no_choices() {
    let reply = "What do you do?\n1. Cut the prologue\n2. Start in scene";
    let (_, convo) = driver(Scripted::default().reply(reply));
    let message = convo.send(Mode::Feedback, "Is my pacing too slow?").await.unwrap();
    assert!(message.choices.is_none());
}

// ── Failures ─────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_turn_stores_exactly_one_apology() {
    let (_, convo) = driver(Scripted::default().fail(GenerationError::Api {
        status: 500,
        body: "boom".into(),
    }));

    let reply = convo.send(Mode::InteractiveStory, "Hello").await.unwrap();
    assert_eq!(reply.content, CHAT_APOLOGY);
    assert!(reply.image_url.is_none());

    let messages = convo.store().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, CHAT_APOLOGY);
}

#[tokio::test]
async fn blank_reply_counts_as_failure() {
    let (_, convo) = driver(Scripted::default().reply("   "));
    let reply = convo.send(Mode::GoalSetting, "Suggest daily writing challenges").await.unwrap();
    assert_eq!(reply.content, CHAT_APOLOGY);
}

#[tokio::test]
async fn network_failure_is_recovered() {
    let (_, convo) = driver(
        Scripted::default()
            .fail(GenerationError::Network("timed out".into()))
            .reply("back online"),
    );
    convo.send(Mode::InteractiveStory, "first").await;
    let reply = convo.send(Mode::InteractiveStory, "second").await.unwrap();
    assert_eq!(reply.content, "back online");
    assert_eq!(convo.store().messages().len(), 4);
}

// ── Ordering ─────────────────────────────────────────────────────────

#[tokio::test]
async fn overlapping_turns_are_serialized() {
    let (service, convo) = driver(
        Scripted::default()
            .reply_after(Duration::from_millis(50), Ok("slow".into()))
            .reply("fast"),
    );

    let (first, second) = tokio::join!(
        convo.send(Mode::InteractiveStory, "one"),
        convo.send(Mode::InteractiveStory, "two"),
    );
    assert_eq!(first.unwrap().content, "slow");
    assert_eq!(second.unwrap().content, "fast");

    let contents: Vec<String> = convo
        .store()
        .messages()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["one", "slow", "two", "fast"]);

    let requests = service.chat_requests.lock().unwrap();
    assert_eq!(requests[1].messages.len(), 4);
}

#[tokio::test]
async fn timestamps_never_decrease() {
    let (_, convo) = driver(Scripted::default().reply("a").reply("b").reply("c"));
    for text in ["x", "y", "z"] {
        convo.send(Mode::InteractiveStory, text).await;
    }
    let messages = convo.store().messages();
    assert!(messages.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

// ── Genre switching ──────────────────────────────────────────────────

#[tokio::test]
async fn switching_genre_starts_fresh_conversation() {
    let (service, convo) = driver(Scripted::default().reply("old").reply("new"));
    convo.send(Mode::InteractiveStory, "fantasy turn").await;

    assert!(convo.switch_genre(Genre::ScienceFiction).await);
    assert!(convo.store().messages().is_empty());
    assert!(!convo.switch_genre(Genre::ScienceFiction).await);

    convo.send(Mode::InteractiveStory, "space turn").await;
    let requests = service.chat_requests.lock().unwrap();
    assert_eq!(requests[1].messages.len(), 2);
    assert_eq!(
        requests[1].messages[0].content,
        compose_instruction(Genre::ScienceFiction, Mode::InteractiveStory)
    );
}

// ── Illustration ─────────────────────────────────────────────────────

#[tokio::test]
async fn illustration_uses_recent_context_and_genre_style() {
    let (service, convo) = driver(
        Scripted::default()
            .reply("A dragon circles the tower.")
            .image(Ok("https://images.example/scene.png".into())),
    );
    convo.store().select_genre(Genre::Mystery);
    convo.send(Mode::InteractiveStory, "Look up").await;

    let message = convo.illustrate().await.unwrap();
    assert_eq!(message.content, IMAGE_CAPTION);
    assert_eq!(message.image_url.as_deref(), Some("https://images.example/scene.png"));

    let requests = service.image_requests.lock().unwrap();
    let request = &requests[0];
    assert_eq!(request.model, "dall-e-3");
    assert_eq!(request.size, "1024x1024");
    assert_eq!(request.quality, "standard");
    assert_eq!(request.n, 1);
    assert!(request.prompt.contains("Look up A dragon circles the tower."));
    assert!(request.prompt.contains("noir-inspired mystery aesthetic"));
}

#[tokio::test]
async fn failed_illustration_stores_apology_without_image() {
    let (_, convo) = driver(
        Scripted::default()
            .reply("scene")
            .image(Err(GenerationError::Malformed("no data".into()))),
    );
    convo.send(Mode::InteractiveStory, "Paint it").await;

    let message = convo.illustrate().await.unwrap();
    assert_eq!(message.content, IMAGE_APOLOGY);
    assert!(message.image_url.is_none());
    assert_eq!(convo.store().messages().len(), 3);
}

#[tokio::test]
async fn nothing_to_illustrate_skips_service() {
    let (service, convo) = driver(Scripted::default());
    assert!(convo.illustrate().await.is_none());
    assert!(service.image_requests.lock().unwrap().is_empty());
    assert!(convo.store().messages().is_empty());
}
