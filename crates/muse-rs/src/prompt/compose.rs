//! Instruction and payload composition.
//!
//! Everything here is pure: the same genre, mode and history always produce
//! the same text.

use super::builder::InstructionBuilder;
use super::catalog::{Genre, Mode};
use crate::ChatMessage;
use crate::store::Message;

pub const PREAMBLE: &str = "You are a Creative Mentor AI, a personalized storytelling companion and creative coach. Your role is to inspire, guide, and challenge aspiring writers, filmmakers, and artists.";

pub const GENERAL_GUIDELINES_HEADING: &str = "General Guidelines";

pub const GENERAL_GUIDELINES: &[&str] = &[
    "Be enthusiastic and supportive while maintaining high creative standards",
    "Ask questions to understand the user's vision and goals",
    "Provide specific examples and concrete suggestions",
    "Adapt your tone to match the user's experience level",
    "Encourage experimentation and creative risks",
    "Remember previous context in the conversation",
    "Use formatting (bold, italics) to emphasize key points",
];

/// Number of trailing messages used as illustration context.
pub const IMAGE_CONTEXT_MESSAGES: usize = 3;

/// Character cap on the illustration context.
pub const IMAGE_CONTEXT_CHARS: usize = 500;

/// The phrase that closes every interactive-story segment.
pub const CHOICE_PROMPT: &str = "What do you do?";

/// Build the mentor instruction for a genre and mode.
///
/// Preamble, genre clause, mode block and general guidelines, separated by
/// blank lines.
pub fn compose_instruction(genre: Genre, mode: Mode) -> String {
    let profile = mode.profile();
    InstructionBuilder::new(PREAMBLE)
        .paragraph(genre.clause())
        .block(profile.heading, profile.directives)
        .block(GENERAL_GUIDELINES_HEADING, GENERAL_GUIDELINES)
        .build()
}

/// Like [`compose_instruction`], for untyped names. Unknown or missing
/// values fall back to fantasy and interactive storytelling.
pub fn compose_instruction_from(genre: Option<&str>, mode: Option<&str>) -> String {
    compose_instruction(
        Genre::from_name_or_default(genre),
        Mode::from_name_or_default(mode),
    )
}

/// Outbound payload: the instruction, every prior message in order, then
/// the new user turn.
pub fn assemble_request(instruction: &str, history: &[Message], user_turn: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(instruction));
    messages.extend(history.iter().map(|m| ChatMessage {
        role: m.role.into(),
        content: m.content.clone(),
    }));
    messages.push(ChatMessage::user(user_turn));
    messages
}

/// Illustration prompt for the tail of the conversation.
///
/// Returns `None` when there is nothing to illustrate.
pub fn compose_image_prompt(history: &[Message], genre: Genre) -> Option<String> {
    let start = history.len().saturating_sub(IMAGE_CONTEXT_MESSAGES);
    let recent: Vec<&str> = history
        .get(start..)
        .unwrap_or_default()
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    if recent.iter().all(|c| c.trim().is_empty()) {
        return None;
    }
    let context: String = recent.join(" ").chars().take(IMAGE_CONTEXT_CHARS).collect();
    let scene = format!("Based on this story: {context}. Create a scene illustration.");
    Some(format!(
        "{}. Style: {}, highly detailed, cinematic lighting, digital art",
        scene.trim_end_matches('.'),
        genre.image_style()
    ))
}

/// Pull the numbered or bulleted options around the last "What do you do?".
///
/// Options listed after the question win; otherwise the list immediately
/// before it is used. Only 2 to 4 options count as a choice set.
pub fn extract_choices(reply: &str) -> Option<Vec<String>> {
    let lines: Vec<&str> = reply.lines().collect();
    let marker = lines
        .iter()
        .rposition(|l| l.to_lowercase().contains("what do you do"))?;

    let after: Vec<String> = lines
        .iter()
        .skip(marker + 1)
        .skip_while(|l| l.trim().is_empty())
        .map_while(|l| list_item(l))
        .collect();

    let options = if after.is_empty() {
        let mut before: Vec<String> = lines
            .iter()
            .take(marker)
            .rev()
            .skip_while(|l| l.trim().is_empty())
            .map_while(|l| list_item(l))
            .collect();
        before.reverse();
        before
    } else {
        after
    };

    (2..=4).contains(&options.len()).then_some(options)
}

fn list_item(line: &str) -> Option<String> {
    let line = line.trim();
    let rest = ["- ", "* ", "• "]
        .iter()
        .find_map(|bullet| line.strip_prefix(bullet))
        .or_else(|| {
            let digits = line.trim_start_matches(|c: char| c.is_ascii_digit());
            if digits.len() == line.len() {
                return None;
            }
            digits.strip_prefix(". ").or_else(|| digits.strip_prefix(") "))
        })?;
    let text = rest.trim().trim_matches('*').trim();
    (!text.is_empty()).then(|| text.to_string())
}
