//! Prompt composition.
//!
//! - [`catalog`]: the [`Genre`] and [`Mode`] sets with their fixed clauses,
//!   instruction blocks, illustration styles and starter prompts.
//! - [`builder`]: [`InstructionBuilder`], which joins a preamble, paragraphs
//!   and bullet blocks into one instruction.
//! - [`compose`]: the pure functions that turn (genre, mode, history) into
//!   an outbound payload or an illustration prompt.

pub mod builder;
pub mod catalog;
pub mod compose;

pub use builder::InstructionBuilder;
pub use catalog::{Genre, Mode, ModeProfile};
pub use compose::{
    assemble_request, compose_image_prompt, compose_instruction, compose_instruction_from,
    extract_choices,
};
