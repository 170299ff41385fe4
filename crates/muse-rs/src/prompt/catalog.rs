//! The closed sets of genres and conversation modes.
//!
//! Both enums parse leniently: the persisted short names (`scifi`, `story`,
//! `goals`, `whatif`) and the long aliases (`science-fiction`,
//! `interactive-story`, `goal-setting`, `genre-transform`) are accepted in any
//! case. Anything else falls back to [`Genre::default`] / [`Mode::default`]
//! wherever a value is required, so the composer never fails.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::builder::render_block;

// ── Genre ──────────────────────────────────────────────────────────

/// Fictional-content domain governing tone and illustration style.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Genre {
    #[default]
    Fantasy,
    #[serde(rename = "scifi")]
    ScienceFiction,
    Romance,
    Thriller,
    Comedy,
    Horror,
    Mystery,
    Adventure,
}

impl Genre {
    pub const ALL: [Genre; 8] = [
        Genre::Fantasy,
        Genre::ScienceFiction,
        Genre::Romance,
        Genre::Thriller,
        Genre::Comedy,
        Genre::Horror,
        Genre::Mystery,
        Genre::Adventure,
    ];

    /// Short name used in persisted sessions.
    pub fn as_str(self) -> &'static str {
        match self {
            Genre::Fantasy => "fantasy",
            Genre::ScienceFiction => "scifi",
            Genre::Romance => "romance",
            Genre::Thriller => "thriller",
            Genre::Comedy => "comedy",
            Genre::Horror => "horror",
            Genre::Mystery => "mystery",
            Genre::Adventure => "adventure",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Genre::Fantasy => "Fantasy",
            Genre::ScienceFiction => "Sci-Fi",
            Genre::Romance => "Romance",
            Genre::Thriller => "Thriller",
            Genre::Comedy => "Comedy",
            Genre::Horror => "Horror",
            Genre::Mystery => "Mystery",
            Genre::Adventure => "Adventure",
        }
    }

    /// The sentence placed after the preamble of every instruction.
    pub fn clause(self) -> &'static str {
        match self {
            Genre::Fantasy => {
                "You specialize in epic fantasy worlds with magic systems, mythical creatures, and heroic quests."
            }
            Genre::ScienceFiction => {
                "You excel at science fiction narratives with advanced technology, space exploration, and speculative concepts."
            }
            Genre::Romance => {
                "You craft emotionally compelling romance stories with deep character connections and relationship dynamics."
            }
            Genre::Thriller => {
                "You create suspenseful, high-stakes thrillers with plot twists and tension-building narratives."
            }
            Genre::Comedy => {
                "You write humorous, witty stories with comedic timing and clever dialogue."
            }
            Genre::Horror => {
                "You develop atmospheric horror with psychological tension, dread, and supernatural elements."
            }
            Genre::Mystery => {
                "You construct intricate mystery plots with clues, red herrings, and satisfying revelations."
            }
            Genre::Adventure => {
                "You design exciting adventure narratives with exploration, discovery, and daring exploits."
            }
        }
    }

    /// Art-direction clause appended to illustration prompts.
    pub fn image_style(self) -> &'static str {
        match self {
            Genre::Fantasy => "epic fantasy art with magical elements and ethereal atmosphere",
            Genre::ScienceFiction => "futuristic sci-fi concept art with advanced technology",
            Genre::Romance => "romantic and dreamy artistic style with soft lighting",
            Genre::Thriller => "dark and moody atmosphere with dramatic shadows",
            Genre::Comedy => "vibrant and whimsical art style with expressive characters",
            Genre::Horror => "dark horror aesthetic with eerie atmosphere and unsettling elements",
            Genre::Mystery => "noir-inspired mystery aesthetic with dramatic lighting",
            Genre::Adventure => "dynamic adventure art with sense of exploration and excitement",
        }
    }

    /// Parse a genre name, returning `None` for anything outside the set.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "fantasy" => Some(Genre::Fantasy),
            "scifi" | "sci-fi" | "science-fiction" | "science_fiction" | "sciencefiction" => {
                Some(Genre::ScienceFiction)
            }
            "romance" => Some(Genre::Romance),
            "thriller" => Some(Genre::Thriller),
            "comedy" => Some(Genre::Comedy),
            "horror" => Some(Genre::Horror),
            "mystery" => Some(Genre::Mystery),
            "adventure" => Some(Genre::Adventure),
            _ => None,
        }
    }

    /// Parse an optional name, falling back to the default genre.
    pub fn from_name_or_default(name: Option<&str>) -> Self {
        name.and_then(Self::parse).unwrap_or_default()
    }
}

impl From<String> for Genre {
    fn from(name: String) -> Self {
        Self::from_name_or_default(Some(&name))
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|g| g.as_str()).collect();
            format!("unknown genre '{s}' (expected one of: {})", known.join(", "))
        })
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Mode ───────────────────────────────────────────────────────────

/// Conversational behavior profile governing how replies are structured.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(from = "String")]
pub enum Mode {
    #[default]
    #[serde(rename = "story")]
    InteractiveStory,
    #[serde(rename = "feedback")]
    Feedback,
    #[serde(rename = "goals")]
    GoalSetting,
    #[serde(rename = "whatif")]
    GenreTransform,
}

/// Heading and directives that make up a mode's instruction block.
#[derive(Debug, Clone, Copy)]
pub struct ModeProfile {
    pub heading: &'static str,
    pub directives: &'static [&'static str],
}

const STORY_PROFILE: ModeProfile = ModeProfile {
    heading: "Interactive Storytelling Mode",
    directives: &[
        "Create dynamic, choose-your-own-adventure style narratives",
        "Present 2-4 compelling choices at key decision points",
        "Adapt the story based on user selections",
        "Weave in unexpected twists and character backstories",
        "Use vivid, sensory language that immerses the reader",
        "Keep paragraphs concise (3-5 sentences) for better engagement",
        "End each segment with choices formatted as: \"What do you do?\"",
    ],
};

const FEEDBACK_PROFILE: ModeProfile = ModeProfile {
    heading: "Creative Feedback Mode",
    directives: &[
        "Provide constructive, actionable critique on writing samples",
        "Analyze plot structure, character arcs, dialogue, and pacing",
        "Suggest specific improvements while honoring the writer's voice",
        "Point out strengths and weaknesses with examples",
        "Offer alternative approaches or solutions",
        "Be encouraging but honest",
        "Focus on 2-3 key areas per feedback session",
    ],
};

const GOALS_PROFILE: ModeProfile = ModeProfile {
    heading: "Goal-Setting & Mentorship Mode",
    directives: &[
        "Help users break down large creative projects into manageable tasks",
        "Suggest daily/weekly micro-goals and challenges",
        "Provide motivation and accountability strategies",
        "Celebrate progress and milestones",
        "Offer realistic timelines and expectations",
        "Adapt suggestions to the user's skill level and time availability",
    ],
};

const WHATIF_PROFILE: ModeProfile = ModeProfile {
    heading: "Genre-Switching \"What-If\" Mode",
    directives: &[
        "Take the user's existing story elements and reimagine them in a different genre",
        "Preserve core characters and their essential traits",
        "Transform settings, tone, and plot to fit the new genre",
        "Highlight what changes and what stays the same",
        "Make the transition creative and surprising",
        "Explain the adaptation choices you made",
    ],
};

impl Mode {
    pub const ALL: [Mode; 4] = [
        Mode::InteractiveStory,
        Mode::Feedback,
        Mode::GoalSetting,
        Mode::GenreTransform,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::InteractiveStory => "story",
            Mode::Feedback => "feedback",
            Mode::GoalSetting => "goals",
            Mode::GenreTransform => "whatif",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::InteractiveStory => "Story",
            Mode::Feedback => "Feedback",
            Mode::GoalSetting => "Goals",
            Mode::GenreTransform => "What-If",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Mode::InteractiveStory => "Interactive storytelling",
            Mode::Feedback => "Creative critique",
            Mode::GoalSetting => "Set challenges",
            Mode::GenreTransform => "Genre switch",
        }
    }

    pub fn profile(self) -> ModeProfile {
        match self {
            Mode::InteractiveStory => STORY_PROFILE,
            Mode::Feedback => FEEDBACK_PROFILE,
            Mode::GoalSetting => GOALS_PROFILE,
            Mode::GenreTransform => WHATIF_PROFILE,
        }
    }

    /// The rendered block exactly as it appears inside the instruction.
    pub fn instruction_block(self) -> String {
        let profile = self.profile();
        render_block(profile.heading, profile.directives)
    }

    /// Suggested openings shown before the first turn.
    pub fn starter_prompts(self) -> [&'static str; 3] {
        match self {
            Mode::InteractiveStory => [
                "Start a story about a reluctant hero",
                "I discover a mysterious door in my attic",
                "Write about two rivals who must work together",
            ],
            Mode::Feedback => [
                "Review this opening chapter...",
                "How can I improve my dialogue?",
                "Is my pacing too slow?",
            ],
            Mode::GoalSetting => [
                "Help me set a writing goal for this week",
                "I want to finish a short story in 7 days",
                "Suggest daily writing challenges",
            ],
            Mode::GenreTransform => [
                "Reimagine my fantasy story as a thriller",
                "Turn this romance into a sci-fi adventure",
                "What if my detective story was a comedy?",
            ],
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "story" | "interactive-story" | "interactive_story" | "interactive" => {
                Some(Mode::InteractiveStory)
            }
            "feedback" => Some(Mode::Feedback),
            "goals" | "goal-setting" | "goal_setting" | "goal" => Some(Mode::GoalSetting),
            "whatif" | "what-if" | "genre-transform" | "genre_transform" => {
                Some(Mode::GenreTransform)
            }
            _ => None,
        }
    }

    pub fn from_name_or_default(name: Option<&str>) -> Self {
        name.and_then(Self::parse).unwrap_or_default()
    }
}

impl From<String> for Mode {
    fn from(name: String) -> Self {
        Self::from_name_or_default(Some(&name))
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
            format!("unknown mode '{s}' (expected one of: {})", known.join(", "))
        })
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
