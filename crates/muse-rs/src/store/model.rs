//! Records held by the session store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ChatRole;
use crate::prompt::Genre;

/// Author of a stored message.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl From<Role> for ChatRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => ChatRole::User,
            Role::Assistant => ChatRole::Assistant,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One turn of conversation. Append-only.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Suggested next actions, shown to the user but never sent back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A chapter, owned by exactly one project.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Supplied by the caller, not derived from `content`.
    pub word_count: u32,
    pub created_at: DateTime<Utc>,
}

/// A user-authored writing project.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub genre: Genre,
    pub description: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Sum of the caller-supplied chapter word counts.
    pub fn word_count(&self) -> u64 {
        self.chapters.iter().map(|c| u64::from(c.word_count)).sum()
    }
}

/// Partial update for [`Project`]; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectUpdate {
    pub title: Option<String>,
    pub genre: Option<Genre>,
    pub description: Option<String>,
}

impl ProjectUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.genre.is_none() && self.description.is_none()
    }
}

/// A writing goal with a completion flag.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate root and unit of persistence.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Session {
    pub messages: Vec<Message>,
    pub genre: Genre,
    pub projects: Vec<Project>,
    pub goals: Vec<Goal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_project_id: Option<String>,
}

impl Session {
    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn goal(&self, id: &str) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    /// The project the current-project reference points at, if any.
    pub fn current_project(&self) -> Option<&Project> {
        self.current_project_id
            .as_deref()
            .and_then(|id| self.project(id))
    }

    /// Latest instant recorded anywhere in the session.
    pub(crate) fn latest_instant(&self) -> Option<DateTime<Utc>> {
        let messages = self.messages.iter().map(|m| m.timestamp);
        let projects = self.projects.iter().flat_map(|p| {
            std::iter::once(p.created_at)
                .chain(std::iter::once(p.updated_at))
                .chain(p.chapters.iter().map(|c| c.created_at))
        });
        let goals = self.goals.iter().map(|g| g.created_at);
        messages.chain(projects).chain(goals).max()
    }
}
