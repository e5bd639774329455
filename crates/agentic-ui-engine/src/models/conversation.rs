use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::parsing::parse;
use crate::schema::Schema;

/// Who authored a bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Which side of the list a bubble is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Left,
    Right,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// User messages sit on the right, everything else on the left.
    pub fn placement(self) -> Placement {
        match self {
            Role::User => Placement::Right,
            Role::Assistant | Role::System => Placement::Left,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" | "bot" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// One chat message, its content still in markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bubble {
    pub role: Role,
    pub content: String,
}

impl Bubble {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn schema(&self) -> Schema {
        parse(&self.content).schema
    }
}

/// An ordered list of bubbles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    bubbles: Vec<Bubble>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bubble: Bubble) {
        self.bubbles.push(bubble);
    }

    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    pub fn last_mut(&mut self) -> Option<&mut Bubble> {
        self.bubbles.last_mut()
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    /// Role names in order, as fed to a lazy list.
    pub fn roles(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bubbles.iter().map(|b| b.role.as_str())
    }
}

impl FromIterator<Bubble> for Conversation {
    fn from_iter<I: IntoIterator<Item = Bubble>>(iter: I) -> Self {
        Self {
            bubbles: iter.into_iter().collect(),
        }
    }
}
