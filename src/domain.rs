// Domain types shared by the pipeline and its collaborators
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Single-use capability that addresses exactly one reply.
/// Not `Clone`: handing it to the transport consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct ReplyToken(String);

impl ReplyToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// One completed image generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user_id: UserId,
    pub original_text: String,
    pub translated_text: Option<String>,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// A quick-reply suggestion: `label` is shown, `text` is sent when tapped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionExample {
    pub label: String,
    pub text: String,
}

impl QuestionExample {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.label.trim().is_empty() || self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleTableKind {
    Curated,
    Categorized,
}

/// Values available for one named category of phrase parts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhraseCategory {
    pub name: String,
    pub values: Vec<String>,
}

/// Read-only reference data behind the suggestion sampler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExampleTable {
    Curated(Vec<QuestionExample>),
    Categorized(Vec<PhraseCategory>),
}

impl ExampleTable {
    pub fn category(&self, name: &str) -> Option<&PhraseCategory> {
        match self {
            ExampleTable::Categorized(categories) => categories.iter().find(|c| c.name == name),
            ExampleTable::Curated(_) => None,
        }
    }
}
