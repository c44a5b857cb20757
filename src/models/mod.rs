use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use crate::codec;
use crate::error::ValidationError;

pub const UNTITLED_POLL: &str = "Untitled Poll";
pub const UNTITLED_OPTION: &str = "Option";

// Content type the poll service expects on authored polls
pub const CONTENT_TYPE: &str = "lexical";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    // Serialized document, HTML or legacy plain text
    #[serde(default, deserialize_with = "text_or_document")]
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_html: Option<String>,
    #[serde(default)]
    pub options: Vec<PollOption>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub allow_multiple_votes: bool,
    #[serde(default, deserialize_with = "vote_count")]
    pub total_votes: u64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, deserialize_with = "text_or_document")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, deserialize_with = "vote_count")]
    pub votes: u64,
}

impl Poll {
    pub fn is_multiple_vote_mode(&self) -> bool {
        self.allow_multiple_votes
    }

    pub fn option(&self, option_id: &str) -> Option<&PollOption> {
        self.options.iter().find(|option| option.id == option_id)
    }

    pub fn tallied_votes(&self) -> u64 {
        self.options.iter().map(|option| option.votes).sum()
    }

    /// Bring `total_votes` in line with the option tallies. Applied to every
    /// poll that enters the store from outside.
    pub fn normalized(mut self) -> Self {
        let tallied = self.tallied_votes();
        if tallied != self.total_votes {
            warn!(
                "Poll {} reported totalVotes={} but options sum to {}; using option sum",
                self.id, self.total_votes, tallied
            );
            self.total_votes = tallied;
        }
        self
    }

    // Returns false when the option does not exist
    pub fn add_vote(&mut self, option_id: &str) -> bool {
        match self.options.iter_mut().find(|option| option.id == option_id) {
            Some(option) => {
                option.votes += 1;
                self.total_votes += 1;
                true
            }
            None => false,
        }
    }

    // Floors at zero; returns false when nothing was decremented
    pub fn remove_vote(&mut self, option_id: &str) -> bool {
        match self.options.iter_mut().find(|option| option.id == option_id) {
            Some(option) if option.votes > 0 => {
                option.votes -= 1;
                self.total_votes = self.total_votes.saturating_sub(1);
                true
            }
            _ => false,
        }
    }

    pub fn question_text(&self) -> String {
        codec::display_text(&self.question, UNTITLED_POLL)
    }

    pub fn question_html(&self) -> String {
        match &self.question_html {
            Some(html) if !html.trim().is_empty() => html.clone(),
            _ if !self.question.trim().is_empty() => codec::decode_to_html(&self.question),
            _ => format!("<p>{}</p>", UNTITLED_POLL),
        }
    }
}

impl PollOption {
    pub fn label(&self) -> String {
        codec::display_text(&self.text, UNTITLED_OPTION)
    }
}

/// Payload for creating or updating a poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDraft {
    pub question: String,
    pub question_html: String,
    pub options: Vec<String>,
    pub is_active: bool,
    pub allow_multiple_votes: bool,
    pub content_type: String,
}

impl PollDraft {
    pub fn new(question: impl Into<String>, options: Vec<String>) -> Self {
        let question = question.into();
        Self {
            question_html: codec::decode_to_html(&question),
            question,
            options,
            is_active: true,
            allow_multiple_votes: true,
            content_type: CONTENT_TYPE.to_string(),
        }
    }

    /// Draft from an edited question document; the question is sent as plain
    /// text with the rendered HTML alongside.
    pub fn from_document(question: &codec::Document, options: Vec<String>) -> Self {
        Self {
            question: question.plain_text(),
            question_html: question.to_html(),
            ..Self::new(String::new(), options)
        }
    }

    /// Draft pre-filled from an existing poll, for editing.
    pub fn from_poll(poll: &Poll) -> Self {
        Self {
            question: codec::decode_to_plain_text(&poll.question),
            question_html: poll.question_html.clone().unwrap_or_default(),
            options: poll.options.iter().map(|option| option.text.clone()).collect(),
            is_active: poll.is_active,
            allow_multiple_votes: poll.allow_multiple_votes,
            content_type: CONTENT_TYPE.to_string(),
        }
    }

    pub fn single_choice(mut self) -> Self {
        self.allow_multiple_votes = false;
        self
    }

    /// Trim the question, drop blank options, and enforce the minimums.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        self.question = self.question.trim().to_string();
        if self.question.is_empty() {
            return Err(ValidationError::MissingQuestion);
        }
        self.options.retain(|option| !option.trim().is_empty());
        if self.options.len() < 2 {
            return Err(ValidationError::TooFewOptions);
        }
        Ok(self)
    }
}

fn default_true() -> bool {
    true
}

// `true` or `"true"` enable multiple votes; any other value does not
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(matches!(value, serde_json::Value::Bool(true))
        || matches!(value.as_str(), Some("true")))
}

// Negative, fractional or missing counts read as zero
fn vote_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_u64().unwrap_or(0))
}

// A document may arrive embedded as an object instead of its string form
fn text_or_document<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
