//! In-memory collection of polls exposed to consumers.
//!
//! The store is only mutated through [`StoreCommand`]s, and only the engine
//! issues them. Commands that name a poll or option the store does not hold
//! are no-ops.

use log::debug;

use crate::models::Poll;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCommand {
    /// Replace the whole collection (initial fetch).
    ReplaceAll(Vec<Poll>),
    /// Add a poll at the front, or replace it in place if already held.
    Insert(Poll),
    /// Replace a held poll with an authoritative copy.
    Replace(Poll),
    /// Drop a poll and clear the selection if it pointed at it.
    Remove(String),
    /// Optimistic increment of one option's tally.
    AddVote { poll_id: String, option_id: String },
    /// Optimistic decrement of one option's tally, floored at zero. Reports
    /// no change when the tally was already zero.
    RemoveVote { poll_id: String, option_id: String },
    Select(Option<String>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollStore {
    polls: Vec<Poll>,
    selected: Option<String>,
}

impl PollStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    pub fn poll(&self, poll_id: &str) -> Option<&Poll> {
        self.polls.iter().find(|poll| poll.id == poll_id)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_poll(&self) -> Option<&Poll> {
        self.selected.as_deref().and_then(|id| self.poll(id))
    }

    fn poll_mut(&mut self, poll_id: &str) -> Option<&mut Poll> {
        self.polls.iter_mut().find(|poll| poll.id == poll_id)
    }

    /// Apply a command. Returns whether anything changed.
    pub(crate) fn apply(&mut self, command: StoreCommand) -> bool {
        match command {
            StoreCommand::ReplaceAll(polls) => {
                self.polls = polls;
                true
            }
            StoreCommand::Insert(poll) => match self.poll_mut(&poll.id) {
                Some(existing) => {
                    let changed = *existing != poll;
                    *existing = poll;
                    changed
                }
                None => {
                    self.polls.insert(0, poll);
                    true
                }
            },
            StoreCommand::Replace(poll) => match self.poll_mut(&poll.id) {
                Some(existing) => {
                    let changed = *existing != poll;
                    *existing = poll;
                    changed
                }
                None => {
                    debug!("Ignoring update for unknown poll {}", poll.id);
                    false
                }
            },
            StoreCommand::Remove(poll_id) => {
                let before = self.polls.len();
                self.polls.retain(|poll| poll.id != poll_id);
                if self.selected.as_deref() == Some(poll_id.as_str()) {
                    self.selected = None;
                }
                before != self.polls.len()
            }
            StoreCommand::AddVote { poll_id, option_id } => self
                .poll_mut(&poll_id)
                .map(|poll| poll.add_vote(&option_id))
                .unwrap_or(false),
            StoreCommand::RemoveVote { poll_id, option_id } => self
                .poll_mut(&poll_id)
                .map(|poll| poll.remove_vote(&option_id))
                .unwrap_or(false),
            StoreCommand::Select(poll_id) => {
                let changed = self.selected != poll_id;
                self.selected = poll_id;
                changed
            }
        }
    }
}
