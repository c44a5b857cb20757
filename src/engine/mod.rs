//! Vote synchronization: keeps the ledger, the poll store and the poll
//! service consistent while votes are toggled and broadcasts arrive.
//!
//! Every vote change is two-phase. The ledger and the store are updated
//! optimistically, then the service call either confirms it (the store takes
//! the service's poll and the result is broadcast) or fails (both the ledger
//! and the tally are rolled back). At most one toggle per poll is in flight.

mod in_flight;

pub use in_flight::{InFlight, InFlightGuard};

use log::{error, info, warn};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::channel::{Broadcaster, InboundEvent, OutboundEvent};
use crate::error::EngineError;
use crate::ledger::VoteLedger;
use crate::models::{Poll, PollDraft};
use crate::remote::PollService;
use crate::store::{PollStore, StoreCommand};
use crate::tally::{self, TallyRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Voted,
    Unvoted,
    /// Single-choice poll: the earlier vote was withdrawn in favour of this one.
    Replaced { previous: Vec<String> },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    PollNotFound,
    OptionNotFound,
    PollInactive,
    /// Another toggle on the same poll has not finished.
    InFlight,
}

pub struct VoteEngine {
    store: RwLock<PollStore>,
    ledger: Arc<dyn VoteLedger>,
    service: Arc<dyn PollService>,
    channel: Arc<dyn Broadcaster>,
    in_flight: InFlight,
}

impl VoteEngine {
    pub fn new(
        ledger: Arc<dyn VoteLedger>,
        service: Arc<dyn PollService>,
        channel: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            store: RwLock::new(PollStore::new()),
            ledger,
            service,
            channel,
            in_flight: InFlight::new(),
        }
    }

    // --- Reads ---

    pub fn polls(&self) -> Vec<Poll> {
        self.store.read().polls().to_vec()
    }

    pub fn poll(&self, poll_id: &str) -> Option<Poll> {
        self.store.read().poll(poll_id).cloned()
    }

    pub fn selected_poll(&self) -> Option<Poll> {
        self.store.read().selected_poll().cloned()
    }

    pub fn snapshot(&self) -> PollStore {
        self.store.read().clone()
    }

    pub async fn user_votes(&self, poll_id: &str) -> Vec<String> {
        self.ledger.get(poll_id).await
    }

    pub async fn has_voted(&self, poll_id: &str, option_id: &str) -> bool {
        self.ledger.has(poll_id, option_id).await
    }

    /// The option whose vote is being processed for this poll, if any.
    pub fn pending_option(&self, poll_id: &str) -> Option<String> {
        self.in_flight.option_for(poll_id)
    }

    pub async fn tally(&self, poll_id: &str) -> Option<Vec<TallyRow>> {
        let poll = self.poll(poll_id)?;
        let mine = self.ledger.get(poll_id).await;
        Some(tally::tally(&poll, &mine))
    }

    pub async fn summary(&self, poll_id: &str) -> Option<String> {
        let poll = self.poll(poll_id)?;
        let mine = self.ledger.get(poll_id).await;
        Some(tally::summary(&poll, &mine))
    }

    // --- Voting ---

    /// Toggle this client's vote for `option_id`.
    ///
    /// Already voted: the vote is withdrawn. Not voted on a single-choice poll
    /// that holds another vote: that vote is withdrawn first (best effort) and
    /// this one cast. Otherwise a plain vote is cast. Remote failures roll the
    /// optimistic changes back and are returned.
    pub async fn toggle_vote(&self, poll_id: &str, option_id: &str) -> Result<ToggleOutcome, EngineError> {
        let poll = self.poll(poll_id);
        let poll = match poll {
            Some(poll) => poll,
            None => return Ok(ToggleOutcome::Skipped(SkipReason::PollNotFound)),
        };
        if !poll.is_active {
            return Ok(ToggleOutcome::Skipped(SkipReason::PollInactive));
        }
        if poll.option(option_id).is_none() {
            return Ok(ToggleOutcome::Skipped(SkipReason::OptionNotFound));
        }
        let _guard = match self.in_flight.begin(poll_id, option_id) {
            Some(guard) => guard,
            None => {
                info!("Vote on poll {} already in progress, ignoring toggle of {}", poll_id, option_id);
                return Ok(ToggleOutcome::Skipped(SkipReason::InFlight));
            }
        };

        let before = self.ledger.get(poll_id).await;

        if before.iter().any(|id| id == option_id) {
            self.unvote(poll_id, option_id, &before).await?;
            Ok(ToggleOutcome::Unvoted)
        } else if !poll.is_multiple_vote_mode() && !before.is_empty() {
            self.replace_vote(poll_id, option_id, &before).await?;
            Ok(ToggleOutcome::Replaced { previous: before })
        } else {
            self.cast_vote(poll_id, option_id, &before).await?;
            Ok(ToggleOutcome::Voted)
        }
    }

    async fn unvote(&self, poll_id: &str, option_id: &str, before: &[String]) -> Result<(), EngineError> {
        let remaining: Vec<String> = before.iter().filter(|id| *id != option_id).cloned().collect();
        self.ledger.set(poll_id, &remaining).await?;
        let decremented = self.apply(remove_vote(poll_id, option_id));

        match self.service.unvote(poll_id, option_id).await {
            Ok(updated) => {
                info!("Removed vote for option {} on poll {}", option_id, poll_id);
                self.confirm_vote(poll_id, option_id, updated);
                Ok(())
            }
            Err(e) => {
                warn!("Unvote of option {} on poll {} failed, rolling back: {}", option_id, poll_id, e);
                if decremented {
                    self.apply(add_vote(poll_id, option_id));
                }
                self.restore_ledger(poll_id, before).await;
                Err(e.into())
            }
        }
    }

    async fn cast_vote(&self, poll_id: &str, option_id: &str, before: &[String]) -> Result<(), EngineError> {
        let mut voted = before.to_vec();
        voted.push(option_id.to_string());
        self.ledger.set(poll_id, &voted).await?;
        let incremented = self.apply(add_vote(poll_id, option_id));

        match self.service.vote(poll_id, option_id).await {
            Ok(updated) => {
                info!("Recorded vote for option {} on poll {}", option_id, poll_id);
                self.confirm_vote(poll_id, option_id, updated);
                Ok(())
            }
            Err(e) => {
                warn!("Vote for option {} on poll {} failed, rolling back: {}", option_id, poll_id, e);
                if incremented {
                    self.apply(remove_vote(poll_id, option_id));
                }
                self.restore_ledger(poll_id, before).await;
                Err(e.into())
            }
        }
    }

    async fn replace_vote(&self, poll_id: &str, option_id: &str, before: &[String]) -> Result<(), EngineError> {
        // Previous votes the service has confirmed as withdrawn
        let mut released: Vec<String> = Vec::new();

        for previous in before {
            let decremented = self.apply(remove_vote(poll_id, previous));
            match self.service.unvote(poll_id, previous).await {
                Ok(updated) => {
                    info!("Withdrew previous vote {} on poll {}", previous, poll_id);
                    self.apply(StoreCommand::Replace(updated.normalized()));
                    released.push(previous.clone());
                }
                Err(e) => {
                    // Best effort: the new vote still goes ahead
                    warn!("Failed to withdraw previous vote {} on poll {}: {}", previous, poll_id, e);
                    if decremented {
                        self.apply(add_vote(poll_id, previous));
                    }
                }
            }
        }

        // What the ledger should hold if the new vote does not go through
        let fallback: Vec<String> = before.iter().filter(|id| !released.contains(id)).cloned().collect();

        if let Err(e) = self.ledger.set(poll_id, &[option_id.to_string()]).await {
            self.restore_ledger(poll_id, &fallback).await;
            return Err(e.into());
        }
        let incremented = self.apply(add_vote(poll_id, option_id));

        match self.service.vote(poll_id, option_id).await {
            Ok(updated) => {
                info!("Replaced vote on poll {} with option {}", poll_id, option_id);
                self.confirm_vote(poll_id, option_id, updated);
                Ok(())
            }
            Err(e) => {
                warn!("Vote for option {} on poll {} failed, rolling back: {}", option_id, poll_id, e);
                if incremented {
                    self.apply(remove_vote(poll_id, option_id));
                }
                self.restore_ledger(poll_id, &fallback).await;
                Err(e.into())
            }
        }
    }

    // Take the service's poll and tell the other clients about it
    fn confirm_vote(&self, poll_id: &str, option_id: &str, updated: Poll) {
        let updated = updated.normalized();
        self.apply(StoreCommand::Replace(updated.clone()));
        self.emit(OutboundEvent::VoteCast {
            poll_id: poll_id.to_string(),
            option_id: option_id.to_string(),
            updated_poll: updated,
        });
    }

    // Force the ledger back to `expected` if the rollback left it elsewhere
    async fn restore_ledger(&self, poll_id: &str, expected: &[String]) {
        let current = self.ledger.get(poll_id).await;
        if current == expected {
            return;
        }
        match self.ledger.set(poll_id, expected).await {
            Ok(()) => info!("Restored vote ledger for poll {} to {:?}", poll_id, expected),
            Err(e) => error!("Failed to restore vote ledger for poll {}: {}", poll_id, e),
        }
    }

    // --- Reconciliation ---

    /// Apply an event pushed by another client. The payload always wins over
    /// the local copy. Deleting a poll keeps its ledger entry.
    pub fn apply_event(&self, event: InboundEvent) {
        match event {
            InboundEvent::PollCreated(poll) => {
                info!("Poll {} created remotely", poll.id);
                self.apply(StoreCommand::Insert(poll.normalized()));
            }
            InboundEvent::PollUpdated(poll) => {
                self.apply(StoreCommand::Replace(poll.normalized()));
            }
            InboundEvent::VoteUpdate { poll_id, updated_poll } => {
                if poll_id != updated_poll.id {
                    warn!("vote_update for {} carries poll {}", poll_id, updated_poll.id);
                }
                self.apply(StoreCommand::Replace(updated_poll.normalized()));
            }
            InboundEvent::PollDeleted { poll_id } => {
                info!("Poll {} deleted remotely", poll_id);
                self.apply(StoreCommand::Remove(poll_id));
            }
        }
    }

    // --- Poll management ---

    pub async fn load_polls(&self) -> Result<usize, EngineError> {
        let polls: Vec<Poll> = self
            .service
            .fetch_polls()
            .await?
            .into_iter()
            .map(Poll::normalized)
            .collect();
        let count = polls.len();
        self.apply(StoreCommand::ReplaceAll(polls));
        info!("Loaded {} poll(s)", count);
        Ok(count)
    }

    pub async fn create_poll(&self, draft: PollDraft) -> Result<Poll, EngineError> {
        let draft = draft.validated()?;
        let poll = self.service.create_poll(&draft).await?.normalized();
        self.apply(StoreCommand::Insert(poll.clone()));
        self.emit(OutboundEvent::PollCreated(poll.clone()));
        info!("Created poll {}", poll.id);
        Ok(poll)
    }

    pub async fn update_poll(&self, poll_id: &str, draft: PollDraft) -> Result<Poll, EngineError> {
        let draft = draft.validated()?;
        let poll = self.service.update_poll(poll_id, &draft).await?.normalized();
        self.apply(StoreCommand::Replace(poll.clone()));
        self.emit(OutboundEvent::PollUpdated(poll.clone()));
        info!("Updated poll {}", poll.id);
        Ok(poll)
    }

    /// Zero every tally. The ledger is left alone, matching what other
    /// clients see when they receive the reset poll.
    pub async fn reset_poll(&self, poll_id: &str) -> Result<Poll, EngineError> {
        let poll = self.service.reset_poll(poll_id).await?.normalized();
        self.apply(StoreCommand::Replace(poll.clone()));
        self.emit(OutboundEvent::PollUpdated(poll.clone()));
        info!("Reset votes on poll {}", poll.id);
        Ok(poll)
    }

    pub async fn delete_poll(&self, poll_id: &str) -> Result<(), EngineError> {
        let deleted = self.service.delete_poll(poll_id).await?;
        self.apply(StoreCommand::Remove(deleted.poll_id.clone()));
        self.emit(OutboundEvent::PollDeleted {
            poll_id: deleted.poll_id.clone(),
        });
        info!("Deleted poll {}", deleted.poll_id);
        Ok(())
    }

    /// Point the selection at a poll (or clear it) and scope pushed updates
    /// to it.
    pub fn select_poll(&self, poll_id: Option<&str>) -> Result<(), EngineError> {
        if let Some(id) = poll_id {
            if self.poll(id).is_none() {
                return Err(EngineError::PollNotFound(id.to_string()));
            }
        }
        let previous = self.store.read().selected_id().map(str::to_string);
        if previous.as_deref() == poll_id {
            return Ok(());
        }
        self.apply(StoreCommand::Select(poll_id.map(str::to_string)));

        if let Some(previous) = previous {
            self.emit(OutboundEvent::Unsubscribe { poll_id: previous });
        }
        if let Some(id) = poll_id {
            self.emit(OutboundEvent::Subscribe { poll_id: id.to_string() });
        }
        Ok(())
    }

    fn apply(&self, command: StoreCommand) -> bool {
        self.store.write().apply(command)
    }

    // No retries: a failed emit is logged and dropped
    fn emit(&self, event: OutboundEvent) {
        let name = event.name();
        if let Err(e) = self.channel.emit(event) {
            warn!("Failed to broadcast {}: {}", name, e);
        }
    }
}

fn add_vote(poll_id: &str, option_id: &str) -> StoreCommand {
    StoreCommand::AddVote {
        poll_id: poll_id.to_string(),
        option_id: option_id.to_string(),
    }
}

fn remove_vote(poll_id: &str, option_id: &str) -> StoreCommand {
    StoreCommand::RemoveVote {
        poll_id: poll_id.to_string(),
        option_id: option_id.to_string(),
    }
}

