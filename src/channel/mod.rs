//! Named poll and vote events over the shared push channel.
//!
//! This layer carries no business logic. Events are delivered exactly as
//! received, in arrival order, with no deduplication and no retries.

pub mod packet;
mod socket;

pub use socket::SocketChannel;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChannelError;
use crate::models::Poll;

pub const SUBSCRIBE: &str = "subscribe";
pub const UNSUBSCRIBE: &str = "unsubscribe";
pub const POLL_CREATED: &str = "poll_created";
pub const POLL_UPDATED: &str = "poll_updated";
pub const POLL_DELETED: &str = "poll_deleted";
pub const VOTE_CAST: &str = "vote_cast";
pub const VOTE_UPDATE: &str = "vote_update";

/// Events this client emits.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    Subscribe { poll_id: String },
    Unsubscribe { poll_id: String },
    PollCreated(Poll),
    PollUpdated(Poll),
    PollDeleted { poll_id: String },
    /// The authoritative poll after this client's vote or unvote.
    VoteCast {
        poll_id: String,
        option_id: String,
        updated_poll: Poll,
    },
}

/// Events pushed to this client.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    PollCreated(Poll),
    PollUpdated(Poll),
    PollDeleted { poll_id: String },
    /// Another client's vote, redistributed by the service.
    VoteUpdate { poll_id: String, updated_poll: Poll },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PollRef {
    poll_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoteCastPayload<'a> {
    poll_id: &'a str,
    option_id: &'a str,
    updated_poll: &'a Poll,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteUpdatePayload {
    poll_id: String,
    updated_poll: Poll,
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::Subscribe { .. } => SUBSCRIBE,
            OutboundEvent::Unsubscribe { .. } => UNSUBSCRIBE,
            OutboundEvent::PollCreated(_) => POLL_CREATED,
            OutboundEvent::PollUpdated(_) => POLL_UPDATED,
            OutboundEvent::PollDeleted { .. } => POLL_DELETED,
            OutboundEvent::VoteCast { .. } => VOTE_CAST,
        }
    }

    pub fn payload(&self) -> Result<Value, ChannelError> {
        let value = match self {
            OutboundEvent::Subscribe { poll_id }
            | OutboundEvent::Unsubscribe { poll_id }
            | OutboundEvent::PollDeleted { poll_id } => serde_json::to_value(PollRef {
                poll_id: poll_id.clone(),
            })?,
            OutboundEvent::PollCreated(poll) | OutboundEvent::PollUpdated(poll) => {
                serde_json::to_value(poll)?
            }
            OutboundEvent::VoteCast {
                poll_id,
                option_id,
                updated_poll,
            } => serde_json::to_value(VoteCastPayload {
                poll_id,
                option_id,
                updated_poll,
            })?,
        };
        Ok(value)
    }
}

impl InboundEvent {
    /// Decode a named event. Returns `Ok(None)` for names this client does
    /// not consume.
    pub fn decode(name: &str, payload: Value) -> Result<Option<InboundEvent>, ChannelError> {
        let event = match name {
            POLL_CREATED => InboundEvent::PollCreated(serde_json::from_value(payload)?),
            POLL_UPDATED => InboundEvent::PollUpdated(serde_json::from_value(payload)?),
            POLL_DELETED => {
                let PollRef { poll_id } = serde_json::from_value(payload)?;
                InboundEvent::PollDeleted { poll_id }
            }
            VOTE_UPDATE => {
                let VoteUpdatePayload {
                    poll_id,
                    updated_poll,
                } = serde_json::from_value(payload)?;
                InboundEvent::VoteUpdate {
                    poll_id,
                    updated_poll,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::PollCreated(_) => POLL_CREATED,
            InboundEvent::PollUpdated(_) => POLL_UPDATED,
            InboundEvent::PollDeleted { .. } => POLL_DELETED,
            InboundEvent::VoteUpdate { .. } => VOTE_UPDATE,
        }
    }
}

/// Outbound half of the push channel. Emission is fire-and-forget.
pub trait Broadcaster: Send + Sync {
    fn emit(&self, event: OutboundEvent) -> Result<(), ChannelError>;
}

// Stand-in when the push channel could not be opened; every emit fails
pub struct Detached;

impl Broadcaster for Detached {
    fn emit(&self, _event: OutboundEvent) -> Result<(), ChannelError> {
        Err(ChannelError::Closed)
    }
}
