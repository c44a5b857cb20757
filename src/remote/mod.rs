//! The poll storage service the engine talks to.

mod http;

pub use http::HttpPollService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::models::{Poll, PollDraft};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedPoll {
    pub poll_id: String,
}

/// Request/response operations on stored polls. Every poll returned is the
/// service's authoritative copy.
#[async_trait]
pub trait PollService: Send + Sync {
    async fn fetch_polls(&self) -> Result<Vec<Poll>, ServiceError>;

    async fn create_poll(&self, draft: &PollDraft) -> Result<Poll, ServiceError>;

    async fn update_poll(&self, poll_id: &str, draft: &PollDraft) -> Result<Poll, ServiceError>;

    async fn vote(&self, poll_id: &str, option_id: &str) -> Result<Poll, ServiceError>;

    async fn unvote(&self, poll_id: &str, option_id: &str) -> Result<Poll, ServiceError>;

    async fn delete_poll(&self, poll_id: &str) -> Result<DeletedPoll, ServiceError>;

    /// Zero every option tally, keeping the poll's structure.
    async fn reset_poll(&self, poll_id: &str) -> Result<Poll, ServiceError>;
}
