use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use super::{DeletedPoll, PollService};
use crate::error::ServiceError;
use crate::models::{Poll, PollDraft};

/// JSON-over-HTTP client for the poll service (`/api/polls`).
#[derive(Clone)]
pub struct HttpPollService {
    base_url: String,
    http: Client,
}

impl HttpPollService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn polls_url(&self) -> String {
        format!("{}/api/polls", self.base_url)
    }

    fn poll_url(&self, poll_id: &str, action: Option<&str>) -> String {
        match action {
            Some(action) => format!("{}/api/polls/{}/{}", self.base_url, poll_id, action),
            None => format!("{}/api/polls/{}", self.base_url, poll_id),
        }
    }
}

#[async_trait]
impl PollService for HttpPollService {
    async fn fetch_polls(&self) -> Result<Vec<Poll>, ServiceError> {
        let response = self.http.get(self.polls_url()).send().await?;
        read_json(response).await
    }

    async fn create_poll(&self, draft: &PollDraft) -> Result<Poll, ServiceError> {
        let response = self.http.post(self.polls_url()).json(draft).send().await?;
        read_json(response).await
    }

    async fn update_poll(&self, poll_id: &str, draft: &PollDraft) -> Result<Poll, ServiceError> {
        let response = self.http.put(self.poll_url(poll_id, None)).json(draft).send().await?;
        read_json(response).await
    }

    async fn vote(&self, poll_id: &str, option_id: &str) -> Result<Poll, ServiceError> {
        let response = self
            .http
            .post(self.poll_url(poll_id, Some("vote")))
            .json(&json!({ "optionId": option_id }))
            .send()
            .await?;
        read_json(response).await
    }

    async fn unvote(&self, poll_id: &str, option_id: &str) -> Result<Poll, ServiceError> {
        let response = self
            .http
            .post(self.poll_url(poll_id, Some("unvote")))
            .json(&json!({ "optionId": option_id }))
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete_poll(&self, poll_id: &str) -> Result<DeletedPoll, ServiceError> {
        let response = self.http.delete(self.poll_url(poll_id, None)).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }
        // Body is informational; a 2xx status is what matters
        let body: serde_json::Value = serde_json::from_str(&text).unwrap_or_else(|e| {
            debug!("Ignoring delete response body for {}: {}", poll_id, e);
            serde_json::Value::Null
        });
        let poll_id = body
            .get("pollId")
            .and_then(|v| v.as_str())
            .unwrap_or(poll_id)
            .to_string();
        Ok(DeletedPoll { poll_id })
    }

    async fn reset_poll(&self, poll_id: &str) -> Result<Poll, ServiceError> {
        let response = self.http.post(self.poll_url(poll_id, Some("reset"))).send().await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        let message = error_message(status, &body);
        warn!("Poll service returned {}: {}", status.as_u16(), message);
        return Err(ServiceError::Status {
            status: status.as_u16(),
            message,
        });
    }
    serde_json::from_str(&body).map_err(|e| ServiceError::Decode(e.to_string()))
}

// Prefer the service's own message, then the raw body, then the status text
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error"] {
            if let Some(message) = value.get(field).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() <= 200 {
        return trimmed.to_string();
    }
    status.canonical_reason().unwrap_or("request failed").to_string()
}
