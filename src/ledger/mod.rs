//! Per-poll record of the options this client has voted for.
//!
//! Entries are stored under `user_votes_<pollId>` as a JSON array of option
//! ids. A missing or unreadable entry is an empty ledger, never an error.
//! There is no cross-process coordination: two clients sharing the same
//! storage race and the last write wins.

use async_trait::async_trait;
use log::warn;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::LedgerError;

pub const KEY_PREFIX: &str = "user_votes_";

pub fn ledger_key(poll_id: &str) -> String {
    format!("{}{}", KEY_PREFIX, poll_id)
}

#[async_trait]
pub trait VoteLedger: Send + Sync {
    /// Option ids recorded for the poll, in the order they were voted.
    async fn get(&self, poll_id: &str) -> Vec<String>;

    /// Overwrite the recorded set. Returns once the entry is persisted.
    async fn set(&self, poll_id: &str, option_ids: &[String]) -> Result<(), LedgerError>;

    async fn has(&self, poll_id: &str, option_id: &str) -> bool {
        self.get(poll_id).await.iter().any(|id| id == option_id)
    }
}

/// Decode a stored entry. Anything other than a JSON array reads as empty;
/// non-string elements are dropped.
pub fn decode_entry(key: &str, raw: &str) -> Vec<String> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => dedup(
            items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
        ),
        Ok(_) => {
            warn!("Ledger entry {} is not an array, treating as empty", key);
            Vec::new()
        }
        Err(e) => {
            warn!("Ledger entry {} is corrupted ({}), treating as empty", key, e);
            Vec::new()
        }
    }
}

pub fn encode_entry(option_ids: &[String]) -> Result<String, LedgerError> {
    Ok(serde_json::to_string(&dedup(option_ids.to_vec()))?)
}

// Keeps the first occurrence of each id
fn dedup(option_ids: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(option_ids.len());
    for id in option_ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

/// Ledger held in process memory. Values are kept in their stored JSON form.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // Write a raw stored value, bypassing encoding
    pub fn insert_raw(&self, poll_id: &str, raw: &str) {
        self.entries.lock().insert(ledger_key(poll_id), raw.to_string());
    }

    pub fn raw(&self, poll_id: &str) -> Option<String> {
        self.entries.lock().get(&ledger_key(poll_id)).cloned()
    }
}

#[async_trait]
impl VoteLedger for MemoryLedger {
    async fn get(&self, poll_id: &str) -> Vec<String> {
        let key = ledger_key(poll_id);
        match self.entries.lock().get(&key) {
            Some(raw) => decode_entry(&key, raw),
            None => Vec::new(),
        }
    }

    async fn set(&self, poll_id: &str, option_ids: &[String]) -> Result<(), LedgerError> {
        let encoded = encode_entry(option_ids)?;
        self.entries.lock().insert(ledger_key(poll_id), encoded);
        Ok(())
    }
}
