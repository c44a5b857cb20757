pub mod channel;
pub mod codec;
pub mod commands;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod models;
pub mod remote;
pub mod store;
pub mod tally;
pub mod tasks;

pub use config::Config;
pub use engine::{SkipReason, ToggleOutcome, VoteEngine};
pub use error::EngineError;
