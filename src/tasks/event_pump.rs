use crate::channel::InboundEvent;
use crate::engine::VoteEngine;
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

// Apply pushed events one at a time, in the order the channel delivered them
pub async fn run_inbound_events(engine: Arc<VoteEngine>, mut events: UnboundedReceiver<InboundEvent>) {
    info!("Starting background task to apply pushed poll events...");
    let mut applied: u64 = 0;

    while let Some(event) = events.recv().await {
        debug!("Applying pushed {} event", event.name());
        engine.apply_event(event);
        applied += 1;
    }

    info!("Push channel closed after {} event(s); no longer receiving live updates", applied);
}
