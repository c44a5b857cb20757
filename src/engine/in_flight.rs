use parking_lot::Mutex;
use std::collections::HashMap;

// Poll id -> option id currently being processed, at most one per poll
#[derive(Debug, Default)]
pub struct InFlight {
    active: Mutex<HashMap<String, String>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `poll_id` busy with `option_id`. Returns `None` when another
    /// operation on the poll has not finished yet. The mark is cleared when
    /// the guard drops, whatever the outcome.
    pub fn begin(&self, poll_id: &str, option_id: &str) -> Option<InFlightGuard<'_>> {
        let mut active = self.active.lock();
        if active.contains_key(poll_id) {
            return None;
        }
        active.insert(poll_id.to_string(), option_id.to_string());
        Some(InFlightGuard {
            tracker: self,
            poll_id: poll_id.to_string(),
        })
    }

    pub fn option_for(&self, poll_id: &str) -> Option<String> {
        self.active.lock().get(poll_id).cloned()
    }
}

pub struct InFlightGuard<'a> {
    tracker: &'a InFlight,
    poll_id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.tracker.active.lock().remove(&self.poll_id);
    }
}
