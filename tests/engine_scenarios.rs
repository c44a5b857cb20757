use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

use trusty_poll_sync::channel::{Broadcaster, InboundEvent, OutboundEvent};
use trusty_poll_sync::db::Database;
use trusty_poll_sync::error::{ChannelError, EngineError, ServiceError, ValidationError};
use trusty_poll_sync::ledger::{MemoryLedger, VoteLedger};
use trusty_poll_sync::models::{Poll, PollDraft};
use trusty_poll_sync::remote::{DeletedPoll, PollService};
use trusty_poll_sync::{SkipReason, ToggleOutcome, VoteEngine};

// --- Fakes ---

/// In-process poll service keeping its own authoritative tallies.
#[derive(Default)]
struct FakeService {
    polls: Mutex<HashMap<String, Poll>>,
    fail_vote: AtomicBool,
    fail_unvote: AtomicBool,
    // Park vote and unvote calls until `release` is notified
    hold_votes: AtomicBool,
    release: Notify,
    calls: AtomicUsize,
}

impl FakeService {
    fn with_polls(polls: Vec<Poll>) -> Self {
        let service = Self::default();
        {
            let mut stored = service.polls.lock();
            for poll in polls {
                stored.insert(poll.id.clone(), poll);
            }
        }
        service
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    // Wait until the service has been called `count` times in total
    async fn reached(&self, count: usize) {
        while self.calls() < count {
            tokio::task::yield_now().await;
        }
    }

    fn stored(&self, poll_id: &str) -> Poll {
        self.polls.lock().get(poll_id).cloned().unwrap()
    }

    fn adjust(&self, poll_id: &str, option_id: &str, up: bool) -> Result<Poll, ServiceError> {
        let mut polls = self.polls.lock();
        let poll = polls
            .get_mut(poll_id)
            .ok_or_else(|| ServiceError::Status { status: 404, message: "Poll not found".into() })?;
        let option = poll
            .options
            .iter_mut()
            .find(|option| option.id == option_id)
            .ok_or_else(|| ServiceError::Status { status: 400, message: "Invalid option".into() })?;
        if up {
            option.votes += 1;
        } else {
            option.votes = option.votes.saturating_sub(1);
        }
        poll.total_votes = poll.options.iter().map(|option| option.votes).sum();
        Ok(poll.clone())
    }
}

#[async_trait]
impl PollService for FakeService {
    async fn fetch_polls(&self) -> Result<Vec<Poll>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut polls: Vec<Poll> = self.polls.lock().values().cloned().collect();
        polls.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(polls)
    }

    async fn create_poll(&self, draft: &PollDraft) -> Result<Poll, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let options: Vec<_> = draft
            .options
            .iter()
            .enumerate()
            .map(|(i, text)| json!({"_id": format!("new-{}", i), "text": text, "votes": 0}))
            .collect();
        let poll: Poll = serde_json::from_value(json!({
            "_id": "new",
            "question": draft.question,
            "questionHtml": draft.question_html,
            "options": options,
            "isActive": draft.is_active,
            "allowMultipleVotes": draft.allow_multiple_votes,
            "totalVotes": 0
        }))
        .unwrap();
        self.polls.lock().insert(poll.id.clone(), poll.clone());
        Ok(poll)
    }

    async fn update_poll(&self, poll_id: &str, draft: &PollDraft) -> Result<Poll, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut polls = self.polls.lock();
        let poll = polls.get_mut(poll_id).ok_or_else(|| ServiceError::Rejected("missing".into()))?;
        poll.question = draft.question.clone();
        poll.allow_multiple_votes = draft.allow_multiple_votes;
        poll.is_active = draft.is_active;
        Ok(poll.clone())
    }

    async fn vote(&self, poll_id: &str, option_id: &str) -> Result<Poll, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_votes.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        if self.fail_vote.load(Ordering::SeqCst) {
            return Err(ServiceError::Rejected("vote refused".into()));
        }
        self.adjust(poll_id, option_id, true)
    }

    async fn unvote(&self, poll_id: &str, option_id: &str) -> Result<Poll, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_votes.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        if self.fail_unvote.load(Ordering::SeqCst) {
            return Err(ServiceError::Rejected("unvote refused".into()));
        }
        self.adjust(poll_id, option_id, false)
    }

    async fn delete_poll(&self, poll_id: &str) -> Result<DeletedPoll, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.polls
            .lock()
            .remove(poll_id)
            .map(|poll| DeletedPoll { poll_id: poll.id })
            .ok_or_else(|| ServiceError::Status { status: 404, message: "Poll not found".into() })
    }

    async fn reset_poll(&self, poll_id: &str) -> Result<Poll, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut polls = self.polls.lock();
        let poll = polls.get_mut(poll_id).ok_or_else(|| ServiceError::Rejected("missing".into()))?;
        for option in poll.options.iter_mut() {
            option.votes = 0;
        }
        poll.total_votes = 0;
        Ok(poll.clone())
    }
}

#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<OutboundEvent>>,
}

impl RecordingChannel {
    fn sent(&self) -> Vec<OutboundEvent> {
        self.sent.lock().clone()
    }

    fn names(&self) -> Vec<&'static str> {
        self.sent.lock().iter().map(|event| event.name()).collect()
    }
}

impl Broadcaster for RecordingChannel {
    fn emit(&self, event: OutboundEvent) -> Result<(), ChannelError> {
        self.sent.lock().push(event);
        Ok(())
    }
}

// --- Helpers ---

fn poll(id: &str, multiple: bool) -> Poll {
    serde_json::from_value(json!({
        "_id": id,
        "question": "Where should we eat?",
        "options": [
            {"_id": "a", "text": "Tacos", "votes": 0},
            {"_id": "b", "text": "Ramen", "votes": 0}
        ],
        "isActive": true,
        "allowMultipleVotes": if multiple { "true" } else { "false" },
        "totalVotes": 0,
        "createdAt": "2024-05-01T12:00:00Z"
    }))
    .unwrap()
}

struct Harness {
    engine: Arc<VoteEngine>,
    service: Arc<FakeService>,
    channel: Arc<RecordingChannel>,
    ledger: Arc<dyn VoteLedger>,
}

async fn harness_with_ledger(polls: Vec<Poll>, ledger: Arc<dyn VoteLedger>) -> Harness {
    let service = Arc::new(FakeService::with_polls(polls));
    let channel = Arc::new(RecordingChannel::default());
    let engine = Arc::new(VoteEngine::new(ledger.clone(), service.clone(), channel.clone()));
    engine.load_polls().await.unwrap();
    Harness {
        engine,
        service,
        channel,
        ledger,
    }
}

async fn harness(polls: Vec<Poll>) -> Harness {
    harness_with_ledger(polls, Arc::new(MemoryLedger::new())).await
}

fn votes(engine: &VoteEngine, poll_id: &str) -> (u64, u64, u64) {
    let poll = engine.poll(poll_id).unwrap();
    let a = poll.option("a").unwrap().votes;
    let b = poll.option("b").unwrap().votes;
    assert_eq!(poll.total_votes, poll.tallied_votes(), "total must equal the sum of option tallies");
    (a, b, poll.total_votes)
}

// --- Voting ---

#[tokio::test]
async fn test_single_choice_vote_switch_and_withdraw() {
    let h = harness(vec![poll("p1", false)]).await;

    let outcome = h.engine.toggle_vote("p1", "a").await.unwrap();
    assert_eq!(outcome, ToggleOutcome::Voted);
    assert_eq!(votes(&h.engine, "p1"), (1, 0, 1));
    assert_eq!(h.ledger.get("p1").await, vec!["a".to_string()]);

    let outcome = h.engine.toggle_vote("p1", "b").await.unwrap();
    assert_eq!(outcome, ToggleOutcome::Replaced { previous: vec!["a".to_string()] });
    assert_eq!(votes(&h.engine, "p1"), (0, 1, 1));
    assert_eq!(h.ledger.get("p1").await, vec!["b".to_string()]);

    let outcome = h.engine.toggle_vote("p1", "b").await.unwrap();
    assert_eq!(outcome, ToggleOutcome::Unvoted);
    assert_eq!(votes(&h.engine, "p1"), (0, 0, 0));
    assert!(h.ledger.get("p1").await.is_empty());
}

#[tokio::test]
async fn test_multiple_choice_keeps_both_votes() {
    let h = harness(vec![poll("p1", true)]).await;

    assert_eq!(h.engine.toggle_vote("p1", "a").await.unwrap(), ToggleOutcome::Voted);
    assert_eq!(h.engine.toggle_vote("p1", "b").await.unwrap(), ToggleOutcome::Voted);

    assert_eq!(votes(&h.engine, "p1"), (1, 1, 2));
    assert_eq!(h.ledger.get("p1").await, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn test_toggle_twice_restores_state() {
    let h = harness(vec![poll("p1", true)]).await;
    let before = h.engine.snapshot();

    h.engine.toggle_vote("p1", "a").await.unwrap();
    h.engine.toggle_vote("p1", "a").await.unwrap();

    assert_eq!(h.engine.snapshot(), before);
    assert!(!h.engine.has_voted("p1", "a").await);
}

#[tokio::test]
async fn test_sqlite_ledger_end_to_end() {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let h = harness_with_ledger(vec![poll("p1", false)], Arc::new(db)).await;

    h.engine.toggle_vote("p1", "a").await.unwrap();
    h.engine.toggle_vote("p1", "b").await.unwrap();

    assert_eq!(h.ledger.get("p1").await, vec!["b".to_string()]);
    assert_eq!(votes(&h.engine, "p1"), (0, 1, 1));
}

// --- Rollback ---

#[tokio::test]
async fn test_failed_vote_rolls_back() {
    let h = harness(vec![poll("p1", true)]).await;
    h.service.fail_vote.store(true, Ordering::SeqCst);

    let result = h.engine.toggle_vote("p1", "a").await;

    assert!(matches!(result, Err(EngineError::Service(ServiceError::Rejected(_)))));
    assert_eq!(votes(&h.engine, "p1"), (0, 0, 0));
    assert!(h.ledger.get("p1").await.is_empty());
    assert!(h.engine.pending_option("p1").is_none());
    assert!(h.channel.names().iter().all(|name| *name != "vote_cast"));
}

#[tokio::test]
async fn test_failed_unvote_rolls_back() {
    let h = harness(vec![poll("p1", true)]).await;
    h.engine.toggle_vote("p1", "a").await.unwrap();
    h.service.fail_unvote.store(true, Ordering::SeqCst);

    let result = h.engine.toggle_vote("p1", "a").await;

    assert!(result.is_err());
    assert_eq!(votes(&h.engine, "p1"), (1, 0, 1));
    assert_eq!(h.ledger.get("p1").await, vec!["a".to_string()]);
}

#[tokio::test]
async fn test_replacement_continues_when_withdrawal_fails() {
    let h = harness(vec![poll("p1", false)]).await;
    h.engine.toggle_vote("p1", "a").await.unwrap();
    h.service.fail_unvote.store(true, Ordering::SeqCst);

    let outcome = h.engine.toggle_vote("p1", "b").await.unwrap();

    assert_eq!(outcome, ToggleOutcome::Replaced { previous: vec!["a".to_string()] });
    assert_eq!(h.ledger.get("p1").await, vec!["b".to_string()]);
    // The service never saw the withdrawal, so its copy keeps both votes
    assert_eq!(votes(&h.engine, "p1"), (1, 1, 2));
    assert_eq!(h.engine.poll("p1").unwrap(), h.service.stored("p1"));
}

#[tokio::test]
async fn test_failed_replacement_vote_keeps_confirmed_withdrawal() {
    let h = harness(vec![poll("p1", false)]).await;
    h.engine.toggle_vote("p1", "a").await.unwrap();
    h.service.fail_vote.store(true, Ordering::SeqCst);

    let result = h.engine.toggle_vote("p1", "b").await;

    assert!(result.is_err());
    // Withdrawal of A went through, the vote for B did not
    assert!(h.ledger.get("p1").await.is_empty());
    assert_eq!(votes(&h.engine, "p1"), (0, 0, 0));
}

#[tokio::test]
async fn test_vote_applied_before_service_answers_then_rolled_back() {
    let h = harness(vec![poll("p1", true)]).await;
    h.service.hold_votes.store(true, Ordering::SeqCst);
    h.service.fail_vote.store(true, Ordering::SeqCst);
    let calls = h.service.calls();

    let engine = Arc::clone(&h.engine);
    let pending = tokio::spawn(async move { engine.toggle_vote("p1", "a").await });
    h.service.reached(calls + 1).await;

    assert_eq!(votes(&h.engine, "p1"), (1, 0, 1));
    assert_eq!(h.ledger.get("p1").await, vec!["a".to_string()]);

    h.service.release.notify_one();
    assert!(pending.await.unwrap().is_err());
    assert_eq!(votes(&h.engine, "p1"), (0, 0, 0));
    assert!(h.ledger.get("p1").await.is_empty());
}

#[tokio::test]
async fn test_unvote_applied_before_service_answers_then_rolled_back() {
    let h = harness(vec![poll("p1", true)]).await;
    h.engine.toggle_vote("p1", "a").await.unwrap();
    h.service.hold_votes.store(true, Ordering::SeqCst);
    h.service.fail_unvote.store(true, Ordering::SeqCst);
    let calls = h.service.calls();

    let engine = Arc::clone(&h.engine);
    let pending = tokio::spawn(async move { engine.toggle_vote("p1", "a").await });
    h.service.reached(calls + 1).await;

    assert_eq!(votes(&h.engine, "p1"), (0, 0, 0));
    assert!(h.ledger.get("p1").await.is_empty());

    h.service.release.notify_one();
    assert!(pending.await.unwrap().is_err());
    assert_eq!(votes(&h.engine, "p1"), (1, 0, 1));
    assert_eq!(h.ledger.get("p1").await, vec!["a".to_string()]);
}

#[tokio::test]
async fn test_replacement_steps_applied_before_service_answers() {
    let h = harness(vec![poll("p1", false)]).await;
    h.engine.toggle_vote("p1", "a").await.unwrap();
    h.service.hold_votes.store(true, Ordering::SeqCst);
    h.service.fail_vote.store(true, Ordering::SeqCst);
    let calls = h.service.calls();

    let engine = Arc::clone(&h.engine);
    let pending = tokio::spawn(async move { engine.toggle_vote("p1", "b").await });

    // Withdrawing A: tally already down, ledger untouched until the new vote
    h.service.reached(calls + 1).await;
    assert_eq!(votes(&h.engine, "p1"), (0, 0, 0));
    assert_eq!(h.ledger.get("p1").await, vec!["a".to_string()]);
    h.service.release.notify_one();

    // Voting B
    h.service.reached(calls + 2).await;
    assert_eq!(votes(&h.engine, "p1"), (0, 1, 1));
    assert_eq!(h.ledger.get("p1").await, vec!["b".to_string()]);
    h.service.release.notify_one();

    assert!(pending.await.unwrap().is_err());
    assert_eq!(votes(&h.engine, "p1"), (0, 0, 0));
    assert!(h.ledger.get("p1").await.is_empty());
}

// --- Skips ---

#[tokio::test]
async fn test_toggle_rejected_while_in_flight() {
    let h = harness(vec![poll("p1", true)]).await;
    h.service.hold_votes.store(true, Ordering::SeqCst);

    let engine = Arc::clone(&h.engine);
    let first = tokio::spawn(async move { engine.toggle_vote("p1", "a").await });

    while h.engine.pending_option("p1").is_none() {
        tokio::task::yield_now().await;
    }
    assert_eq!(h.engine.pending_option("p1").as_deref(), Some("a"));

    let second = h.engine.toggle_vote("p1", "b").await.unwrap();
    assert_eq!(second, ToggleOutcome::Skipped(SkipReason::InFlight));

    h.service.release.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), ToggleOutcome::Voted);
    assert!(h.engine.pending_option("p1").is_none());
    assert_eq!(votes(&h.engine, "p1"), (1, 0, 1));
}

#[tokio::test]
async fn test_inactive_and_unknown_targets_are_skipped() {
    let mut closed = poll("p2", true);
    closed.is_active = false;
    let h = harness(vec![poll("p1", true), closed]).await;
    let calls = h.service.calls();

    assert_eq!(
        h.engine.toggle_vote("p2", "a").await.unwrap(),
        ToggleOutcome::Skipped(SkipReason::PollInactive)
    );
    assert_eq!(
        h.engine.toggle_vote("missing", "a").await.unwrap(),
        ToggleOutcome::Skipped(SkipReason::PollNotFound)
    );
    assert_eq!(
        h.engine.toggle_vote("p1", "zzz").await.unwrap(),
        ToggleOutcome::Skipped(SkipReason::OptionNotFound)
    );

    assert_eq!(h.service.calls(), calls);
    assert!(h.ledger.get("p2").await.is_empty());
    assert!(h.ledger.get("p1").await.is_empty());
}

// --- Broadcasts ---

#[tokio::test]
async fn test_vote_cast_carries_service_poll() {
    let h = harness(vec![poll("p1", true)]).await;

    h.engine.toggle_vote("p1", "b").await.unwrap();

    let sent = h.channel.sent();
    match sent.last() {
        Some(OutboundEvent::VoteCast { poll_id, option_id, updated_poll }) => {
            assert_eq!(poll_id, "p1");
            assert_eq!(option_id, "b");
            assert_eq!(updated_poll, &h.service.stored("p1"));
        }
        other => panic!("expected vote_cast, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pushed_update_applies_idempotently() {
    let h = harness(vec![poll("p1", true)]).await;
    let mut pushed = poll("p1", true);
    pushed.options[0].votes = 4;
    pushed.total_votes = 4;

    h.engine.apply_event(InboundEvent::PollUpdated(pushed.clone()));
    let once = h.engine.snapshot();
    h.engine.apply_event(InboundEvent::PollUpdated(pushed));

    assert_eq!(h.engine.snapshot(), once);
    assert_eq!(votes(&h.engine, "p1"), (4, 0, 4));
}

#[tokio::test]
async fn test_pushed_updates_for_unknown_polls_are_ignored() {
    let h = harness(vec![poll("p1", true)]).await;
    let before = h.engine.snapshot();

    h.engine.apply_event(InboundEvent::PollUpdated(poll("ghost", true)));
    h.engine.apply_event(InboundEvent::VoteUpdate {
        poll_id: "ghost".into(),
        updated_poll: poll("ghost", true),
    });

    assert_eq!(h.engine.snapshot(), before);
}

#[tokio::test]
async fn test_pushed_tally_is_normalized() {
    let h = harness(vec![poll("p1", true)]).await;
    let mut pushed = poll("p1", true);
    pushed.options[1].votes = 3;
    pushed.total_votes = 10;

    h.engine.apply_event(InboundEvent::VoteUpdate {
        poll_id: "p1".into(),
        updated_poll: pushed,
    });

    assert_eq!(votes(&h.engine, "p1"), (0, 3, 3));
}

#[tokio::test]
async fn test_pushed_delete_clears_selection_but_keeps_ledger() {
    let h = harness(vec![poll("p1", true)]).await;
    h.engine.select_poll(Some("p1")).unwrap();
    h.engine.toggle_vote("p1", "a").await.unwrap();

    h.engine.apply_event(InboundEvent::PollDeleted { poll_id: "p1".into() });

    assert!(h.engine.poll("p1").is_none());
    assert!(h.engine.selected_poll().is_none());
    assert_eq!(h.ledger.get("p1").await, vec!["a".to_string()]);
}

#[tokio::test]
async fn test_pushed_create_prepends_once() {
    let h = harness(vec![poll("p1", true)]).await;

    h.engine.apply_event(InboundEvent::PollCreated(poll("p2", false)));
    h.engine.apply_event(InboundEvent::PollCreated(poll("p2", false)));

    let ids: Vec<String> = h.engine.polls().into_iter().map(|poll| poll.id).collect();
    assert_eq!(ids, vec!["p2".to_string(), "p1".to_string()]);
}

// --- Poll management ---

#[tokio::test]
async fn test_create_poll_inserts_and_broadcasts() {
    let h = harness(vec![poll("p1", true)]).await;

    let created = h
        .engine
        .create_poll(PollDraft::new("  Pick a day  ", vec!["Mon".into(), " ".into(), "Tue".into()]).single_choice())
        .await
        .unwrap();

    assert_eq!(created.question, "Pick a day");
    assert_eq!(created.options.len(), 2);
    assert!(!created.allow_multiple_votes);
    assert_eq!(h.engine.polls()[0].id, created.id);
    assert!(matches!(h.channel.sent().last(), Some(OutboundEvent::PollCreated(poll)) if poll.id == created.id));
}

#[tokio::test]
async fn test_invalid_draft_never_reaches_service() {
    let h = harness(vec![]).await;
    let calls = h.service.calls();

    let result = h.engine.create_poll(PollDraft::new("Lonely", vec!["Only".into()])).await;

    assert!(matches!(result, Err(EngineError::Validation(ValidationError::TooFewOptions))));
    assert_eq!(h.service.calls(), calls);
    assert!(h.channel.sent().is_empty());
}

#[tokio::test]
async fn test_update_reset_and_delete_broadcast() {
    let h = harness(vec![poll("p1", true)]).await;
    h.engine.toggle_vote("p1", "a").await.unwrap();

    let draft = PollDraft::from_poll(&h.engine.poll("p1").unwrap()).single_choice();
    let updated = h.engine.update_poll("p1", draft).await.unwrap();
    assert!(!updated.allow_multiple_votes);

    h.engine.reset_poll("p1").await.unwrap();
    assert_eq!(votes(&h.engine, "p1"), (0, 0, 0));
    // Reset leaves this client's record alone
    assert_eq!(h.ledger.get("p1").await, vec!["a".to_string()]);

    h.engine.delete_poll("p1").await.unwrap();
    assert!(h.engine.polls().is_empty());

    assert_eq!(
        h.channel.names(),
        vec!["vote_cast", "poll_updated", "poll_updated", "poll_deleted"]
    );
}

#[tokio::test]
async fn test_failed_delete_leaves_store() {
    let h = harness(vec![poll("p1", true)]).await;

    let result = h.engine.delete_poll("nope").await;

    assert!(matches!(result, Err(EngineError::Service(ServiceError::Status { status: 404, .. }))));
    assert_eq!(h.engine.polls().len(), 1);
    assert!(h.channel.sent().is_empty());
}

#[tokio::test]
async fn test_selection_moves_subscription() {
    let h = harness(vec![poll("p1", true), poll("p2", true)]).await;

    h.engine.select_poll(Some("p1")).unwrap();
    h.engine.select_poll(Some("p2")).unwrap();
    h.engine.select_poll(None).unwrap();

    assert_eq!(
        h.channel.sent(),
        vec![
            OutboundEvent::Subscribe { poll_id: "p1".into() },
            OutboundEvent::Unsubscribe { poll_id: "p1".into() },
            OutboundEvent::Subscribe { poll_id: "p2".into() },
            OutboundEvent::Unsubscribe { poll_id: "p2".into() },
        ]
    );
    assert!(matches!(h.engine.select_poll(Some("ghost")), Err(EngineError::PollNotFound(_))));
}

#[tokio::test]
async fn test_tally_view_marks_my_vote() {
    let h = harness(vec![poll("p1", true)]).await;
    h.engine.toggle_vote("p1", "b").await.unwrap();

    let rows = h.engine.tally("p1").await.unwrap();

    assert!(!rows[0].voted_by_me && !rows[0].is_leading);
    assert!(rows[1].voted_by_me && rows[1].is_leading);
    assert_eq!(rows[1].percentage, 100);
    assert!(h.engine.tally("ghost").await.is_none());
}

// --- Console ---

#[tokio::test]
async fn test_console_edit_and_list_voted_marker() {
    use trusty_poll_sync::commands::{self, Command};

    let h = harness(vec![poll("p1", true), poll("p2", true)]).await;
    h.engine.toggle_vote("p1", "a").await.unwrap();

    let listing = commands::execute(&h.engine, Command::List).await.unwrap();
    let lines: Vec<&str> = listing.lines().collect();
    assert!(lines[0].contains("[p1]") && lines[0].ends_with(" ✓"));
    assert!(lines[1].contains("[p2]") && !lines[1].ends_with(" ✓"));

    let edit = commands::parse("edit p2 --close --single").unwrap();
    commands::execute(&h.engine, edit).await.unwrap();

    let edited = h.engine.poll("p2").unwrap();
    assert!(!edited.is_active);
    assert!(!edited.allow_multiple_votes);
    assert!(matches!(h.channel.sent().last(), Some(OutboundEvent::PollUpdated(poll)) if poll.id == "p2"));
    assert_eq!(
        h.engine.toggle_vote("p2", "a").await.unwrap(),
        ToggleOutcome::Skipped(SkipReason::PollInactive)
    );
}
