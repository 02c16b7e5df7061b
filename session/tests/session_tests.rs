use std::sync::Arc;
use std::time::Duration;

use ceremony_nullables::{NullClock, NullRemote};
use ceremony_session::{SessionConfig, SessionError, SessionHandle, ValidationSession};
use ceremony_store::{MemoryValidationStore, PersistedValidation, ValidationStore};
use ceremony_types::{
    AnswerPayload, AnswerType, CeremonyIntervals, EpochInfo, EpochPeriod, FlipHash,
    FlipHashEntry, FlipPayload, SessionType,
};
use ceremony_validation::{Action, ValidationState};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::{sleep, timeout, Instant};

fn start_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn epoch_info(epoch: u64, period: EpochPeriod) -> EpochInfo {
    EpochInfo {
        current_period: period,
        epoch,
        next_validation: start_time(),
        current_validation_start: Some(start_time()),
    }
}

fn intervals(short: u64, long: u64) -> CeremonyIntervals {
    CeremonyIntervals {
        short_session_duration: short,
        long_session_duration: long,
        ..CeremonyIntervals::default()
    }
}

fn entry(hash: &str, extra: bool, ready: bool) -> FlipHashEntry {
    FlipHashEntry {
        hash: FlipHash::new(hash),
        extra,
        ready,
    }
}

fn short_answers() -> Vec<AnswerPayload> {
    vec![AnswerPayload {
        hash: FlipHash::new("old"),
        answer: AnswerType::Left,
        easy: false,
    }]
}

struct Fixture {
    remote: Arc<NullRemote>,
    store: Arc<MemoryValidationStore>,
    clock: Arc<NullClock>,
    session: ValidationSession,
    handle: SessionHandle,
}

/// A node in the short session of epoch 5 serving two ready flips.
fn short_session_remote() -> NullRemote {
    let remote = NullRemote::new();
    remote.set_epoch(epoch_info(5, EpochPeriod::ShortSession));
    remote.set_intervals(intervals(120, 300));
    remote.set_hashes(
        SessionType::Short,
        vec![entry("a", false, true), entry("b", false, true)],
    );
    remote.set_ready_flip("a");
    remote.set_ready_flip("b");
    remote
}

/// Two ready flips for the long session of the same epoch.
fn serve_long_flips(remote: &NullRemote) {
    remote.set_hashes(
        SessionType::Long,
        vec![entry("l1", false, true), entry("l2", false, true)],
    );
    remote.set_ready_flip("l1");
    remote.set_ready_flip("l2");
}

fn has_flip(state: &ValidationState, hash: &str) -> bool {
    state.flips.iter().any(|flip| flip.hash.as_str() == hash)
}

fn start(remote: NullRemote, store: MemoryValidationStore, now: DateTime<Utc>) -> Fixture {
    let remote = Arc::new(remote);
    let store = Arc::new(store);
    let clock = Arc::new(NullClock::new(now));
    let session = ValidationSession::start(
        SessionConfig::default(),
        remote.clone(),
        store.clone(),
        clock.clone(),
    )
    .unwrap();
    let handle = session.handle();
    Fixture {
        remote,
        store,
        clock,
        session,
        handle,
    }
}

async fn wait_until(
    handle: &SessionHandle,
    pred: impl FnMut(&ValidationState) -> bool,
) -> ValidationState {
    let mut rx = handle.subscribe();
    timeout(Duration::from_secs(600), async {
        rx.wait_for(pred).await.map(|state| state.clone())
    })
    .await
    .expect("timed out waiting for state")
    .expect("session closed")
}

fn hashes(flips: impl IntoIterator<Item = FlipHash>) -> Vec<String> {
    flips.into_iter().map(|hash| hash.as_str().to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn fetches_flips_and_stops_polling_once_ready() {
    let f = start(short_session_remote(), MemoryValidationStore::new(), start_time());

    let state = wait_until(&f.handle, |s| s.ready).await;
    assert_eq!(state.flips.len(), 2);
    assert!(state.flips.iter().all(|flip| flip.is_loaded()));
    assert!(!state.loading);

    let enumerations = f.remote.hash_requests().len();
    sleep(Duration::from_secs(10)).await;
    assert_eq!(f.remote.hash_requests().len(), enumerations);
    assert_eq!(f.remote.flip_requests().len(), 2);
    assert!(f.handle.metrics().fetch_cycles.get() >= 1);
}

#[tokio::test(start_paused = true)]
async fn pending_flip_is_fetched_once_it_becomes_ready() {
    let remote = short_session_remote();
    remote.set_hashes(
        SessionType::Short,
        vec![entry("a", false, true), entry("b", false, false)],
    );
    remote.set_flip("b", FlipPayload::default());
    let f = start(remote, MemoryValidationStore::new(), start_time());

    let state = wait_until(&f.handle, |s| s.flips.len() == 2 && !s.loading).await;
    assert!(!state.ready);
    let pending = state.flips.iter().find(|flip| flip.hash.as_str() == "b").unwrap();
    assert!(!pending.ready && !pending.loaded && !pending.failed);

    f.remote.set_ready_flip("b");
    f.remote.set_hashes(
        SessionType::Short,
        vec![entry("a", false, true), entry("b", false, true)],
    );
    let state = wait_until(&f.handle, |s| s.ready).await;
    assert!(state.flips.iter().all(|flip| flip.is_loaded()));
}

#[tokio::test(start_paused = true)]
async fn fetch_failures_are_retried() {
    let remote = short_session_remote();
    remote.fail_hashes(true);
    let f = start(remote, MemoryValidationStore::new(), start_time());

    let state = wait_until(&f.handle, |s| s.error.is_some()).await;
    assert!(state.loading);
    assert!(f.handle.metrics().fetch_failures.get() >= 1);

    f.remote.fail_hashes(false);
    let state = wait_until(&f.handle, |s| s.ready).await;
    assert_eq!(state.error, None);
}

#[tokio::test(start_paused = true)]
async fn reveals_extra_flips_when_some_never_arrive() {
    let remote = short_session_remote();
    remote.set_hashes(
        SessionType::Short,
        vec![
            entry("a", false, true),
            entry("b", false, false),
            entry("x", true, true),
        ],
    );
    remote.set_flip("b", FlipPayload::default());
    remote.set_ready_flip("x");
    let started = Instant::now();
    let f = start(remote, MemoryValidationStore::new(), start_time());

    let state = wait_until(&f.handle, |s| s.ready).await;
    assert!(started.elapsed() >= Duration::from_secs(35));
    assert_eq!(
        hashes(state.visible_flips().map(|flip| flip.hash.clone())),
        vec!["a", "x"]
    );
    let missing = state.flips.iter().find(|flip| flip.hash.as_str() == "b").unwrap();
    assert!(missing.failed && missing.hidden);
}

#[tokio::test(start_paused = true)]
async fn long_session_fetches_its_own_flips_without_short_answers() {
    let remote = short_session_remote();
    serve_long_flips(&remote);
    let f = start(remote, MemoryValidationStore::new(), start_time());
    wait_until(&f.handle, |s| s.ready).await;

    f.remote.set_epoch(epoch_info(5, EpochPeriod::LongSession));
    let state = wait_until(&f.handle, |s| s.ready && has_flip(s, "l1")).await;
    assert_eq!(
        hashes(state.flips.iter().map(|flip| flip.hash.clone())),
        vec!["l1", "l2"]
    );
    assert!(!state.short_answers_submitted);
    assert!(f.remote.hash_requests().contains(&SessionType::Long));

    let answers = f.handle.submit(SessionType::Long).await.unwrap();
    assert_eq!(
        hashes(answers.into_iter().map(|answer| answer.hash)),
        vec!["l1", "l2"]
    );
    let submissions = f.remote.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].0, SessionType::Long);
}

#[tokio::test(start_paused = true)]
async fn unfinished_short_flips_are_replaced_when_the_long_session_starts() {
    let remote = short_session_remote();
    remote.set_hashes(
        SessionType::Short,
        vec![entry("a", false, true), entry("b", false, false)],
    );
    remote.set_flip("b", FlipPayload::default());
    serve_long_flips(&remote);
    let f = start(remote, MemoryValidationStore::new(), start_time());
    wait_until(&f.handle, |s| s.flips.len() == 2 && !s.loading).await;

    f.remote.set_epoch(epoch_info(5, EpochPeriod::LongSession));
    let state = wait_until(&f.handle, |s| s.ready && has_flip(s, "l1")).await;
    assert_eq!(
        hashes(state.flips.iter().map(|flip| flip.hash.clone())),
        vec!["l1", "l2"]
    );
    assert!(state.flips.iter().all(|flip| flip.is_loaded() && !flip.hidden));
}

#[tokio::test(start_paused = true)]
async fn long_session_follows_a_short_submission() {
    let remote = short_session_remote();
    serve_long_flips(&remote);
    let f = start(remote, MemoryValidationStore::new(), start_time());
    wait_until(&f.handle, |s| s.ready).await;
    f.handle.dispatch(Action::Answer(AnswerType::Left)).unwrap();
    let short = f.handle.submit(SessionType::Short).await.unwrap();
    assert_eq!(hashes(short.into_iter().map(|answer| answer.hash)), vec!["a", "b"]);

    f.remote.set_epoch(epoch_info(5, EpochPeriod::LongSession));
    wait_until(&f.handle, |s| s.ready && has_flip(s, "l1")).await;
    let long = f.handle.submit(SessionType::Long).await.unwrap();
    assert_eq!(hashes(long.into_iter().map(|answer| answer.hash)), vec!["l1", "l2"]);

    let kinds: Vec<_> = f.remote.submissions().into_iter().map(|(kind, _)| kind).collect();
    assert_eq!(kinds, vec![SessionType::Short, SessionType::Long]);
    assert!(f.handle.state().is_finished());
}

#[tokio::test(start_paused = true)]
async fn nothing_is_fetched_outside_validation_periods() {
    let remote = short_session_remote();
    remote.set_epoch(epoch_info(5, EpochPeriod::FlipLottery));
    let f = start(remote, MemoryValidationStore::new(), start_time());

    sleep(Duration::from_secs(5)).await;
    assert!(f.remote.hash_requests().is_empty());
    assert!(f.handle.epoch().is_some());
    assert!(f.handle.state().loading);
}

#[tokio::test(start_paused = true)]
async fn submit_sends_answers_and_persists_them() {
    let f = start(short_session_remote(), MemoryValidationStore::new(), start_time());
    wait_until(&f.handle, |s| s.ready).await;
    f.handle.dispatch(Action::Answer(AnswerType::Left)).unwrap();

    let answers = f.handle.submit(SessionType::Short).await.unwrap();
    assert_eq!(answers.len(), 2);
    assert_eq!(answers[0].answer, AnswerType::Left);
    assert_eq!(answers[1].answer, AnswerType::None);

    let (session_type, request) = f.remote.submissions().remove(0);
    assert_eq!(session_type, SessionType::Short);
    assert_eq!((request.nonce, request.epoch), (0, 0));
    assert_eq!(request.answers, answers);

    let saved = f.store.get().unwrap();
    assert_eq!(saved.epoch, 5);
    assert_eq!(saved.short_answers(), Some(answers.as_slice()));

    let state = f.handle.state();
    assert!(state.short_answers_submitted);
    assert_eq!(state.short_answers, answers);
    assert!(state.flips.is_empty());

    assert!(matches!(
        f.handle.submit(SessionType::Short).await,
        Err(SessionError::SubmitSkipped(SessionType::Short))
    ));
    assert_eq!(f.handle.metrics().submissions.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_submission_can_be_retried() {
    let f = start(short_session_remote(), MemoryValidationStore::new(), start_time());
    wait_until(&f.handle, |s| s.ready).await;
    f.remote.fail_submit(true);

    let result = f.handle.submit(SessionType::Short).await;
    assert!(matches!(result, Err(SessionError::Rpc(_))));
    let state = f.handle.state();
    assert!(!state.submitting);
    assert!(!state.short_answers_submitted);
    assert!(state.error.is_some());
    assert_eq!(f.store.get().unwrap().short_answers(), None);

    f.remote.fail_submit(false);
    f.handle.submit(SessionType::Short).await.unwrap();
    assert!(f.handle.state().short_answers_submitted);
    assert_eq!(f.handle.metrics().submission_failures.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn second_submission_is_rejected_while_one_is_in_flight() {
    let f = start(short_session_remote(), MemoryValidationStore::new(), start_time());
    wait_until(&f.handle, |s| s.ready).await;
    f.remote.delay_submit(Duration::from_secs(5));

    let first = tokio::spawn({
        let handle = f.handle.clone();
        async move { handle.submit(SessionType::Short).await }
    });
    wait_until(&f.handle, |s| s.submitting).await;

    assert!(matches!(
        f.handle.submit(SessionType::Short).await,
        Err(SessionError::SubmitSkipped(SessionType::Short))
    ));
    assert!(first.await.unwrap().is_ok());
    assert_eq!(f.remote.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn countdown_starts_from_remaining_phase_time() {
    // 30s into a 120s short session, minus the 10s margin
    let f = start(
        short_session_remote(),
        MemoryValidationStore::new(),
        start_time() + TimeDelta::seconds(30),
    );

    let mut seconds = f.handle.subscribe_seconds();
    timeout(Duration::from_secs(5), seconds.wait_for(|s| *s == Some(80)))
        .await
        .unwrap()
        .unwrap();
    sleep(Duration::from_millis(5_500)).await;
    assert_eq!(f.handle.seconds(), Some(75));
    assert_eq!(f.handle.metrics().remaining_seconds.get(), 75);
}

#[tokio::test(start_paused = true)]
async fn answers_are_submitted_automatically_in_the_last_second() {
    let remote = short_session_remote();
    // 20s short session leaves a 10s countdown
    remote.set_intervals(intervals(20, 300));
    let f = start(remote, MemoryValidationStore::new(), start_time());

    wait_until(&f.handle, |s| s.ready).await;
    f.handle.dispatch(Action::Answer(AnswerType::Right)).unwrap();

    let state = wait_until(&f.handle, |s| s.short_answers_submitted).await;
    assert_eq!(state.short_answers[0].answer, AnswerType::Right);
    let submissions = f.remote.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].0, SessionType::Short);
}

#[tokio::test(start_paused = true)]
async fn last_second_submission_is_attempted_once() {
    let remote = short_session_remote();
    remote.set_intervals(intervals(20, 300));
    remote.fail_submit(true);
    let f = start(remote, MemoryValidationStore::new(), start_time());

    wait_until(&f.handle, |s| s.ready).await;
    f.handle.dispatch(Action::Answer(AnswerType::Right)).unwrap();
    wait_until(&f.handle, |s| s.error.is_some()).await;
    assert_eq!(f.handle.metrics().submission_failures.get(), 1);

    // a recomputed countdown lands on the last second again
    f.remote.fail_submit(false);
    f.clock.set(start_time() + TimeDelta::seconds(9));
    let mut moved = epoch_info(5, EpochPeriod::ShortSession);
    moved.next_validation = start_time() + TimeDelta::days(1);
    f.remote.set_epoch(moved.clone());
    let mut epochs = f.handle.subscribe_epoch();
    timeout(Duration::from_secs(5), epochs.wait_for(|e| e.as_ref() == Some(&moved)))
        .await
        .unwrap()
        .unwrap();

    sleep(Duration::from_secs(3)).await;
    assert!(f.remote.submissions().is_empty());
    assert!(!f.handle.state().short_answers_submitted);
    assert_eq!(f.handle.metrics().submission_failures.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn nothing_is_submitted_automatically_without_answers() {
    let remote = short_session_remote();
    remote.set_intervals(intervals(20, 300));
    let f = start(remote, MemoryValidationStore::new(), start_time());

    wait_until(&f.handle, |s| s.ready).await;
    sleep(Duration::from_secs(15)).await;
    assert_eq!(f.handle.seconds(), Some(0));
    assert!(f.remote.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn epoch_change_resets_store_and_state() {
    let store = MemoryValidationStore::with_value(PersistedValidation {
        epoch: 4,
        answers: [Some(short_answers()), None],
    });
    let f = start(short_session_remote(), store, start_time());
    assert!(f.handle.state().short_answers_submitted);

    let state = wait_until(&f.handle, |s| s.epoch == Some(5)).await;
    assert!(!state.short_answers_submitted);
    assert!(state.short_answers.is_empty());
    assert_eq!(
        f.store.get().unwrap(),
        PersistedValidation {
            epoch: 5,
            answers: [None, None],
        }
    );
    assert_eq!(f.handle.metrics().epoch_resets.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn answers_saved_for_the_current_epoch_are_kept() {
    let store = MemoryValidationStore::with_value(PersistedValidation {
        epoch: 5,
        answers: [Some(short_answers()), None],
    });
    let remote = short_session_remote();
    remote.set_epoch(epoch_info(5, EpochPeriod::LongSession));
    let f = start(remote, store, start_time());

    sleep(Duration::from_secs(3)).await;
    let state = f.handle.state();
    assert!(state.short_answers_submitted);
    assert_eq!(state.short_answers, short_answers());
    assert_eq!(f.handle.metrics().epoch_resets.get(), 0);
    assert!(f
        .remote
        .hash_requests()
        .iter()
        .all(|session_type| *session_type == SessionType::Long));
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_timers_and_closes_the_handle() {
    let remote = short_session_remote();
    remote.fail_hashes(true);
    let f = start(remote, MemoryValidationStore::new(), start_time());
    wait_until(&f.handle, |s| s.error.is_some()).await;

    let handle = f.handle.clone();
    f.session.shutdown().await;
    let enumerations = f.remote.hash_requests().len();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(f.remote.hash_requests().len(), enumerations);
    assert!(handle.is_closed());
    assert!(matches!(handle.dispatch(Action::Next), Err(SessionError::Closed)));
    assert!(matches!(
        handle.submit(SessionType::Short).await,
        Err(SessionError::Closed)
    ));
}
