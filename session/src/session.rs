//! The session event loop and the handle consumers hold.

use std::collections::HashMap;
use std::sync::Arc;

use ceremony_rpc::{RemoteNode, RpcError};
use ceremony_store::ValidationStore;
use ceremony_types::{
    AnswerPayload, CeremonyIntervals, Clock, EpochInfo, EpochPeriod, SessionType,
};
use ceremony_validation::{
    auto_submit_due, Action, Effect, FlipData, RestoredValidation, SessionTimer, ValidationState,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::effects;
use crate::{CancelHandle, Scheduler, SessionConfig, SessionError, SessionMetrics};

type SubmitReply = oneshot::Sender<Result<Vec<AnswerPayload>, SessionError>>;

/// Everything the event loop reacts to.
enum Message {
    Dispatch(Action),
    Submit {
        session_type: SessionType,
        reply: SubmitReply,
    },
    FetchFinished {
        generation: u64,
        session_type: SessionType,
        result: Result<Vec<FlipData>, RpcError>,
    },
    SubmitFinished {
        session_type: SessionType,
        answers: Vec<AnswerPayload>,
        epoch: u64,
        result: Result<(), RpcError>,
    },
    EpochObserved(EpochInfo),
    TimingObserved(CeremonyIntervals),
    PollFlips,
    ExtraFlipsDue(SessionType),
    Tick,
    Shutdown,
}

/// A running validation session.
pub struct ValidationSession {
    handle: SessionHandle,
    task: JoinHandle<()>,
}

impl ValidationSession {
    /// Restore persisted answers and start the event loop with its pollers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: SessionConfig,
        remote: Arc<dyn RemoteNode>,
        store: Arc<dyn ValidationStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SessionError> {
        let persisted = store.get()?;
        let mut state = ValidationState::default();
        state.apply(Action::LoadValidation(RestoredValidation {
            epoch: persisted.epoch,
            short_answers: persisted.short_answers().map(<[_]>::to_vec),
            long_answers: persisted.long_answers().map(<[_]>::to_vec),
        }));
        debug!(
            epoch = persisted.epoch,
            short = state.short_answers_submitted,
            long = state.long_answers_submitted,
            "validation restored"
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(state.clone());
        let (seconds_tx, seconds_rx) = watch::channel(None);
        let (epoch_tx, epoch_rx) = watch::channel(None);
        let metrics = Arc::new(SessionMetrics::new());

        let mut driver = Driver {
            config,
            remote,
            store,
            clock,
            metrics: metrics.clone(),
            tx: tx.clone(),
            scheduler: Scheduler::new(),
            state,
            epoch: None,
            intervals: None,
            timer: SessionTimer::new(),
            reset_to: None,
            generation: 0,
            flips_for: None,
            fetch_in_flight: false,
            fetch_poll: None,
            extra_flips: HashMap::new(),
            tick: None,
            auto_submitted: false,
            submit_waiters: HashMap::new(),
            state_tx,
            seconds_tx,
            epoch_tx,
        };
        driver.start_pollers();
        let task = tokio::spawn(driver.run(rx));

        Ok(Self {
            handle: SessionHandle {
                tx,
                state: state_rx,
                seconds: seconds_rx,
                epoch: epoch_rx,
                metrics,
            },
            task,
        })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Stop every timer and wait for the loop to exit.
    pub async fn shutdown(self) {
        self.handle.shutdown();
        if let Err(e) = self.task.await {
            warn!(error = %e, "validation session task ended abnormally");
        }
    }
}

/// Cloneable access to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Message>,
    state: watch::Receiver<ValidationState>,
    seconds: watch::Receiver<Option<u64>>,
    epoch: watch::Receiver<Option<EpochInfo>>,
    metrics: Arc<SessionMetrics>,
}

impl SessionHandle {
    pub fn dispatch(&self, action: Action) -> Result<(), SessionError> {
        self.send(Message::Dispatch(action))
    }

    /// Submit the current answers for a phase and wait for the node.
    pub async fn submit(
        &self,
        session_type: SessionType,
    ) -> Result<Vec<AnswerPayload>, SessionError> {
        let (reply, response) = oneshot::channel();
        self.send(Message::Submit {
            session_type,
            reply,
        })?;
        response.await.map_err(|_| SessionError::Closed)?
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ValidationState {
        self.state.borrow().clone()
    }

    /// Seconds left in the current phase; `None` until epoch and timing are known.
    pub fn seconds(&self) -> Option<u64> {
        *self.seconds.borrow()
    }

    /// Last epoch reported by the node.
    pub fn epoch(&self) -> Option<EpochInfo> {
        self.epoch.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ValidationState> {
        self.state.clone()
    }

    pub fn subscribe_seconds(&self) -> watch::Receiver<Option<u64>> {
        self.seconds.clone()
    }

    pub fn subscribe_epoch(&self) -> watch::Receiver<Option<EpochInfo>> {
        self.epoch.clone()
    }

    pub fn metrics(&self) -> &Arc<SessionMetrics> {
        &self.metrics
    }

    /// Ask the loop to stop. Returns immediately.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Message::Shutdown);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, message: Message) -> Result<(), SessionError> {
        self.tx.send(message).map_err(|_| SessionError::Closed)
    }
}

/// Owner of the state. Lives inside the event loop task.
struct Driver {
    config: SessionConfig,
    remote: Arc<dyn RemoteNode>,
    store: Arc<dyn ValidationStore>,
    clock: Arc<dyn Clock>,
    metrics: Arc<SessionMetrics>,
    tx: mpsc::UnboundedSender<Message>,
    scheduler: Scheduler,

    state: ValidationState,
    epoch: Option<EpochInfo>,
    intervals: Option<CeremonyIntervals>,
    timer: SessionTimer,
    /// Epoch the detector last reset to, even if the store write failed.
    reset_to: Option<u64>,

    /// Bumped whenever the flip list is cleared; older fetch results are dropped.
    generation: u64,
    /// Phase the flips in state were fetched for.
    flips_for: Option<SessionType>,
    fetch_in_flight: bool,
    fetch_poll: Option<(SessionType, CancelHandle)>,
    extra_flips: HashMap<SessionType, CancelHandle>,
    tick: Option<CancelHandle>,
    /// The last-second submission already fired this epoch.
    auto_submitted: bool,
    submit_waiters: HashMap<SessionType, SubmitReply>,

    state_tx: watch::Sender<ValidationState>,
    seconds_tx: watch::Sender<Option<u64>>,
    epoch_tx: watch::Sender<Option<EpochInfo>>,
}

impl Driver {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        info!("validation session started");
        while let Some(message) = rx.recv().await {
            if !self.on_message(message) {
                break;
            }
        }
        self.scheduler.cancel_all();
        info!("validation session stopped");
    }

    fn start_pollers(&mut self) {
        let remote = self.remote.clone();
        let tx = self.tx.clone();
        let metrics = self.metrics.clone();
        self.scheduler
            .schedule_repeating(self.config.epoch_poll(), move || {
                let remote = remote.clone();
                let tx = tx.clone();
                let metrics = metrics.clone();
                async move {
                    match remote.epoch().await {
                        Ok(epoch) => {
                            let _ = tx.send(Message::EpochObserved(epoch));
                        }
                        Err(e) => {
                            metrics.poll_failures.inc();
                            warn!(error = %e, "epoch poll failed");
                        }
                    }
                }
            });

        let remote = self.remote.clone();
        let tx = self.tx.clone();
        let metrics = self.metrics.clone();
        self.scheduler
            .schedule_repeating(self.config.timing_poll(), move || {
                let remote = remote.clone();
                let tx = tx.clone();
                let metrics = metrics.clone();
                async move {
                    match remote.ceremony_intervals().await {
                        Ok(intervals) => {
                            let _ = tx.send(Message::TimingObserved(intervals));
                        }
                        Err(e) => {
                            metrics.poll_failures.inc();
                            warn!(error = %e, "timing poll failed");
                        }
                    }
                }
            });
    }

    /// Returns false once the loop should stop.
    fn on_message(&mut self, message: Message) -> bool {
        match message {
            Message::Dispatch(action) => self.dispatch(action),
            Message::Submit {
                session_type,
                reply,
            } => {
                let epoch = self.current_epoch();
                let effects = self.apply(Action::SubmitAnswers {
                    session_type,
                    epoch,
                });
                if effects.is_empty() {
                    let _ = reply.send(Err(SessionError::SubmitSkipped(session_type)));
                } else {
                    self.submit_waiters.insert(session_type, reply);
                }
                self.settle(effects);
            }
            Message::FetchFinished {
                generation,
                session_type,
                result,
            } => self.on_fetch_finished(generation, session_type, result),
            Message::SubmitFinished {
                session_type,
                answers,
                epoch,
                result,
            } => self.on_submit_finished(session_type, answers, epoch, result),
            Message::EpochObserved(epoch) => self.observe_epoch(epoch),
            Message::TimingObserved(intervals) => self.observe_timing(intervals),
            Message::PollFlips => {
                let polled = self.fetch_poll.as_ref().map(|(session_type, _)| *session_type);
                if let (Some(session_type), false) = (polled, self.fetch_in_flight) {
                    self.dispatch(Action::StartFetchFlips(session_type));
                }
            }
            Message::ExtraFlipsDue(session_type) => {
                let polled = self.fetch_poll.as_ref().map(|(polled, _)| *polled);
                if self.state.ready
                    || self.state.answers_submitted(session_type)
                    || polled != Some(session_type)
                {
                    debug!(%session_type, "extra flips not needed");
                } else {
                    info!(%session_type, "flips still missing, revealing extra flips");
                    self.dispatch(Action::ShowExtraFlips);
                }
            }
            Message::Tick => {
                self.timer.tick();
                if !self.timer.is_running() {
                    if let Some(tick) = self.tick.take() {
                        tick.cancel();
                    }
                }
                self.publish_seconds();
            }
            Message::Shutdown => return false,
        }
        true
    }

    // ── Transitions ─────────────────────────────────────────────────────

    fn apply(&mut self, action: Action) -> Vec<Effect> {
        let clears_flips = matches!(
            action,
            Action::ResetEpoch(_)
                | Action::EnterPhase(_)
                | Action::SubmitShortAnswers { .. }
                | Action::SubmitLongAnswers { .. }
        );
        let new_epoch = matches!(action, Action::ResetEpoch(_));

        let effects = self.state.apply(action);

        if clears_flips {
            self.generation += 1;
            self.flips_for = None;
            self.fetch_in_flight = false;
        }
        if new_epoch {
            self.auto_submitted = false;
            for (_, handle) in self.extra_flips.drain() {
                handle.cancel();
            }
            if let Some((_, handle)) = self.fetch_poll.take() {
                handle.cancel();
            }
        }
        effects
    }

    /// Run effects, then bring polling and observers in line with the state.
    fn settle(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.run_effect(effect);
        }
        self.sync_fetch_polling();

        let failed = self.state.flips.iter().filter(|flip| flip.failed).count();
        self.metrics.failed_flips.set(failed as i64);
        self.state_tx.send_replace(self.state.clone());
    }

    fn dispatch(&mut self, action: Action) {
        let effects = self.apply(action);
        self.settle(effects);
    }

    fn current_epoch(&self) -> u64 {
        self.epoch
            .as_ref()
            .map(|epoch| epoch.epoch)
            .or(self.state.epoch)
            .unwrap_or(0)
    }

    fn current_period(&self) -> EpochPeriod {
        self.epoch
            .as_ref()
            .map(|epoch| epoch.current_period)
            .unwrap_or_default()
    }

    // ── Effects ─────────────────────────────────────────────────────────

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::FetchFlips {
                session_type,
                known,
            } => {
                if self.fetch_in_flight {
                    debug!(%session_type, "fetch cycle already in flight");
                    return;
                }
                self.fetch_in_flight = true;
                self.metrics.fetch_cycles.inc();

                let remote = self.remote.clone();
                let tx = self.tx.clone();
                let generation = self.generation;
                tokio::spawn(async move {
                    let result = effects::fetch_flips(remote.as_ref(), session_type, &known).await;
                    let _ = tx.send(Message::FetchFinished {
                        generation,
                        session_type,
                        result,
                    });
                });
            }
            Effect::SubmitAnswers {
                session_type,
                answers,
                epoch,
            } => {
                info!(%session_type, epoch, answers = answers.len(), "submitting answers");
                let remote = self.remote.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result =
                        effects::submit_answers(remote.as_ref(), session_type, answers.clone())
                            .await;
                    let _ = tx.send(Message::SubmitFinished {
                        session_type,
                        answers,
                        epoch,
                        result,
                    });
                });
            }
        }
    }

    fn on_fetch_finished(
        &mut self,
        generation: u64,
        session_type: SessionType,
        result: Result<Vec<FlipData>, RpcError>,
    ) {
        if generation != self.generation {
            debug!(%session_type, "dropping fetch result for cleared flips");
            return;
        }
        self.fetch_in_flight = false;

        match result {
            Ok(data) => {
                self.flips_for = Some(session_type);
                let was_ready = self.state.ready;
                self.dispatch(Action::FetchFlipsSucceeded { data, session_type });
                if self.state.ready && !was_ready {
                    info!(%session_type, flips = self.state.flips.len(), "flips ready");
                }
            }
            Err(e) => {
                self.metrics.fetch_failures.inc();
                warn!(%session_type, error = %e, "fetch cycle failed");
                self.dispatch(Action::FetchFlipsFailed {
                    error: e.to_string(),
                });
            }
        }
    }

    fn on_submit_finished(
        &mut self,
        session_type: SessionType,
        answers: Vec<AnswerPayload>,
        epoch: u64,
        result: Result<(), RpcError>,
    ) {
        let waiter = self.submit_waiters.remove(&session_type);

        match result {
            Ok(()) => {
                self.metrics.submissions.inc();
                let persisted = match session_type {
                    SessionType::Short => self.store.set_short_answers(&answers, epoch),
                    SessionType::Long => self.store.set_long_answers(&answers, epoch),
                };
                if let Err(e) = persisted {
                    warn!(%session_type, error = %e, "failed to persist submitted answers");
                }

                let action = match session_type {
                    SessionType::Short => Action::SubmitShortAnswers {
                        answers: answers.clone(),
                        epoch,
                    },
                    SessionType::Long => Action::SubmitLongAnswers {
                        answers: answers.clone(),
                        epoch,
                    },
                };
                self.dispatch(action);
                if let Some(waiter) = waiter {
                    let _ = waiter.send(Ok(answers));
                }
            }
            Err(e) => {
                self.metrics.submission_failures.inc();
                warn!(%session_type, error = %e, "submission failed");
                self.dispatch(Action::SubmitFailed {
                    session_type,
                    error: e.to_string(),
                });
                if let Some(waiter) = waiter {
                    let _ = waiter.send(Err(SessionError::Rpc(e)));
                }
            }
        }
    }

    // ── Observers ───────────────────────────────────────────────────────

    fn observe_epoch(&mut self, info: EpochInfo) {
        let changed = self.epoch.as_ref() != Some(&info);
        if changed {
            let previous = self.epoch.as_ref().map(|epoch| epoch.current_period);
            if previous != Some(info.current_period) {
                info!(epoch = info.epoch, period = ?info.current_period, "epoch period");
            }
            self.epoch = Some(info.clone());
            self.epoch_tx.send_replace(Some(info.clone()));
        }

        self.detect_epoch_change(info.epoch);

        if changed {
            self.recompute_timer();
            self.sync_fetch_polling();
        }
    }

    /// Reset the store and the state when the node reports an epoch other
    /// than the one answers were saved for.
    fn detect_epoch_change(&mut self, epoch: u64) {
        let saved = match self.store.get() {
            Ok(saved) => saved.epoch,
            Err(e) => {
                warn!(error = %e, "failed to read validation store");
                return;
            }
        };
        if saved == epoch || self.reset_to == Some(epoch) {
            return;
        }

        info!(saved, epoch, "new epoch");
        if let Err(e) = self.store.reset(epoch) {
            warn!(epoch, error = %e, "failed to reset validation store");
        }
        self.reset_to = Some(epoch);
        self.metrics.epoch_resets.inc();
        self.dispatch(Action::ResetEpoch(epoch));
    }

    fn observe_timing(&mut self, intervals: CeremonyIntervals) {
        if self.intervals.as_ref() == Some(&intervals) {
            return;
        }
        debug!(
            short = intervals.short_session_duration,
            long = intervals.long_session_duration,
            "ceremony intervals"
        );
        self.intervals = Some(intervals);
        self.recompute_timer();
    }

    // ── Timers ──────────────────────────────────────────────────────────

    fn recompute_timer(&mut self) {
        let (Some(epoch), Some(intervals)) = (&self.epoch, &self.intervals) else {
            return;
        };
        let seconds = self.timer.reset(epoch, intervals, self.clock.now());
        debug!(seconds, "countdown recomputed");

        if let Some(tick) = self.tick.take() {
            tick.cancel();
        }
        if self.timer.is_running() {
            let tx = self.tx.clone();
            let every = self.config.tick();
            self.tick = Some(self.scheduler.schedule_repeating_after(every, every, move || {
                let _ = tx.send(Message::Tick);
                std::future::ready(())
            }));
        }
        self.publish_seconds();
    }

    fn publish_seconds(&mut self) {
        let seconds = self.timer.seconds();
        self.seconds_tx.send_replace(seconds);
        self.metrics
            .remaining_seconds
            .set(seconds.map_or(-1, |s| s as i64));

        if self.auto_submitted {
            return;
        }
        if let Some(session_type) = auto_submit_due(seconds, self.current_period(), &self.state) {
            info!(%session_type, "last second of the session, submitting answers");
            self.auto_submitted = true;
            let epoch = self.current_epoch();
            self.dispatch(Action::SubmitAnswers {
                session_type,
                epoch,
            });
        }
    }

    /// Poll flips only during a validation period while the current phase
    /// still needs them. The first poll of a phase also arms its
    /// extra-flips timer.
    ///
    /// Flips fetched for one phase are dropped once the other phase begins,
    /// so the new phase starts from an empty list.
    fn sync_fetch_polling(&mut self) {
        let period = self.current_period();
        if period.is_validation() {
            let phase = self.state.session_type_for(period);
            if self.flips_for.is_some_and(|fetched| fetched != phase) {
                // re-enters here with the list cleared
                self.dispatch(Action::EnterPhase(phase));
                return;
            }
        }
        let wanted = (period.is_validation() && !self.state.is_finished() && !self.state.ready)
            .then(|| self.state.session_type_for(period));
        let current = self.fetch_poll.as_ref().map(|(session_type, _)| *session_type);

        if wanted != current {
            if let Some((session_type, handle)) = self.fetch_poll.take() {
                handle.cancel();
                debug!(%session_type, "flip polling stopped");
            }
            if let Some(session_type) = wanted {
                debug!(%session_type, "flip polling started");
                let tx = self.tx.clone();
                let handle = self
                    .scheduler
                    .schedule_repeating(self.config.fetch_interval(), move || {
                        let _ = tx.send(Message::PollFlips);
                        std::future::ready(())
                    });
                self.fetch_poll = Some((session_type, handle));
            }
        }

        let Some(session_type) = wanted else {
            return;
        };
        let in_phase = matches!(
            (session_type, period),
            (SessionType::Short, EpochPeriod::ShortSession)
                | (SessionType::Long, EpochPeriod::LongSession)
        );
        if in_phase && !self.extra_flips.contains_key(&session_type) {
            let tx = self.tx.clone();
            let handle = self
                .scheduler
                .schedule_once(self.config.extra_flips_delay(), async move {
                    let _ = tx.send(Message::ExtraFlipsDue(session_type));
                });
            self.extra_flips.insert(session_type, handle);
        }
    }
}
