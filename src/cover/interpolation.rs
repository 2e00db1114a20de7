// src/cover/interpolation.rs - Cancellable task that simulates travel between two positions
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::cover::position::{CoverSnapshot, MotionState, Polarity, clamp_position, interpolate};
use crate::observer::StateObserver;

/// Lower bound on the tick cadence so a misconfigured interval cannot spin.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Write authority over a cover's state. Exactly one holder at a time: the
/// controller, or the motion task it handed it to.
pub struct PositionWriter {
    name: String,
    polarity: Polarity,
    position: f64,
    motion_state: MotionState,
    state_tx: watch::Sender<CoverSnapshot>,
    observer: Arc<dyn StateObserver>,
}

impl PositionWriter {
    pub fn new(
        name: impl Into<String>,
        polarity: Polarity,
        position: f64,
        observer: Arc<dyn StateObserver>,
    ) -> Self {
        let name = name.into();
        let position = clamp_position(position);
        let initial = CoverSnapshot::new(name.clone(), position, MotionState::Idle, polarity);
        let (state_tx, _) = watch::channel(initial);
        Self {
            name,
            polarity,
            position,
            motion_state: MotionState::Idle,
            state_tx,
            observer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn motion_state(&self) -> MotionState {
        self.motion_state
    }

    pub fn snapshot(&self) -> CoverSnapshot {
        CoverSnapshot::new(self.name.clone(), self.position, self.motion_state, self.polarity)
    }

    pub fn subscribe(&self) -> watch::Receiver<CoverSnapshot> {
        self.state_tx.subscribe()
    }

    /// Record a new estimate and notify everyone watching.
    pub fn publish(&mut self, position: f64, motion_state: MotionState) {
        self.position = clamp_position(position);
        self.motion_state = motion_state;
        let snapshot = self.snapshot();
        self.state_tx.send_replace(snapshot.clone());
        self.observer.state_changed(&snapshot);
    }
}

impl std::fmt::Debug for PositionWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionWriter")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("motion_state", &self.motion_state)
            .finish()
    }
}

/// One move: where from, where to, how long, and how often to publish.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionPlan {
    pub start: f64,
    pub target: f64,
    pub duration: Duration,
    pub direction: MotionState,
    pub tick: Duration,
}

impl MotionPlan {
    pub fn new(start: f64, target: f64, duration: Duration, direction: MotionState, tick: Duration) -> Self {
        Self {
            start: clamp_position(start),
            target: clamp_position(target),
            duration,
            direction,
            tick: tick.max(MIN_TICK),
        }
    }

    /// Estimated position `elapsed` into the move.
    pub fn position_at(&self, elapsed: Duration) -> f64 {
        interpolate(self.start, self.target, elapsed.as_secs_f64(), self.duration.as_secs_f64())
    }
}

/// Handle to a running interpolation task. The task owns the
/// `PositionWriter` until it finishes or is cancelled, then hands it back
/// through its join handle. Dropping the handle cancels the task.
#[derive(Debug)]
pub struct MotionTask {
    cancel_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<PositionWriter>,
}

impl MotionTask {
    pub fn spawn(writer: PositionWriter, plan: MotionPlan, clock: Arc<dyn Clock>) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let handle = tokio::spawn(run_motion(writer, plan, clock, cancel_rx));
        Self {
            cancel_tx: Some(cancel_tx),
            handle,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Ask the task to stop and wait until it has. Returns write authority,
    /// or `None` if the task was torn down without handing it back.
    pub async fn cancel(&mut self) -> Option<PositionWriter> {
        self.signal_cancel();
        self.join().await
    }

    /// Wait for the task to finish on its own. Returns write authority, or
    /// `None` if the task was torn down without handing it back.
    pub async fn join(&mut self) -> Option<PositionWriter> {
        match (&mut self.handle).await {
            Ok(writer) => Some(writer),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                tracing::error!("Motion task ended without returning its writer: {}", e);
                None
            }
        }
    }

    fn signal_cancel(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            if cancel_tx.send(()).is_err() {
                // Already settled at its target.
                tracing::debug!("Cancellation raced with motion completion");
            }
        }
    }
}

impl Drop for MotionTask {
    fn drop(&mut self) {
        self.signal_cancel();
    }
}

async fn run_motion(
    mut writer: PositionWriter,
    plan: MotionPlan,
    clock: Arc<dyn Clock>,
    mut cancel_rx: oneshot::Receiver<()>,
) -> PositionWriter {
    let t0 = clock.now();
    tracing::debug!(
        "Curtain {} moving {:.1}% -> {:.1}% over {:.2}s",
        writer.name(),
        plan.start,
        plan.target,
        plan.duration.as_secs_f64()
    );
    loop {
        let remaining = plan.duration.saturating_sub(clock.now().saturating_duration_since(t0));
        tokio::select! {
            biased;
            _ = &mut cancel_rx => {
                tracing::debug!("Curtain {} movement cancelled at {:.1}%", writer.name(), writer.position());
                return writer;
            }
            _ = tokio::time::sleep(remaining.min(plan.tick)) => {}
        }
        let elapsed = clock.now().saturating_duration_since(t0);
        // A cancel that arrived after the timer fired still wins.
        if !matches!(cancel_rx.try_recv(), Err(TryRecvError::Empty)) {
            tracing::debug!("Curtain {} movement cancelled at {:.1}%", writer.name(), writer.position());
            return writer;
        }
        if elapsed >= plan.duration {
            writer.publish(plan.target, MotionState::Idle);
            tracing::debug!("Curtain {} reached {:.1}%", writer.name(), plan.target);
            return writer;
        }
        writer.publish(plan.position_at(elapsed), plan.direction);
    }
}
