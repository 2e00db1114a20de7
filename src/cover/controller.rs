// src/cover/controller.rs - Motion controller owning one cover's simulated position
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::clock::{Clock, TokioClock};
use crate::config::{CoverConfig, HostConfig};
use crate::cover::interpolation::{MotionPlan, MotionTask, PositionWriter};
use crate::cover::position::{CoverSnapshot, MotionState, Polarity, is_valid_position, travel_duration};
use crate::error::CoverError;
use crate::observer::StateObserver;
use crate::transport::CommandTransport;

/// Handles open/close/stop/set-position for a single cover and keeps the
/// estimated position up to date by delegating travel to a `MotionTask`.
///
/// Write authority lives either in `writer` (idle) or inside `task`
/// (moving), never both. Every command first cancels and awaits the running
/// task, so at most one task exists per cover.
pub struct MotionController {
    name: String,
    polarity: Polarity,
    full_travel: Duration,
    update_interval: Duration,
    open_code: String,
    close_code: String,
    stop_code: String,
    transport: Arc<dyn CommandTransport>,
    clock: Arc<dyn Clock>,
    writer: Option<PositionWriter>,
    task: Option<MotionTask>,
    state_rx: watch::Receiver<CoverSnapshot>,
}

impl MotionController {
    pub fn new(
        config: &CoverConfig,
        host: &HostConfig,
        transport: Arc<dyn CommandTransport>,
        observer: Arc<dyn StateObserver>,
    ) -> Result<Self, CoverError> {
        config.validate().map_err(CoverError::InvalidConfig)?;
        if config.update_interval(host).is_zero() {
            return Err(CoverError::InvalidConfig("update_interval_ms must be > 0".to_string()));
        }
        let writer = PositionWriter::new(
            config.name.clone(),
            config.polarity,
            config.start_position(),
            observer,
        );
        let state_rx = writer.subscribe();
        tracing::info!(
            "Registered curtain {} ({:.1}s full travel, {:?})",
            config.name,
            config.full_travel_duration,
            config.polarity
        );
        Ok(Self {
            name: config.name.clone(),
            polarity: config.polarity,
            full_travel: config.full_travel(),
            update_interval: config.update_interval(host),
            open_code: config.open_code.clone(),
            close_code: config.close_code.clone(),
            stop_code: config.stop_code.clone(),
            transport,
            clock: Arc::new(TokioClock),
            writer: Some(writer),
            task: None,
            state_rx,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn snapshot(&self) -> CoverSnapshot {
        self.state_rx.borrow().clone()
    }

    pub fn position(&self) -> f64 {
        self.state_rx.borrow().position
    }

    pub fn motion_state(&self) -> MotionState {
        self.state_rx.borrow().motion_state
    }

    /// True while an interpolation task is still running.
    pub fn is_moving(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn subscribe(&self) -> watch::Receiver<CoverSnapshot> {
        self.state_rx.clone()
    }

    pub async fn open(&mut self) -> Result<(), CoverError> {
        self.halt().await?;
        tracing::info!("Opening curtain {} with code: {}", self.name, self.open_code);
        self.dispatch(&self.open_code).await;
        self.travel_to(self.polarity.open_end(), MotionState::Opening)
    }

    pub async fn close(&mut self) -> Result<(), CoverError> {
        self.halt().await?;
        tracing::info!("Closing curtain {} with code: {}", self.name, self.close_code);
        self.dispatch(&self.close_code).await;
        self.travel_to(self.polarity.closed_end(), MotionState::Closing)
    }

    pub async fn stop(&mut self) -> Result<(), CoverError> {
        let interrupted = self.halt().await?;
        tracing::info!("Stopping curtain {} with code: {}", self.name, self.stop_code);
        self.dispatch(&self.stop_code).await;
        // An interrupted move was already marked idle by `halt`.
        if !interrupted {
            let writer = self.writer_mut()?;
            let position = writer.position();
            writer.publish(position, MotionState::Idle);
        }
        Ok(())
    }

    pub async fn set_position(&mut self, target: f64) -> Result<(), CoverError> {
        if !is_valid_position(target) {
            return Err(CoverError::InvalidArgument(format!(
                "position must be between 0 and 100, got {}",
                target
            )));
        }
        self.halt().await?;
        let current = self.writer_mut()?.position();
        let direction = self.polarity.direction(current, target);
        let code = match direction {
            MotionState::Idle => {
                tracing::debug!("Curtain {} already at {:.1}%", self.name, current);
                return Ok(());
            }
            MotionState::Opening => {
                tracing::info!("Opening curtain {} to {:.1}%", self.name, target);
                &self.open_code
            }
            MotionState::Closing => {
                tracing::info!("Closing curtain {} to {:.1}%", self.name, target);
                &self.close_code
            }
        };
        self.dispatch(code).await;
        self.travel_to(target, direction)
    }

    /// Wait for any running move to finish on its own.
    pub async fn settle(&mut self) {
        if let Some(mut task) = self.task.take() {
            self.writer = task.join().await;
        }
    }

    /// Cancel any motion ahead of removal.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.halt().await {
            tracing::warn!("Curtain {} shut down uncleanly: {}", self.name, e);
        }
        tracing::info!("Curtain {} removed at {:.1}%", self.name, self.position());
    }

    /// Cancel and await the running task, taking write authority back. A
    /// move that was interrupted is marked idle at its last estimate, and
    /// `true` is returned.
    async fn halt(&mut self) -> Result<bool, CoverError> {
        if let Some(mut task) = self.task.take() {
            self.writer = task.cancel().await;
        }
        let writer = self.writer_mut()?;
        if writer.motion_state() == MotionState::Idle {
            return Ok(false);
        }
        let position = writer.position();
        writer.publish(position, MotionState::Idle);
        Ok(true)
    }

    fn writer_mut(&mut self) -> Result<&mut PositionWriter, CoverError> {
        self.writer
            .as_mut()
            .ok_or_else(|| CoverError::Unavailable(self.name.clone()))
    }

    /// Best-effort dispatch: failures are logged and the simulation proceeds.
    async fn dispatch(&self, code: &str) {
        match self.transport.send_command(code).await {
            Ok(()) => tracing::debug!("Sent IR code for curtain {}: {}", self.name, code),
            Err(e) => {
                tracing::error!("Failed to send IR code for curtain {}: {}", self.name, e);
                tracing::debug!("Falling back to simulation for IR code: {}", code);
            }
        }
    }

    /// Start travelling to `target`, or settle immediately when there is no
    /// distance to cover.
    fn travel_to(&mut self, target: f64, direction: MotionState) -> Result<(), CoverError> {
        let full_travel = self.full_travel;
        let writer = self.writer_mut()?;
        let start = writer.position();
        let duration = travel_duration(target - start, full_travel);
        if duration.is_zero() {
            writer.publish(target, MotionState::Idle);
            return Ok(());
        }
        writer.publish(start, direction);
        let plan = MotionPlan::new(start, target, duration, direction, self.update_interval);
        if let Some(writer) = self.writer.take() {
            self.task = Some(MotionTask::spawn(writer, plan, self.clock.clone()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MotionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionController")
            .field("name", &self.name)
            .field("polarity", &self.polarity)
            .field("full_travel", &self.full_travel)
            .field("snapshot", &*self.state_rx.borrow())
            .field("moving", &self.is_moving())
            .finish()
    }
}
