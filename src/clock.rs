// src/clock.rs - Monotonic time source used for elapsed-time computation
use tokio::time::Instant;

/// Monotonic clock seam. Returns tokio instants so paused-time tests drive
/// both the clock and the tick sleeps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Clock backed by the tokio runtime's time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
