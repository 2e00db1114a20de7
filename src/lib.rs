// src/lib.rs - Motorized curtain position simulator
pub mod clock;
pub mod config;
pub mod console;
pub mod cover;
pub mod error;
pub mod observer;
pub mod registry;
pub mod transport;

pub use config::{Config, ConfigError, CoverConfig, HostConfig};
pub use cover::{CoverSnapshot, MotionController, MotionState, Polarity};
pub use error::{CoverError, TransportError};
pub use observer::{BroadcastObserver, StateObserver};
pub use registry::{CoverHandle, CoverRegistry, CoverRequest};
pub use transport::{CommandTransport, SimulatedTransport};
