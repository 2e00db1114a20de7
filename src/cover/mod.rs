// src/cover/mod.rs - Cover position simulation
pub mod controller;
pub mod interpolation;
mod position;

pub use controller::MotionController;
pub use interpolation::{MotionPlan, MotionTask, PositionWriter};
pub use position::{
    CLOSED_TOLERANCE, CoverSnapshot, MAX_POSITION, MIN_POSITION, MotionState, Polarity,
    clamp_position, interpolate, is_valid_position, travel_duration,
};
