// src/error.rs - Error types shared by the controller, registry and transport
use thiserror::Error;

/// Errors surfaced to callers of cover operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoverError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid cover configuration: {0}")]
    InvalidConfig(String),
    #[error("Unknown cover: {0}")]
    UnknownCover(String),
    #[error("Cover already registered: {0}")]
    DuplicateCover(String),
    #[error("Cover '{0}' is no longer accepting commands")]
    Unavailable(String),
}

/// Failures reported by a command transport. The controller logs these and
/// carries on with the simulation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("Bridge unreachable: {0}")]
    Unreachable(String),
    #[error("No bridge device configured")]
    NotConfigured,
    #[error("Command rejected: {0}")]
    Rejected(String),
}
