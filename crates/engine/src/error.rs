//! The module contains the errors the engine can return.
//!
//! Every error is local: it is raised before any state is mutated or any
//! request is built.
//!
//! - [`Validation`] thrown when a draft breaks an invariant (share total,
//!   missing fields).
//! - [`Permission`] thrown when the acting role lacks a capability.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`Permission`]: EngineError::Permission
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),
    #[error("Permission denied: {0}")]
    Permission(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("\"{0}\" participant not found!")]
    UnknownParticipant(String),
}
