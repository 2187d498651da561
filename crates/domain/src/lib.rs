//! Domain layer for Referee Manager backend.
//!
//! This crate contains:
//! - Domain models (notification state machines, migration outcomes)
//! - The mail-sending abstraction and letter templates
//! - Domain error types

pub mod models;
pub mod services;
