//! Shared utilities and common types for Referee Manager backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Common validation logic
//! - String normalization for legacy-data reconciliation

pub mod normalize;
pub mod validation;
