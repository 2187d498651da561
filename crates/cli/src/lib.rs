//! Referee Manager command-line application.
//!
//! The binary wires configuration, logging, and the database pool to the
//! notification and migration services; the commands module is a thin clap
//! layer over those services.

pub mod commands;
pub mod config;
pub mod jobs;
pub mod logging;
pub mod services;
