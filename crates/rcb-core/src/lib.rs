//! Core logic for the single-operator remote-control bot.
//!
//! This crate is framework-agnostic. Telegram lives behind ports (traits)
//! implemented in the adapter crate; host probing lives behind small capability
//! traits so the router never branches on platform specifics.

pub mod actions;
pub mod command;
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod poller;
pub mod presentation;
pub mod processes;
pub mod reports;
pub mod router;
pub mod security;
pub mod telemetry;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
