//! Core of chatref: short handles for Telegram chats and history rendering.
//!
//! Framework-agnostic. The Telegram client lives behind `MessagingPort` in an
//! adapter crate.

pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod fingerprint;
pub mod logging;
pub mod messaging;
pub mod render;
pub mod resolver;
pub mod session;
pub mod store;

pub use errors::{Error, Result};
