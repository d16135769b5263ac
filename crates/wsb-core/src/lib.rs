//! Core domain + application logic for the WhatsApp sticker bot.
//!
//! This crate is framework-agnostic. The WhatsApp session client and the image
//! codec live behind ports (traits); adapter crates implement them.

pub mod command;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod lifecycle;
pub mod logging;
pub mod media;
pub mod mention;
pub mod replies;
pub mod sticker;
pub mod transport;

pub use errors::{Error, Result};
