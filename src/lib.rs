#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

//! Discord bot that detects links to paywalled news sites and replies with
//! a removepaywalls.com bypass link dressed up as a preview card.

pub mod config;
pub mod discord;
pub mod error;
pub mod handler;
pub mod metadata;
pub mod preview;
pub mod registry;
pub mod scanner;

pub use config::Config;
