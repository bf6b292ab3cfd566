#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

pub mod chat;
pub mod config;
pub mod error;
pub mod gateway;
pub mod providers;
pub mod sessions;
pub mod store;

pub use config::Config;
pub use error::{GateError, Result};
