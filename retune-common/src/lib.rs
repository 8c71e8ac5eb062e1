//! # retune Common Library
//!
//! Shared code for the retune services including:
//! - Error types
//! - Configuration loading and root folder resolution
//! - Job lifecycle events (EventBus)
//! - Chromatic key table and semitone arithmetic

pub mod config;
pub mod error;
pub mod events;
pub mod keys;

pub use error::{Error, Result};
pub use keys::{semitone_distance, KeyDistance};
