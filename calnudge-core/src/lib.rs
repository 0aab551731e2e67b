//! Core of calnudge, the reminder notifier.
//!
//! - `model`: events, reminders, friends and users
//! - `recurrence` and `local_time`: date matching in the fixed display timezone
//! - `pending`, `compose`, `dispatch` and `scheduler`: the notification pipeline
//! - `store` and `messenger`: the persistence and delivery seams

pub mod compose;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod local_time;
pub mod messenger;
pub mod model;
pub mod pending;
pub mod recurrence;
pub mod scheduler;
pub mod store;

mod test_helpers;

pub use model::*;
