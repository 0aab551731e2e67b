//! SQLite-backed [`ReminderStore`](calnudge_core::store::ReminderStore) for calnudge.

mod connection;
mod rows;
mod store;

pub use connection::SqliteStore;
