//! Database layer for opsync

mod connection;
mod migrations;
mod store;
mod table;

pub use connection::Database;
pub use store::{Saved, SqliteStore};
