//! SQLite storage for records the backend has not acknowledged yet.

pub mod connection;
pub mod helpers;
mod migrations;
pub mod repositories;

pub use connection::Database;
