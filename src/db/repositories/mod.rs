pub mod pending_sessions;
