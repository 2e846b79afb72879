//! Session records and their delivery to the study backend.

pub mod logger;
pub mod queue;
pub mod record;

pub use logger::{Ack, FlushReport, SessionLogger};
pub use queue::{LocalQueue, MemoryQueue, QueuedRecord};
pub use record::SessionRecord;
