pub mod events;
pub mod logger;
pub mod sink;

pub use events::{AuditAction, AuditEvent};
pub use logger::AuditLogger;
pub use sink::{AuditSink, FileAuditSink, HttpAuditSink, NoopAuditSink, TracingAuditSink};
