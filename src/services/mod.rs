pub mod document_service;
pub mod notifier;
pub mod order_intake;
pub mod snapshot_parser;

pub use document_service::{DocOutcome, DocumentService};
pub use notifier::{Attachment, Notification, NotificationDispatcher, OutboxDispatcher};
pub use order_intake::{IntakeReport, OrderIntake};
pub use snapshot_parser::{ParseOutcome, RegexSnapshotParser, SnapshotBuilder};
