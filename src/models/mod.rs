pub mod loaders;
pub mod order;
pub mod outcome;
pub mod record;
pub mod snapshot;

pub use loaders::{load_order_lines, write_order_file};
pub use order::{OrderDescriptor, OrderKey};
pub use outcome::{OutcomeClass, PollOutcome};
pub use record::{PersistedRecord, SubjectKey};
pub use snapshot::{LifecycleState, OrderSnapshot};
