pub mod order_ctx;
pub mod order_flow;
pub mod report;
pub mod state_engine;

pub use order_ctx::OrderCtx;
pub use order_flow::{NotifyOutcome, OrderFlow};
pub use state_engine::{Decision, DocumentNotice};
