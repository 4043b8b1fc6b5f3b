//! 基础设施层：持有稀缺资源（HTTP 连接池、记录文件），只暴露能力

pub mod atomic_file;
pub mod http_transport;
pub mod record_store;

pub use atomic_file::write_atomic;
pub use http_transport::{HttpExecutor, HttpTransport};
pub use record_store::{FileRecordStore, RecordStore};
