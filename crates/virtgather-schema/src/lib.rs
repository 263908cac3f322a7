//! virtgather-schema: normalized inventory records and target definitions
//!
//! Shared serde types used by the dispatch engine and every platform module.

pub mod record;
pub mod target;

pub use record::{HostMap, HostRecord, UNKNOWN};
pub use target::TargetRecord;
