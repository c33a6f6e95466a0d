//! Task domain module.
//!
//! Everything needed to track a long-running remote job between submission
//! and retrieval.
//!
//! # Module Structure
//!
//! - `model`: `JobHandle`, `TaskRecord`, `JobStatus` and response parsing
//! - `registry`: `TaskRegistry` trait for record bookkeeping
//! - `policy`: `PollPolicy` bounds for the polling loop

mod model;
pub mod policy;
pub mod registry;

pub use model::{
    InitiateResponse, JobHandle, JobStatus, StatusReport, TaskRecord, parse_retry_hint,
};
pub use policy::PollPolicy;
pub use registry::TaskRegistry;
