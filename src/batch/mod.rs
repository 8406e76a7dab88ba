//! Batch inference: request records, the request-file builder, the batch
//! API client, submission and the status monitor.

pub mod builder;
pub mod client;
pub mod monitor;
pub mod prompts;
pub mod request;
pub mod status;
pub mod submit;

pub use builder::{BuildSummary, RequestBuilder};
pub use client::{BatchApi, OpenAiBatchClient};
pub use monitor::{
    console_url, read_batch_id, resolve_batch_id, write_batch_id, BatchMonitor, WatchOutcome,
};
pub use request::{format_custom_id, parse_custom_id, BatchRequest};
pub use status::{Batch, BatchStatus, FileObject, RequestCounts};
pub use submit::{submit_batch, Submission};
