//! Scheduler layer for the worker
//!
//! Polls the run-request queue, hands each message to the run processor
//! and applies the acknowledgment policy.

pub mod poller;

pub use poller::RunPoller;
