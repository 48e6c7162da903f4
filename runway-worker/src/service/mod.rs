//! Service layer
//!
//! Services contain the worker's business logic: the run state machine and
//! variable resolution. They orchestrate repositories and the external tool
//! adapters but never talk to the queue.

mod processor;
mod variables;

pub use processor::RunProcessor;
