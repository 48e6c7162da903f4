//! Data Transfer Objects for the control plane and blob store gateways
//!
//! The control plane speaks JSON:API for resources (variables,
//! configuration versions) and a small JSON protocol for the run queue.

pub mod configuration_version;
pub mod queue;
pub mod variable;
