//! Repository layer
//!
//! Repositories are the worker's capability interfaces to the outside
//! world: the run-request queue, the bundle store, the variable store and
//! the run status write-back. They carry no business logic.
//!
//! All repositories are trait-based so the pipeline can run against fakes.

mod bundles;
mod queue;
mod status;
mod variables;

// Re-export traits
pub use bundles::BundleStore;
#[cfg(test)]
pub use bundles::BundleStream;
pub use queue::RunQueue;
pub use status::RunStatusRepository;
pub use variables::VariableRepository;

// Re-export implementations
pub use bundles::HttpBundleStore;
pub use queue::HttpRunQueue;
pub use status::HttpRunStatusRepository;
pub use variables::HttpVariableRepository;
