//! Core domain types
//!
//! These types are shared between the worker (which consumes run requests)
//! and the event handlers (which create and update configuration versions).

pub mod configuration_version;
pub mod run;
pub mod variable;
