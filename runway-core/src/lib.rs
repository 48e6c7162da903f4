//! Runway Core
//!
//! Core types shared by every Runway component.
//!
//! This crate contains:
//! - Domain types: run requests, workspace variables, configuration versions
//! - DTOs: JSON:API and queue-gateway payloads exchanged with the control plane

pub mod domain;
pub mod dto;
