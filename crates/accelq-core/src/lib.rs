//! accelq-core: Core types for the accelq dispatcher
//!
//! This crate provides the fundamental types used throughout accelq:
//! - Device records, selection policies, and work item descriptions
//! - Per-device memory budget accounting
//! - Device discovery probes
//! - Configuration types
//! - Error handling

pub mod budget;
pub mod config;
pub mod device;
pub mod error;
pub mod probe;

pub use budget::*;
pub use config::*;
pub use device::*;
pub use error::*;
pub use probe::*;
