//! accelq-dispatch: Device registry, admission control, and work dispatch
//!
//! This crate composes the scheduling pieces of accelq:
//! - Device inventory and selection policies
//! - Per-device bounded admission gates
//! - The submit-and-execute dispatcher

pub mod dispatcher;
pub mod gate;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use gate::{ConcurrencyGate, GatePermit};
pub use registry::{DeviceLease, DeviceRegistry};
