//! Domain types with no I/O: discovered devices and the settings pushed to
//! them.
//!
//! # Sub-modules
//!
//! - **`device`** – [`DeviceRecord`](device::DeviceRecord), the last known
//!   state of one camera, plus the builder for the configuration command
//!   sent to it.

pub mod device;

pub use device::{suggest_network, Brand, DeviceRecord, NetworkSettings};
