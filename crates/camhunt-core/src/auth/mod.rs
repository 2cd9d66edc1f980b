//! Credential transforms required by XM firmware.

pub mod sofia;

pub use sofia::sofia_hash;
