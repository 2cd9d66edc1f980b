//! Infrastructure layer for camhunt.
//!
//! Contains OS-facing adapters: UDP sockets and interface enumeration,
//! file-system storage for the configuration, and the textual command
//! bridge used by the terminal front end.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `camhunt_core`, but MUST NOT be imported by the `application` layer.

pub mod command_bridge;
pub mod network;
pub mod storage;
