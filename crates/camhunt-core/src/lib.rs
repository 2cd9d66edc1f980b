//! # camhunt-core
//!
//! Shared library for CamHunt containing the XM discovery protocol codec,
//! the firmware password hasher, and the device record types.
//!
//! This crate has zero dependencies on OS APIs or network sockets.  All
//! socket work lives in the `camhunt` application crate; everything here is
//! pure and deterministic, which keeps it easy to test and benchmark.
//!
//! # Architecture overview (for beginners)
//!
//! Cheap "XM" network cameras ship with a factory address that rarely fits
//! the local network.  They answer a UDP broadcast on port 34569 with a JSON
//! description of their network settings, and they accept a broadcast
//! command that rewrites those settings.
//!
//! This crate defines:
//!
//! - **`protocol`** – How bytes travel over the network.  Every message is a
//!   fixed 20-byte little-endian header followed by a JSON body.
//!
//! - **`auth`** – The "sofia" password digest the firmware expects in place
//!   of a plaintext password.
//!
//! - **`domain`** – The [`DeviceRecord`] kept for every camera that answered
//!   a probe, and the [`NetworkSettings`] pushed to it.

pub mod auth;
pub mod domain;
pub mod protocol;

pub use auth::sofia::sofia_hash;
pub use domain::device::{suggest_network, Brand, DeviceRecord, NetworkSettings};
pub use protocol::address::{AddressError, PackedIpv4};
pub use protocol::frame::{
    decode_frame, decode_json_payload, encode_frame, encode_json_frame, encode_probe, Frame,
    FrameHeader, ProtocolError,
};
pub use protocol::messages::{ConfigCommand, ConfigReply, MessageType, NetCommon, ProbeReply};
pub use protocol::result_code::ResultCode;
