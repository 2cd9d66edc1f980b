//! Network infrastructure for camhunt.
//!
//! # Sub-modules
//!
//! - **`udp`** – The real [`FrameChannel`](crate::application::FrameChannel):
//!   a broadcast-enabled UDP socket built with `socket2` so address reuse,
//!   multicast TTL and interface binding can be set before `bind`.
//!
//! - **`interface`** – Lists the host's interfaces and their IPv4 addresses,
//!   and finds the address used for outbound traffic.
//!
//! - **`mock`** – A scripted channel and provider that replay camera traffic
//!   without touching the network.  Used by unit and integration tests.

pub mod interface;
pub mod mock;
pub mod udp;

pub use udp::{UdpChannelProvider, UdpFrameSocket};
