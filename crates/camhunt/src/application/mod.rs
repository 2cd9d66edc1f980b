//! Application layer use cases for camhunt.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure protocol rules in `camhunt_core`) and the infrastructure (sockets,
//! files, the terminal).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "find every
//!   camera on this segment").
//! - **Depend on abstractions** (the [`FrameChannel`] and [`ChannelProvider`]
//!   traits below) rather than on real UDP sockets, so tests can replay
//!   scripted camera traffic.
//! - **Contain no direct OS calls**.
//!
//! # Sub-modules
//!
//! - **`manage_devices`**   – The in-memory registry of discovered cameras,
//!   keyed by MAC address.
//!
//! - **`discover_devices`** – Broadcasts a probe and merges every valid reply
//!   into the registry.
//!
//! - **`configure_device`** – Pushes new address settings to one camera and
//!   waits for its acknowledgement.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};

pub mod configure_device;
pub mod discover_devices;
pub mod manage_devices;

/// Size of the receive buffer used for every datagram.
pub const RECV_BUFFER_SIZE: usize = 4096;

/// A network interface present on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    /// OS interface name, e.g. `eth0`.
    pub name: String,
    /// First IPv4 address assigned to the interface, if any.
    pub ipv4: Option<Ipv4Addr>,
}

impl NetworkInterface {
    pub fn new(name: impl Into<String>, ipv4: Option<Ipv4Addr>) -> Self {
        Self {
            name: name.into(),
            ipv4,
        }
    }
}

/// A datagram endpoint the services send frames through.
///
/// Implemented by the UDP socket adapter in `infrastructure::network::udp`
/// and by the scripted channel used in tests.
pub trait FrameChannel: Send {
    /// Sends one datagram to `dest`.
    fn send_to(&mut self, frame: &[u8], dest: SocketAddrV4) -> io::Result<usize>;

    /// Waits at most `timeout` for one datagram.
    ///
    /// Expiry is reported as an error for which [`is_timeout_error`] returns
    /// `true`.
    fn recv_from(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<(usize, SocketAddr)>;
}

/// Opens [`FrameChannel`]s and answers questions about the local host.
pub trait ChannelProvider: Send {
    /// Lists the interfaces present on this host.
    ///
    /// Platforms without interface enumeration return an error of kind
    /// [`io::ErrorKind::Unsupported`].
    fn interfaces(&self) -> io::Result<Vec<NetworkInterface>>;

    /// Opens a broadcast-capable channel bound to `port` on all addresses,
    /// restricted to `interface` where the platform supports it.
    fn open(&self, port: u16, interface: Option<&NetworkInterface>) -> io::Result<Box<dyn FrameChannel>>;

    /// The address this host uses for outbound traffic.
    fn local_address(&self) -> io::Result<Ipv4Addr>;
}

/// Returns `true` for OS timeout / would-block errors that end a receive
/// window.
pub fn is_timeout_error(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Deadline used when `now + timeout` does not fit in an [`Instant`].
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `Instant::now() + timeout`, saturating to a far deadline instead of
/// panicking on overflow.
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Receives one datagram unless `deadline` passes first.
///
/// Returns `Ok(None)` when the deadline is reached or the channel times out.
pub(crate) fn recv_before(
    channel: &mut dyn FrameChannel,
    buf: &mut [u8],
    deadline: Instant,
) -> io::Result<Option<(usize, SocketAddr)>> {
    let now = Instant::now();
    if now >= deadline {
        return Ok(None);
    }
    match channel.recv_from(buf, deadline - now) {
        Ok(pair) => Ok(Some(pair)),
        Err(e) if is_timeout_error(&e) => Ok(None),
        Err(e) => Err(e),
    }
}
