//! Blocking UDP adapter for the discovery and configuration services.
//!
//! Both services bind the discovery port on all addresses, exactly like the
//! cameras' stock tool, so replies broadcast back to port 34569 reach us.
//! The socket is built with `socket2` because three options have to be set
//! before `bind`:
//!
//! - `SO_REUSEADDR`, so a discovery and a configuration socket (or another
//!   tool) can share the port;
//! - `SO_BROADCAST`, required to send to `255.255.255.255`;
//! - `SO_BINDTODEVICE` on Linux, which pins the broadcast to one interface.
//!
//! The multicast TTL is set to 1 so nothing leaves the local segment.
//!
//! # Read timeout
//!
//! [`FrameChannel::recv_from`] receives a per-call timeout.  It is applied
//! with `set_read_timeout` before each `recv_from`; an expired timeout comes
//! back as `WouldBlock` or `TimedOut` depending on the OS.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::debug;

use super::interface;
use crate::application::{ChannelProvider, FrameChannel, NetworkInterface};

/// Shortest read timeout passed to the OS; zero would mean "block forever".
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// A broadcast-enabled UDP socket bound to the discovery port.
#[derive(Debug)]
pub struct UdpFrameSocket {
    socket: UdpSocket,
}

impl UdpFrameSocket {
    /// Binds `0.0.0.0:port`, restricted to `interface` on Linux.
    ///
    /// # Errors
    ///
    /// Returns any error from socket creation, option setting or `bind`.
    pub fn bind(port: u16, interface: Option<&str>) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_broadcast(true)?;
        socket.set_multicast_ttl_v4(1)?;

        #[cfg(any(target_os = "android", target_os = "fuchsia", target_os = "linux"))]
        if let Some(name) = interface {
            socket.bind_device(Some(name.as_bytes()))?;
            debug!(interface = name, "socket bound to device");
        }
        #[cfg(not(any(target_os = "android", target_os = "fuchsia", target_os = "linux")))]
        if let Some(name) = interface {
            debug!(interface = name, "interface binding unavailable; using all interfaces");
        }

        let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
        socket.bind(&addr.into())?;

        Ok(Self {
            socket: socket.into(),
        })
    }

    /// The address the socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl FrameChannel for UdpFrameSocket {
    fn send_to(&mut self, frame: &[u8], dest: SocketAddrV4) -> io::Result<usize> {
        self.socket.send_to(frame, dest)
    }

    fn recv_from(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<(usize, SocketAddr)> {
        self.socket.set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))?;
        self.socket.recv_from(buf)
    }
}

/// [`ChannelProvider`] backed by real sockets and the host's interfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpChannelProvider;

impl ChannelProvider for UdpChannelProvider {
    fn interfaces(&self) -> io::Result<Vec<NetworkInterface>> {
        interface::detect_interfaces()
    }

    fn open(&self, port: u16, interface: Option<&NetworkInterface>) -> io::Result<Box<dyn FrameChannel>> {
        let socket = UdpFrameSocket::bind(port, interface.map(|iface| iface.name.as_str()))?;
        Ok(Box::new(socket))
    }

    fn local_address(&self) -> io::Result<Ipv4Addr> {
        interface::routed_local_ipv4()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
