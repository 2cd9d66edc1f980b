//! Host interface enumeration.
//!
//! On Unix the interface list comes from `getifaddrs(3)` through `nix`.  One
//! entry is produced per interface name, in the order the OS reports them,
//! carrying the first IPv4 address seen for that name.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

use crate::application::NetworkInterface;

/// Lists the host's interfaces.
///
/// # Errors
///
/// Returns the OS error from `getifaddrs`.
#[cfg(unix)]
pub fn detect_interfaces() -> io::Result<Vec<NetworkInterface>> {
    use std::net::SocketAddrV4;

    let mut found: Vec<NetworkInterface> = Vec::new();
    for ifaddr in nix::ifaddrs::getifaddrs().map_err(io::Error::from)? {
        let ipv4 = ifaddr
            .address
            .as_ref()
            .and_then(|addr| addr.as_sockaddr_in())
            .map(|sin| *SocketAddrV4::from(*sin).ip());

        match found.iter_mut().find(|iface| iface.name == ifaddr.interface_name) {
            Some(existing) => {
                if existing.ipv4.is_none() {
                    existing.ipv4 = ipv4;
                }
            }
            None => found.push(NetworkInterface::new(ifaddr.interface_name, ipv4)),
        }
    }
    Ok(found)
}

/// Interface enumeration is not implemented on this platform.
///
/// # Errors
///
/// Always returns [`io::ErrorKind::Unsupported`]; discovery then listens on
/// all interfaces.
#[cfg(not(unix))]
pub fn detect_interfaces() -> io::Result<Vec<NetworkInterface>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "interface enumeration is only implemented for Unix",
    ))
}

/// Returns the local IPv4 address the OS would use for outbound traffic.
///
/// Connecting a UDP socket sends nothing; it only makes the kernel pick a
/// route and a source address, which `local_addr` then reports.
///
/// # Errors
///
/// Returns the OS error if no route exists or the source address is IPv6.
pub fn routed_local_ipv4() -> io::Result<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect((Ipv4Addr::new(10, 255, 255, 255), 1))?;
    match socket.local_addr()? {
        SocketAddr::V4(addr) => Ok(*addr.ip()),
        SocketAddr::V6(addr) => Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("route uses IPv6 source address {addr}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_detect_interfaces_lists_unique_names() {
        let interfaces = detect_interfaces().expect("getifaddrs must succeed");

        let mut names: Vec<&str> = interfaces.iter().map(|i| i.name.as_str()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total, "interface names must be unique");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_loopback_reports_localhost_address() {
        let interfaces = detect_interfaces().expect("getifaddrs must succeed");

        let lo = interfaces.iter().find(|i| i.name == "lo");
        if let Some(lo) = lo {
            assert_eq!(lo.ipv4, Some(Ipv4Addr::LOCALHOST));
        }
    }
}
