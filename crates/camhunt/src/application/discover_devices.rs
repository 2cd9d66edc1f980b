//! DiscoverDevicesUseCase: one broadcast probe round.
//!
//! A round works like this:
//!
//! 1. Pick the first detected interface whose name is on the allow-list
//!    (an empty allow-list means "all interfaces").
//! 2. Open a broadcast channel on the discovery port, restricted to that
//!    interface where the platform allows it.
//! 3. Send one probe frame to the broadcast address.
//! 4. Receive datagrams until a receive window passes with no traffic or the
//!    round reaches its maximum duration.  Every `ProbeReply` with a body is
//!    merged into the registry; everything else is skipped.
//!
//! # Skipped datagrams (for beginners)
//!
//! The socket listens on a broadcast port, so it also hears the probe it just
//! sent and any other traffic on port 34569.  A datagram that is too short,
//! carries another message type, has no body, or holds unparseable JSON is
//! logged at `debug` and counted in [`DiscoveryReport::skipped`]; it never
//! ends the round.

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::{Duration, Instant};

use camhunt_core::protocol::messages::DISCOVERY_PORT;
use camhunt_core::{decode_frame, decode_json_payload, encode_probe, Brand, MessageType, ProbeReply, ProtocolError};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::manage_devices::DeviceRegistry;
use super::{deadline_after, recv_before, ChannelProvider, FrameChannel, NetworkInterface, RECV_BUFFER_SIZE};

/// Error type for discovery rounds.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// None of the detected interfaces is on the allow-list.
    #[error("no detected interface is on the allow-list {allowed:?} (detected: {detected:?})")]
    NoInterface {
        allowed: Vec<String>,
        detected: Vec<String>,
    },

    /// The host's interfaces could not be listed.
    #[error("failed to list network interfaces: {0}")]
    Interfaces(#[source] io::Error),

    /// The UDP socket could not be bound.
    #[error("failed to bind discovery socket on {addr}: {source}")]
    Bind {
        addr: SocketAddrV4,
        #[source]
        source: io::Error,
    },

    /// The probe could not be sent.
    #[error("failed to send probe to {addr}: {source}")]
    Send {
        addr: SocketAddrV4,
        #[source]
        source: io::Error,
    },

}

/// Why a received datagram was not merged into the registry.
#[derive(Debug, Error, PartialEq)]
pub enum SkipReason {
    #[error(transparent)]
    Malformed(#[from] ProtocolError),

    #[error("message type {0} is not a probe reply")]
    UnexpectedType(u16),

    #[error("probe reply has no body")]
    EmptyPayload,

    #[error("probe reply carries no MAC address")]
    MissingMac,
}

/// Tunables for a discovery round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    pub port: u16,
    pub broadcast: Ipv4Addr,
    /// Interface allow-list; empty binds all interfaces.
    pub interfaces: Vec<String>,
    /// How long to wait for the next datagram before ending the round.
    pub receive_timeout: Duration,
    /// Upper bound on the whole round.
    pub max_duration: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            port: DISCOVERY_PORT,
            broadcast: Ipv4Addr::BROADCAST,
            interfaces: vec!["eth0".to_string(), "eno1".to_string()],
            receive_timeout: Duration::from_secs(3),
            max_duration: Duration::from_secs(30),
        }
    }
}

/// Summary of one discovery round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Interface the round was restricted to, if any.
    pub interface: Option<String>,
    /// Probe replies merged into the registry.
    pub replies: usize,
    /// Replies from MACs not seen before.
    pub new_devices: usize,
    /// Datagrams that were skipped.
    pub skipped: usize,
}

/// Picks the first detected interface whose name is on `allow_list`.
///
/// An empty allow-list returns `Ok(None)`, meaning "bind all interfaces".
///
/// # Errors
///
/// Returns [`DiscoveryError::NoInterface`] if the allow-list is non-empty and
/// no detected interface matches it.
pub fn select_interface<'a>(
    allow_list: &[String],
    detected: &'a [NetworkInterface],
) -> Result<Option<&'a NetworkInterface>, DiscoveryError> {
    if allow_list.is_empty() {
        return Ok(None);
    }
    detected
        .iter()
        .find(|iface| allow_list.iter().any(|name| *name == iface.name))
        .map(Some)
        .ok_or_else(|| DiscoveryError::NoInterface {
            allowed: allow_list.to_vec(),
            detected: detected.iter().map(|iface| iface.name.clone()).collect(),
        })
}

/// Decodes one datagram and merges it into `registry` if it is a probe reply.
///
/// Returns the MAC of the device and whether it was new.
///
/// # Errors
///
/// Returns a [`SkipReason`] for every datagram that is not a usable probe
/// reply.  Callers log it and keep listening.
pub fn ingest_datagram(
    datagram: &[u8],
    registry: &mut DeviceRegistry,
) -> Result<(String, bool), SkipReason> {
    let frame = decode_frame(datagram)?;
    if frame.header.kind() != Some(MessageType::ProbeReply) {
        return Err(SkipReason::UnexpectedType(frame.header.message_type));
    }
    if !frame.has_payload() {
        return Err(SkipReason::EmptyPayload);
    }

    let reply: ProbeReply = decode_json_payload(&frame.payload)?;
    let mac = reply.net_common.mac.clone().ok_or(SkipReason::MissingMac)?;
    let created = registry.upsert(&mac, Brand::Xm, reply.net_common);
    Ok((mac, created))
}

/// Runs discovery rounds with a fixed set of [`DiscoveryOptions`].
#[derive(Debug, Clone, Default)]
pub struct DiscoveryService {
    options: DiscoveryOptions,
}

impl DiscoveryService {
    pub fn new(options: DiscoveryOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Selects an interface, opens a channel through `provider` and runs one
    /// round.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::NoInterface`] or [`DiscoveryError::Bind`]
    /// before anything is sent, or any error of [`run_round`](Self::run_round).
    pub fn discover(
        &self,
        provider: &dyn ChannelProvider,
        registry: &mut DeviceRegistry,
    ) -> Result<DiscoveryReport, DiscoveryError> {
        let detected = match provider.interfaces() {
            Ok(list) => Some(list),
            Err(e) if e.kind() == io::ErrorKind::Unsupported => None,
            Err(e) => return Err(DiscoveryError::Interfaces(e)),
        };

        let interface = match &detected {
            Some(list) => {
                let names: Vec<&str> = list.iter().map(|i| i.name.as_str()).collect();
                debug!(detected = ?names, allowed = ?self.options.interfaces, "selecting interface");
                select_interface(&self.options.interfaces, list)?
            }
            None => {
                info!("interface enumeration is not supported on this platform");
                None
            }
        };
        match interface {
            Some(iface) => info!(interface = %iface.name, ipv4 = ?iface.ipv4, "discovering on interface"),
            None => info!("discovering on all interfaces"),
        }

        let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.options.port);
        let mut channel = provider
            .open(self.options.port, interface)
            .map_err(|source| DiscoveryError::Bind { addr, source })?;
        info!("discovery socket bound on UDP {addr}");

        let mut report = self.run_round(channel.as_mut(), registry)?;
        report.interface = interface.map(|iface| iface.name.clone());
        Ok(report)
    }

    /// Sends one probe on `channel` and collects replies into `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Send`] if the probe cannot be sent.  A
    /// receive error other than a timeout is logged and ends the round with
    /// the replies collected so far.
    pub fn run_round(
        &self,
        channel: &mut dyn FrameChannel,
        registry: &mut DeviceRegistry,
    ) -> Result<DiscoveryReport, DiscoveryError> {
        let dest = SocketAddrV4::new(self.options.broadcast, self.options.port);
        channel
            .send_to(&encode_probe(), dest)
            .map_err(|source| DiscoveryError::Send { addr: dest, source })?;
        debug!("probe sent to {dest}");

        let stop_at = deadline_after(self.options.max_duration);
        let mut report = DiscoveryReport::default();
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            let deadline = deadline_after(self.options.receive_timeout).min(stop_at);
            let (len, src) = match recv_before(channel, &mut buf, deadline) {
                Ok(Some(received)) => received,
                Ok(None) => break,
                Err(e) => {
                    warn!("receive error ended the discovery round early: {e}");
                    break;
                }
            };

            match ingest_datagram(&buf[..len], registry) {
                Ok((mac, created)) => {
                    debug!(%mac, %src, created, "probe reply");
                    report.replies += 1;
                    if created {
                        report.new_devices += 1;
                    }
                }
                Err(reason) => {
                    debug!("skipping datagram from {src}: {reason}");
                    report.skipped += 1;
                }
            }
        }

        if Instant::now() >= stop_at {
            info!("discovery round hit its {:?} limit", self.options.max_duration);
        }
        info!(
            replies = report.replies,
            new_devices = report.new_devices,
            skipped = report.skipped,
            "discovery round finished"
        );
        Ok(report)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use camhunt_core::{encode_frame, FrameHeader};

    fn probe_reply(mac: &str, host_name: &str) -> Vec<u8> {
        let body = format!(r#"{{"NetWork.NetCommon":{{"MAC":"{mac}","HostName":"{host_name}"}},"Ret":100}}"#);
        encode_frame(MessageType::ProbeReply, body.as_bytes()).unwrap()
    }

    fn iface(name: &str) -> NetworkInterface {
        NetworkInterface::new(name, None)
    }

    #[test]
    fn test_select_interface_picks_first_detected_match() {
        // Arrange
        let allow = vec!["eno1".to_string(), "eth0".to_string()];
        let detected = vec![iface("lo"), iface("eth0"), iface("eno1")];

        // Act
        let chosen = select_interface(&allow, &detected).unwrap();

        // Assert: detection order wins over allow-list order
        assert_eq!(chosen.map(|i| i.name.as_str()), Some("eth0"));
    }

    #[test]
    fn test_select_interface_fails_without_match() {
        let allow = vec!["eth0".to_string()];
        let detected = vec![iface("lo"), iface("wlan0")];

        let err = select_interface(&allow, &detected).unwrap_err();

        match err {
            DiscoveryError::NoInterface { allowed, detected } => {
                assert_eq!(allowed, ["eth0"]);
                assert_eq!(detected, ["lo", "wlan0"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_select_interface_empty_allow_list_means_all() {
        let detected = vec![iface("eth0")];
        assert_eq!(select_interface(&[], &detected).unwrap(), None);
    }

    #[test]
    fn test_ingest_accepts_probe_reply() {
        let mut registry = DeviceRegistry::new();

        let (mac, created) = ingest_datagram(&probe_reply("AA:BB:CC:DD:EE:FF", "Cam1"), &mut registry).unwrap();

        assert_eq!(mac, "AA:BB:CC:DD:EE:FF");
        assert!(created);
        assert_eq!(registry.get(&mac).unwrap().host_name(), Some("Cam1"));
    }

    #[test]
    fn test_ingest_skips_other_message_types() {
        let mut registry = DeviceRegistry::new();

        let result = ingest_datagram(&encode_probe(), &mut registry);

        assert_eq!(result, Err(SkipReason::UnexpectedType(1530)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ingest_skips_zero_length_reply() {
        let mut registry = DeviceRegistry::new();
        let mut bytes = Vec::new();
        FrameHeader::for_message(MessageType::ProbeReply, 0).write_to(&mut bytes);

        assert_eq!(ingest_datagram(&bytes, &mut registry), Err(SkipReason::EmptyPayload));
    }

    #[test]
    fn test_ingest_skips_invalid_json() {
        let mut registry = DeviceRegistry::new();
        let bytes = encode_frame(MessageType::ProbeReply, b"{\"NetWork.NetCommon\":").unwrap();

        let result = ingest_datagram(&bytes, &mut registry);

        assert!(matches!(result, Err(SkipReason::Malformed(ProtocolError::PayloadParse(_)))));
    }

    #[test]
    fn test_ingest_skips_short_datagram() {
        let mut registry = DeviceRegistry::new();
        let result = ingest_datagram(&[0xFF, 0x00, 0x00], &mut registry);
        assert!(matches!(result, Err(SkipReason::Malformed(ProtocolError::MalformedFrame { .. }))));
    }

    #[test]
    fn test_ingest_skips_reply_without_mac() {
        let mut registry = DeviceRegistry::new();
        let bytes = encode_frame(MessageType::ProbeReply, br#"{"NetWork.NetCommon":{"HostName":"x"}}"#).unwrap();

        assert_eq!(ingest_datagram(&bytes, &mut registry), Err(SkipReason::MissingMac));
    }

    #[test]
    fn test_default_options_match_stock_tool() {
        let options = DiscoveryOptions::default();
        assert_eq!(options.port, 34569);
        assert_eq!(options.broadcast, Ipv4Addr::new(255, 255, 255, 255));
        assert_eq!(options.interfaces, ["eth0", "eno1"]);
        assert_eq!(options.receive_timeout, Duration::from_secs(3));
    }
}
