//! ConfigureDeviceUseCase: push new address settings to one camera.
//!
//! A configuration transaction:
//!
//! 1. Looks the camera up in the registry.
//! 2. Builds a `ConfigPush` from the record, the requested settings and the
//!    sofia digest of the password.
//! 3. Broadcasts it once from a socket bound to the discovery port.
//! 4. Opens up to `max_attempts` receive windows of `reply_timeout` each and
//!    accepts the first `ConfigReply` with a body.
//!
//! A camera that never answers produces [`ConfigOutcome::NoReply`], which
//! reports the stock fallback code 203 but stays distinguishable from a
//! camera that really answered 203.

use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use camhunt_core::protocol::messages::DISCOVERY_PORT;
use camhunt_core::{
    decode_frame, decode_json_payload, encode_json_frame, AddressError, ConfigReply, MessageType,
    NetworkSettings, ProtocolError, ResultCode,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::manage_devices::DeviceRegistry;
use super::{deadline_after, recv_before, ChannelProvider, FrameChannel, RECV_BUFFER_SIZE};

/// Error type for configuration transactions.
#[derive(Debug, Error)]
pub enum ConfigureError {
    /// The MAC is not in the registry.
    #[error("unknown device {0}")]
    UnknownDevice(String),

    /// An address argument is not a dotted-quad IPv4 address.
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),

    /// The UDP socket could not be bound.
    #[error("failed to bind configuration socket on {addr}: {source}")]
    Bind {
        addr: SocketAddrV4,
        #[source]
        source: io::Error,
    },

    /// The configuration push could not be sent.
    #[error("failed to send configuration to {addr}: {source}")]
    Send {
        addr: SocketAddrV4,
        #[source]
        source: io::Error,
    },

    /// The push could not be encoded.
    #[error("failed to encode configuration: {0}")]
    Encode(#[from] ProtocolError),
}

/// Result of a configuration transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOutcome {
    /// The device answered with this code.
    Reply(ResultCode),
    /// Every receive window expired without a matching reply.
    NoReply,
}

impl ConfigOutcome {
    /// Code reported when no reply arrives.
    pub const FALLBACK: ResultCode = ResultCode::INCORRECT_PASSWORD;

    /// The code to present: the device's code, or [`Self::FALLBACK`].
    pub fn code(self) -> ResultCode {
        match self {
            ConfigOutcome::Reply(code) => code,
            ConfigOutcome::NoReply => Self::FALLBACK,
        }
    }

    pub fn is_reply(self) -> bool {
        matches!(self, ConfigOutcome::Reply(_))
    }
}

impl fmt::Display for ConfigOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.code(), f)
    }
}

/// Tunables for a configuration transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureOptions {
    pub port: u16,
    pub broadcast: Ipv4Addr,
    /// Length of one receive window.
    pub reply_timeout: Duration,
    /// Number of receive windows before giving up.
    pub max_attempts: u32,
    /// Account name sent with the push.
    pub username: String,
}

impl Default for ConfigureOptions {
    fn default() -> Self {
        Self {
            port: DISCOVERY_PORT,
            broadcast: Ipv4Addr::BROADCAST,
            reply_timeout: Duration::from_secs(1),
            max_attempts: 4,
            username: "admin".to_string(),
        }
    }
}

/// Returns the reply code if `datagram` is a `ConfigReply` with a body.
fn match_reply(datagram: &[u8]) -> Option<ResultCode> {
    let frame = match decode_frame(datagram) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("skipping datagram: {e}");
            return None;
        }
    };
    if frame.header.kind() != Some(MessageType::ConfigReply) || !frame.has_payload() {
        debug!(message_type = frame.header.message_type, "skipping non-reply datagram");
        return None;
    }
    match decode_json_payload::<ConfigReply>(&frame.payload) {
        Ok(reply) => Some(reply.ret),
        Err(e) => {
            debug!("skipping unparseable configuration reply: {e}");
            None
        }
    }
}

/// Runs configuration transactions with a fixed set of [`ConfigureOptions`].
#[derive(Debug, Clone, Default)]
pub struct ConfigurationService {
    options: ConfigureOptions,
}

impl ConfigurationService {
    pub fn new(options: ConfigureOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConfigureOptions {
        &self.options
    }

    /// Pushes `settings` to the device `mac` and waits for its answer.
    ///
    /// When the camera answers with a success code the registry record takes
    /// the new address, mask and gateway.  A rejection or a missing reply
    /// leaves the registry untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigureError::UnknownDevice`] if `mac` is not registered,
    /// [`ConfigureError::Bind`] if no channel can be opened, or any error of
    /// [`transact`](Self::transact).  A missing reply is not an error.
    pub fn configure(
        &self,
        provider: &dyn ChannelProvider,
        registry: &mut DeviceRegistry,
        mac: &str,
        settings: &NetworkSettings,
        password: &str,
    ) -> Result<ConfigOutcome, ConfigureError> {
        let record = registry
            .get(mac)
            .ok_or_else(|| ConfigureError::UnknownDevice(mac.to_string()))?;
        let command = record.config_command(settings, &self.options.username, password);
        let frame = encode_json_frame(MessageType::ConfigPush, &command)?;

        let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.options.port);
        let mut channel = provider
            .open(self.options.port, None)
            .map_err(|source| ConfigureError::Bind { addr, source })?;

        info!(
            %mac,
            host_ip = %settings.host_ip,
            subnet_mask = %settings.subnet_mask,
            gateway = %settings.gateway,
            "sending configuration"
        );
        let outcome = self.transact(channel.as_mut(), &frame)?;

        if let ConfigOutcome::Reply(code) = outcome {
            if code.is_success() {
                registry.apply_settings(mac, settings);
                info!(%mac, code = code.0, "configuration reply: {code}");
            } else {
                warn!(%mac, code = code.0, "configuration rejected: {code}");
            }
        }
        Ok(outcome)
    }

    /// Sends `frame` once and waits for a `ConfigReply`.
    ///
    /// Datagrams that do not match do not consume an attempt, but they do not
    /// extend the current window either.  Receive errors other than timeouts
    /// end the current window.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigureError::Send`] if the frame cannot be sent.
    pub fn transact(
        &self,
        channel: &mut dyn FrameChannel,
        frame: &[u8],
    ) -> Result<ConfigOutcome, ConfigureError> {
        let dest = SocketAddrV4::new(self.options.broadcast, self.options.port);
        channel
            .send_to(frame, dest)
            .map_err(|source| ConfigureError::Send { addr: dest, source })?;

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        for attempt in 1..=self.options.max_attempts {
            let deadline = deadline_after(self.options.reply_timeout);
            loop {
                match recv_before(channel, &mut buf, deadline) {
                    Ok(Some((len, src))) => {
                        if let Some(code) = match_reply(&buf[..len]) {
                            debug!(%src, attempt, "configuration reply received");
                            return Ok(ConfigOutcome::Reply(code));
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("receive error while waiting for configuration reply: {e}");
                        break;
                    }
                }
            }
            debug!(attempt, max_attempts = self.options.max_attempts, "no configuration reply yet");
        }

        warn!(
            attempts = self.options.max_attempts,
            "no configuration reply; reporting fallback code {}",
            ConfigOutcome::FALLBACK.0
        );
        Ok(ConfigOutcome::NoReply)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
