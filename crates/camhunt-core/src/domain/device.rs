//! Discovered device records.
//!
//! A [`DeviceRecord`] is created the first time a camera answers a probe and
//! is updated in place afterwards:
//!
//! - a later probe reply is merged field by field (newest wins, fields the
//!   new reply omits are kept);
//! - a successful configuration push overwrites the address, mask and
//!   gateway with the values just sent.
//!
//! The MAC address is the record's identity and cannot change.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize, Serializer};

use crate::auth::sofia::sofia_hash;
use crate::protocol::address::{AddressError, PackedIpv4};
use crate::protocol::messages::{ConfigCommand, NetCommon, ENCRYPT_TYPE_SOFIA};

/// Protocol dialect a device was discovered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Brand {
    #[serde(rename = "xm")]
    Xm,
}

impl Brand {
    pub fn as_str(self) -> &'static str {
        match self {
            Brand::Xm => "xm",
        }
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address, mask and gateway to push to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSettings {
    pub host_ip: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

impl NetworkSettings {
    /// Parses three dotted-quad strings as entered by an operator.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::InvalidIpv4`] naming the first bad value.
    pub fn parse(host_ip: &str, subnet_mask: &str, gateway: &str) -> Result<Self, AddressError> {
        Ok(Self {
            host_ip: PackedIpv4::parse_dotted(host_ip)?.to_ipv4(),
            subnet_mask: PackedIpv4::parse_dotted(subnet_mask)?.to_ipv4(),
            gateway: PackedIpv4::parse_dotted(gateway)?.to_ipv4(),
        })
    }
}

/// Proposes settings for a camera on the same /24 as `local`.
///
/// The camera gets `local + 10`, the mask is `255.255.255.0` and the
/// gateway is the `.1` address of the subnet.
pub fn suggest_network(local: Ipv4Addr) -> NetworkSettings {
    let local = u32::from(local);
    NetworkSettings {
        host_ip: Ipv4Addr::from(local.wrapping_add(10)),
        subnet_mask: Ipv4Addr::new(255, 255, 255, 0),
        gateway: Ipv4Addr::from((local & 0xFFFF_FF00) + 1),
    }
}

/// Last known state of one discovered camera.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    mac: String,
    brand: Brand,
    net: NetCommon,
}

impl DeviceRecord {
    /// Creates an empty record for `mac`.
    pub fn new(mac: impl Into<String>, brand: Brand) -> Self {
        let mac = mac.into();
        let net = NetCommon {
            mac: Some(mac.clone()),
            ..Default::default()
        };
        Self { mac, brand, net }
    }

    pub fn mac(&self) -> &str {
        &self.mac
    }

    pub fn brand(&self) -> Brand {
        self.brand
    }

    /// All reported fields, including passthrough keys.
    pub fn net(&self) -> &NetCommon {
        &self.net
    }

    pub fn host_name(&self) -> Option<&str> {
        self.net.host_name.as_deref()
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.net.serial_number.as_deref()
    }

    pub fn host_ip(&self) -> Option<Ipv4Addr> {
        self.net.host_ip.map(PackedIpv4::to_ipv4)
    }

    pub fn subnet_mask(&self) -> Option<Ipv4Addr> {
        self.net.subnet_mask.map(PackedIpv4::to_ipv4)
    }

    pub fn gateway(&self) -> Option<Ipv4Addr> {
        self.net.gateway.map(PackedIpv4::to_ipv4)
    }

    pub fn tcp_port(&self) -> Option<u16> {
        self.net.tcp_port
    }

    /// Merges a newer report into this record.  See [`NetCommon::merge`].
    pub fn merge(&mut self, update: NetCommon) {
        self.net.merge(update);
    }

    /// Records settings the device has acknowledged.
    pub fn apply_settings(&mut self, settings: &NetworkSettings) {
        self.net.host_ip = Some(settings.host_ip.into());
        self.net.subnet_mask = Some(settings.subnet_mask.into());
        self.net.gateway = Some(settings.gateway.into());
    }

    /// Builds the configuration push for this device.
    ///
    /// Identity, port and streaming fields are echoed back from the record;
    /// `password` is replaced by its sofia digest.
    pub fn config_command(
        &self,
        settings: &NetworkSettings,
        username: &str,
        password: &str,
    ) -> ConfigCommand {
        let net = &self.net;
        ConfigCommand {
            dvr_mac: self.mac.clone(),
            encrypt_type: ENCRYPT_TYPE_SOFIA,
            gateway: settings.gateway.into(),
            host_ip: settings.host_ip.into(),
            host_name: net.host_name.clone(),
            http_port: net.http_port,
            mac: self.mac.clone(),
            max_bps: net.max_bps.clone(),
            mon_mode: net.mon_mode.clone(),
            password: sofia_hash(password),
            ssl_port: net.ssl_port,
            subnet_mask: settings.subnet_mask.into(),
            tcp_max_conn: net.tcp_max_conn.clone(),
            tcp_port: net.tcp_port,
            transfer_plan: net.transfer_plan.clone(),
            udp_port: net.udp_port,
            use_hs_download: net.use_hs_download.clone(),
            username: username.to_string(),
        }
    }
}

impl Serialize for DeviceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            #[serde(flatten)]
            net: &'a NetCommon,
            #[serde(rename = "Brand")]
            brand: Brand,
        }

        Wire {
            net: &self.net,
            brand: self.brand,
        }
        .serialize(serializer)
    }
}
