//! Message type codes and JSON payload types of the XM discovery protocol.
//!
//! Payloads are loosely typed on the wire: different firmware builds add,
//! drop, or retype fields.  Every struct here therefore models the fields
//! the tool actually reads as named optionals and keeps everything else in a
//! flattened passthrough map, so a record survives a decode/encode cycle
//! without losing keys it does not understand.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::protocol::address::PackedIpv4;
use crate::protocol::result_code::ResultCode;

// ── Protocol constants ────────────────────────────────────────────────────────

/// UDP port used for both probes and configuration pushes.
pub const DISCOVERY_PORT: u16 = 34569;

/// Value of the `EncryptType` field in a configuration push.
pub const ENCRYPT_TYPE_SOFIA: u8 = 1;

/// Key of the object carrying the network settings inside a probe reply.
pub const NET_COMMON_KEY: &str = "NetWork.NetCommon";

// ── Message type codes ────────────────────────────────────────────────────────

/// Message type codes carried in the header's correlating field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum MessageType {
    /// Broadcast request that makes devices announce themselves.
    Probe = 1530,
    /// A device's answer to a probe.
    ProbeReply = 1531,
    /// Broadcast command carrying new network settings.
    ConfigPush = 1532,
    /// A device's acknowledgement of a configuration push.
    ConfigReply = 1533,
}

impl MessageType {
    /// Value of the legacy command-code word sent alongside this message type.
    pub fn command_code(self) -> u16 {
        match self {
            MessageType::ConfigPush => 254,
            _ => 0,
        }
    }
}

impl TryFrom<u16> for MessageType {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1530 => Ok(MessageType::Probe),
            1531 => Ok(MessageType::ProbeReply),
            1532 => Ok(MessageType::ConfigPush),
            1533 => Ok(MessageType::ConfigReply),
            _ => Err(()),
        }
    }
}

// ── Probe reply ───────────────────────────────────────────────────────────────

/// The `NetWork.NetCommon` object a camera reports about itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetCommon {
    #[serde(rename = "MAC", skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(rename = "HostName", skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(rename = "HostIP", skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<PackedIpv4>,
    #[serde(rename = "Submask", skip_serializing_if = "Option::is_none")]
    pub subnet_mask: Option<PackedIpv4>,
    #[serde(rename = "GateWay", skip_serializing_if = "Option::is_none")]
    pub gateway: Option<PackedIpv4>,
    #[serde(rename = "TCPPort", skip_serializing_if = "Option::is_none")]
    pub tcp_port: Option<u16>,
    #[serde(rename = "HttpPort", skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u16>,
    #[serde(rename = "SSLPort", skip_serializing_if = "Option::is_none")]
    pub ssl_port: Option<u16>,
    #[serde(rename = "UDPPort", skip_serializing_if = "Option::is_none")]
    pub udp_port: Option<u16>,
    #[serde(rename = "SN", skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(rename = "MaxBps", skip_serializing_if = "Option::is_none")]
    pub max_bps: Option<Value>,
    #[serde(rename = "MonMode", skip_serializing_if = "Option::is_none")]
    pub mon_mode: Option<Value>,
    #[serde(rename = "TCPMaxConn", skip_serializing_if = "Option::is_none")]
    pub tcp_max_conn: Option<Value>,
    #[serde(rename = "TransferPlan", skip_serializing_if = "Option::is_none")]
    pub transfer_plan: Option<Value>,
    #[serde(rename = "UseHSDownLoad", skip_serializing_if = "Option::is_none")]
    pub use_hs_download: Option<Value>,
    /// Keys this tool does not interpret, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NetCommon {
    /// Overwrites every field present in `update`, leaving absent ones alone.
    ///
    /// `mac` is never overwritten; a record's identity is fixed at creation.
    pub fn merge(&mut self, update: NetCommon) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.host_name, update.host_name);
        take(&mut self.host_ip, update.host_ip);
        take(&mut self.subnet_mask, update.subnet_mask);
        take(&mut self.gateway, update.gateway);
        take(&mut self.tcp_port, update.tcp_port);
        take(&mut self.http_port, update.http_port);
        take(&mut self.ssl_port, update.ssl_port);
        take(&mut self.udp_port, update.udp_port);
        take(&mut self.serial_number, update.serial_number);
        take(&mut self.max_bps, update.max_bps);
        take(&mut self.mon_mode, update.mon_mode);
        take(&mut self.tcp_max_conn, update.tcp_max_conn);
        take(&mut self.transfer_plan, update.transfer_plan);
        take(&mut self.use_hs_download, update.use_hs_download);
        self.extra.extend(update.extra);
    }
}

/// Body of a `ProbeReply` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReply {
    #[serde(rename = "NetWork.NetCommon")]
    pub net_common: NetCommon,
    #[serde(rename = "Ret", default, skip_serializing_if = "Option::is_none")]
    pub ret: Option<ResultCode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Configuration push ────────────────────────────────────────────────────────

/// Body of a `ConfigPush` frame.
///
/// Fields are declared in byte-wise sorted key order so the serialized
/// object matches what the stock configuration tool emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigCommand {
    #[serde(rename = "DvrMac")]
    pub dvr_mac: String,
    #[serde(rename = "EncryptType")]
    pub encrypt_type: u8,
    #[serde(rename = "GateWay")]
    pub gateway: PackedIpv4,
    #[serde(rename = "HostIP")]
    pub host_ip: PackedIpv4,
    #[serde(rename = "HostName", skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(rename = "HttpPort", skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u16>,
    #[serde(rename = "MAC")]
    pub mac: String,
    #[serde(rename = "MaxBps", skip_serializing_if = "Option::is_none")]
    pub max_bps: Option<Value>,
    #[serde(rename = "MonMode", skip_serializing_if = "Option::is_none")]
    pub mon_mode: Option<Value>,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "SSLPort", skip_serializing_if = "Option::is_none")]
    pub ssl_port: Option<u16>,
    #[serde(rename = "Submask")]
    pub subnet_mask: PackedIpv4,
    #[serde(rename = "TCPMaxConn", skip_serializing_if = "Option::is_none")]
    pub tcp_max_conn: Option<Value>,
    #[serde(rename = "TCPPort", skip_serializing_if = "Option::is_none")]
    pub tcp_port: Option<u16>,
    #[serde(rename = "TransferPlan", skip_serializing_if = "Option::is_none")]
    pub transfer_plan: Option<Value>,
    #[serde(rename = "UDPPort", skip_serializing_if = "Option::is_none")]
    pub udp_port: Option<u16>,
    #[serde(rename = "UseHSDownLoad", skip_serializing_if = "Option::is_none")]
    pub use_hs_download: Option<Value>,
    #[serde(rename = "Username")]
    pub username: String,
}

/// Body of a `ConfigReply` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigReply {
    #[serde(rename = "Ret")]
    pub ret: ResultCode,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_type_try_from_known_codes() {
        assert_eq!(MessageType::try_from(1530), Ok(MessageType::Probe));
        assert_eq!(MessageType::try_from(1531), Ok(MessageType::ProbeReply));
        assert_eq!(MessageType::try_from(1532), Ok(MessageType::ConfigPush));
        assert_eq!(MessageType::try_from(1533), Ok(MessageType::ConfigReply));
    }

    #[test]
    fn test_message_type_try_from_unknown_code_fails() {
        assert!(MessageType::try_from(1000).is_err());
        assert!(MessageType::try_from(0).is_err());
    }

    #[test]
    fn test_only_config_push_carries_command_code() {
        assert_eq!(MessageType::Probe.command_code(), 0);
        assert_eq!(MessageType::ConfigPush.command_code(), 254);
    }

    #[test]
    fn test_net_common_keeps_unknown_keys() {
        let value = json!({
            "MAC": "00:12:31:aa:bb:cc",
            "HostName": "LocalHost",
            "HostIP": "0x6401A8C0",
            "TCPPort": 34567,
            "ChannelNum": 1,
        });

        let net: NetCommon = serde_json::from_value(value).unwrap();

        assert_eq!(net.mac.as_deref(), Some("00:12:31:aa:bb:cc"));
        assert_eq!(net.tcp_port, Some(34567));
        assert_eq!(net.extra.get("ChannelNum"), Some(&json!(1)));

        let back = serde_json::to_value(&net).unwrap();
        assert_eq!(back["ChannelNum"], json!(1));
        assert_eq!(back["HostIP"], json!("0x6401A8C0"));
    }

    #[test]
    fn test_merge_overwrites_present_and_keeps_absent_fields() {
        let mut base = NetCommon {
            host_name: Some("y".to_string()),
            tcp_port: Some(80),
            ..Default::default()
        };

        base.merge(NetCommon {
            host_name: Some("x".to_string()),
            ..Default::default()
        });

        assert_eq!(base.host_name.as_deref(), Some("x"));
        assert_eq!(base.tcp_port, Some(80));
    }

    #[test]
    fn test_merge_never_changes_mac() {
        let mut base = NetCommon {
            mac: Some("AA:BB:CC:DD:EE:FF".to_string()),
            ..Default::default()
        };

        base.merge(NetCommon {
            mac: Some("11:22:33:44:55:66".to_string()),
            ..Default::default()
        });

        assert_eq!(base.mac.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
    }

    #[test]
    fn test_probe_reply_reads_nested_net_common() {
        let text = r#"{"NetWork.NetCommon":{"MAC":"AA:BB:CC:DD:EE:FF","HostName":"Cam1"},"Ret":100,"SessionID":"0x00000000"}"#;

        let reply: ProbeReply = serde_json::from_str(text).unwrap();

        assert_eq!(reply.net_common.host_name.as_deref(), Some("Cam1"));
        assert_eq!(reply.ret, Some(ResultCode::SUCCESS));
        assert!(reply.extra.contains_key("SessionID"));
    }

    #[test]
    fn test_config_reply_requires_ret() {
        assert!(serde_json::from_str::<ConfigReply>(r#"{"SessionID":"0x0"}"#).is_err());
        let reply: ConfigReply = serde_json::from_str(r#"{"Ret":203}"#).unwrap();
        assert_eq!(reply.ret, ResultCode::INCORRECT_PASSWORD);
    }
}
