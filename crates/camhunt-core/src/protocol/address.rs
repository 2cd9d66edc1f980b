//! Packed IPv4 representation used in XM payloads.
//!
//! The firmware reads the four address octets as a little-endian `u32` and
//! sends it as an upper-case hex string with a `0x` prefix:
//!
//! ```text
//! 192.168.1.100  ->  octets c0 a8 01 64  ->  0x6401A8C0
//! ```

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced while parsing addresses supplied by users or devices.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The text is not a hex-packed address.
    #[error("invalid packed address: {0:?}")]
    InvalidPacked(String),

    /// The text is not a dotted-quad IPv4 address.
    #[error("invalid IPv4 address: {0:?}")]
    InvalidIpv4(String),
}

/// An IPv4 address in the firmware's packed form.
///
/// # Examples
///
/// ```rust
/// use std::net::Ipv4Addr;
/// use camhunt_core::PackedIpv4;
///
/// let packed = PackedIpv4::from(Ipv4Addr::new(192, 168, 1, 100));
/// assert_eq!(packed.to_string(), "0x6401A8C0");
/// assert_eq!(packed.to_ipv4(), Ipv4Addr::new(192, 168, 1, 100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackedIpv4(pub u32);

impl PackedIpv4 {
    /// Parses a dotted-quad string such as `"192.168.1.10"`.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::InvalidIpv4`] if `text` is not an IPv4 address.
    pub fn parse_dotted(text: &str) -> Result<Self, AddressError> {
        text.trim()
            .parse::<Ipv4Addr>()
            .map(Self::from)
            .map_err(|_| AddressError::InvalidIpv4(text.to_string()))
    }

    /// Returns the address as a standard [`Ipv4Addr`].
    pub fn to_ipv4(self) -> Ipv4Addr {
        Ipv4Addr::from(self.0.to_le_bytes())
    }
}

impl From<Ipv4Addr> for PackedIpv4 {
    fn from(addr: Ipv4Addr) -> Self {
        Self(u32::from_le_bytes(addr.octets()))
    }
}

impl From<PackedIpv4> for Ipv4Addr {
    fn from(packed: PackedIpv4) -> Self {
        packed.to_ipv4()
    }
}

impl fmt::Display for PackedIpv4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl FromStr for PackedIpv4 {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() || digits.len() > 8 {
            return Err(AddressError::InvalidPacked(s.to_string()));
        }
        u32::from_str_radix(digits, 16)
            .map(PackedIpv4)
            .map_err(|_| AddressError::InvalidPacked(s.to_string()))
    }
}

impl Serialize for PackedIpv4 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackedIpv4 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_matches_firmware_byte_order() {
        let packed = PackedIpv4::from(Ipv4Addr::new(192, 168, 1, 100));
        assert_eq!(packed.0, 0x6401_A8C0);
        assert_eq!(packed.to_string(), "0x6401A8C0");
    }

    #[test]
    fn test_netmask_packs_with_leading_zeros() {
        let packed = PackedIpv4::from(Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(packed.to_string(), "0x00FFFFFF");
    }

    #[test]
    fn test_parse_accepts_prefix_variants_and_case() {
        assert_eq!("0x6401A8C0".parse::<PackedIpv4>(), Ok(PackedIpv4(0x6401_A8C0)));
        assert_eq!("0X6401a8c0".parse::<PackedIpv4>(), Ok(PackedIpv4(0x6401_A8C0)));
        assert_eq!("6401A8C0".parse::<PackedIpv4>(), Ok(PackedIpv4(0x6401_A8C0)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<PackedIpv4>().is_err());
        assert!("0x".parse::<PackedIpv4>().is_err());
        assert!("0x123456789".parse::<PackedIpv4>().is_err());
        assert!("192.168.1.1".parse::<PackedIpv4>().is_err());
    }

    #[test]
    fn test_parse_dotted() {
        assert_eq!(
            PackedIpv4::parse_dotted("10.0.0.1").unwrap().to_ipv4(),
            Ipv4Addr::new(10, 0, 0, 1)
        );
        assert_eq!(
            PackedIpv4::parse_dotted("10.0.0"),
            Err(AddressError::InvalidIpv4("10.0.0".to_string()))
        );
    }

    #[test]
    fn test_serde_uses_hex_string() {
        let packed = PackedIpv4::from(Ipv4Addr::new(192, 168, 1, 1));
        let json = serde_json::to_string(&packed).unwrap();
        assert_eq!(json, "\"0x0101A8C0\"");
        let back: PackedIpv4 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, packed);
    }
}
