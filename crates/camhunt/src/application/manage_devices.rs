//! ManageDevicesUseCase: the registry of discovered cameras.
//!
//! The `DeviceRegistry` is camhunt's in-memory database of every camera that
//! answered a probe during this session.  It is owned by the caller (the
//! command bridge) and passed by reference into the discovery and
//! configuration services, so only one of them can mutate it at a time.
//!
//! # Record lifecycle (for beginners)
//!
//! ```text
//! first probe reply ──► created ──► merged on later replies
//!                          │
//!                          └──► address fields rewritten after a successful
//!                               configuration push
//! ```
//!
//! Records are never removed individually; `clear()` empties the whole
//! registry, typically before a fresh search.

use std::collections::HashMap;

use camhunt_core::{Brand, DeviceRecord, NetCommon, NetworkSettings};

/// In-memory registry of all discovered devices, keyed by MAC address.
///
/// # HashMap choice
///
/// A `HashMap<String, DeviceRecord>` provides O(1) lookup by MAC.
/// Iteration order is not guaranteed, so [`all`](Self::all) sorts its
/// snapshot by MAC before returning it.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, DeviceRecord>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the record for `mac` if needed and merges `fields` into it.
    ///
    /// Returns `true` when the device was not known before.
    pub fn upsert(&mut self, mac: &str, brand: Brand, fields: NetCommon) -> bool {
        let mut created = false;
        let record = self.devices.entry(mac.to_string()).or_insert_with(|| {
            created = true;
            DeviceRecord::new(mac, brand)
        });
        record.merge(fields);
        created
    }

    /// Returns the record for `mac`.
    pub fn get(&self, mac: &str) -> Option<&DeviceRecord> {
        self.devices.get(mac)
    }

    /// Returns a snapshot of all records, sorted by MAC.
    pub fn all(&self) -> Vec<DeviceRecord> {
        let mut records: Vec<DeviceRecord> = self.devices.values().cloned().collect();
        records.sort_by(|a, b| a.mac().cmp(b.mac()));
        records
    }

    /// Records settings a device has acknowledged.
    ///
    /// Returns `false` if `mac` is unknown.
    pub fn apply_settings(&mut self, mac: &str, settings: &NetworkSettings) -> bool {
        match self.devices.get_mut(mac) {
            Some(record) => {
                record.apply_settings(settings);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.devices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn fields(host_name: &str, tcp_port: Option<u16>) -> NetCommon {
        NetCommon {
            host_name: Some(host_name.to_string()),
            tcp_port,
            ..Default::default()
        }
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = DeviceRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.all().is_empty());
    }

    #[test]
    fn test_upsert_adds_device() {
        let mut registry = DeviceRegistry::new();

        let created = registry.upsert("AA:BB:CC:DD:EE:FF", Brand::Xm, fields("Cam1", None));

        assert!(created);
        let record = registry.get("AA:BB:CC:DD:EE:FF").expect("record must exist");
        assert_eq!(record.host_name(), Some("Cam1"));
        assert_eq!(record.brand(), Brand::Xm);
    }

    #[test]
    fn test_upsert_merges_into_existing_device() {
        // Arrange
        let mut registry = DeviceRegistry::new();
        registry.upsert("AA:BB:CC:DD:EE:FF", Brand::Xm, fields("y", Some(80)));

        // Act
        let created = registry.upsert("AA:BB:CC:DD:EE:FF", Brand::Xm, fields("x", None));

        // Assert
        assert!(!created);
        assert_eq!(registry.len(), 1);
        let record = registry.get("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(record.host_name(), Some("x"));
        assert_eq!(record.tcp_port(), Some(80));
    }

    #[test]
    fn test_all_is_sorted_by_mac() {
        let mut registry = DeviceRegistry::new();
        registry.upsert("CC:00:00:00:00:00", Brand::Xm, NetCommon::default());
        registry.upsert("AA:00:00:00:00:00", Brand::Xm, NetCommon::default());
        registry.upsert("BB:00:00:00:00:00", Brand::Xm, NetCommon::default());

        let macs: Vec<String> = registry.all().iter().map(|r| r.mac().to_string()).collect();

        assert_eq!(macs, ["AA:00:00:00:00:00", "BB:00:00:00:00:00", "CC:00:00:00:00:00"]);
    }

    #[test]
    fn test_apply_settings_updates_known_device_only() {
        let mut registry = DeviceRegistry::new();
        registry.upsert("AA:BB:CC:DD:EE:FF", Brand::Xm, NetCommon::default());
        let settings = NetworkSettings {
            host_ip: Ipv4Addr::new(10, 0, 0, 5),
            subnet_mask: Ipv4Addr::new(255, 255, 255, 0),
            gateway: Ipv4Addr::new(10, 0, 0, 1),
        };

        assert!(registry.apply_settings("AA:BB:CC:DD:EE:FF", &settings));
        assert!(!registry.apply_settings("11:22:33:44:55:66", &settings));
        assert_eq!(
            registry.get("AA:BB:CC:DD:EE:FF").unwrap().host_ip(),
            Some(Ipv4Addr::new(10, 0, 0, 5))
        );
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut registry = DeviceRegistry::new();
        registry.upsert("AA:BB:CC:DD:EE:FF", Brand::Xm, NetCommon::default());

        registry.clear();

        assert!(registry.is_empty());
        assert!(registry.get("AA:BB:CC:DD:EE:FF").is_none());
    }
}
