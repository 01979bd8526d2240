//! Static device catalog served when discovery finds nothing

use super::{
    BandwidthUsage, Device, DeviceStatus, DeviceSummary, DeviceType, DeviceTypeCount,
    RenameDeviceRequest,
};
use serde_valid::Validate;

#[derive(Clone, Debug)]
pub struct DeviceCatalog {
    devices: Vec<Device>,
}

impl Default for DeviceCatalog {
    fn default() -> Self {
        Self::new(demo_devices())
    }
}

impl DeviceCatalog {
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    pub fn find(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn all(&self) -> &[Device] {
        &self.devices
    }

    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            online: self
                .devices
                .iter()
                .filter(|d| d.status == DeviceStatus::Online)
                .count(),
            total: self.devices.len(),
        }
    }

    /// Device count per type, in declaration order, omitting absent types
    pub fn distribution(&self) -> Vec<DeviceTypeCount> {
        DeviceType::ALL
            .iter()
            .map(|device_type| DeviceTypeCount {
                device_type: *device_type,
                count: self
                    .devices
                    .iter()
                    .filter(|d| d.device_type == *device_type)
                    .count(),
            })
            .filter(|entry| entry.count > 0)
            .collect()
    }

    /// Acknowledge a rename if the device exists and the name is valid
    pub fn rename(&self, id: &str, request: &RenameDeviceRequest) -> Option<String> {
        if !self.contains(id) || request.validate().is_err() {
            return None;
        }

        Some(format!(
            "Device {id} name updated to {} (simulated)",
            request.name
        ))
    }

    /// Acknowledge forgetting a device if it exists
    pub fn forget(&self, id: &str) -> Option<String> {
        self.contains(id)
            .then(|| format!("Device {id} forgotten (simulated)"))
    }
}

#[allow(clippy::too_many_arguments)]
fn device(
    id: &str,
    name: &str,
    ip_address: &str,
    mac_address: &str,
    status: DeviceStatus,
    device_type: DeviceType,
    manufacturer: &str,
    model: &str,
    connection_time: u32,
    bandwidth_usage: (f64, f64),
    user_provided_name: Option<&str>,
) -> Device {
    Device {
        id: id.to_string(),
        name: name.to_string(),
        ip_address: ip_address.to_string(),
        mac_address: mac_address.to_string(),
        status,
        device_type,
        manufacturer: manufacturer.to_string(),
        model: model.to_string(),
        connection_time,
        bandwidth_usage: BandwidthUsage {
            download: bandwidth_usage.0,
            upload: bandwidth_usage.1,
        },
        user_provided_name: user_provided_name.map(String::from),
    }
}

fn demo_devices() -> Vec<Device> {
    use DeviceStatus::*;

    vec![
        device(
            "1",
            "Living Room TV",
            "192.168.1.101",
            "00:1A:2B:3C:4D:5E",
            Online,
            DeviceType::SmartTv,
            "Samsung",
            "QLED Q80T",
            125,
            (5.2, 0.5),
            Some("Living Room TV"),
        ),
        device(
            "2",
            "John's MacBook Pro",
            "192.168.1.102",
            "01:2B:3C:4D:5E:6F",
            Online,
            DeviceType::Laptop,
            "Apple",
            "MacBook Pro 16\"",
            340,
            (15.7, 2.1),
            None,
        ),
        device(
            "3",
            "Jane's iPhone 15",
            "192.168.1.103",
            "02:3C:4D:5E:6F:7G",
            Online,
            DeviceType::Smartphone,
            "Apple",
            "iPhone 15 Pro",
            60,
            (2.3, 0.8),
            Some("Jane's iPhone"),
        ),
        device(
            "4",
            "Kitchen Tablet",
            "192.168.1.104",
            "03:4D:5E:6F:7G:8H",
            Offline,
            DeviceType::Tablet,
            "Amazon",
            "Fire HD 10",
            0,
            (0.0, 0.0),
            None,
        ),
        device(
            "5",
            "Smart Thermostat",
            "192.168.1.105",
            "04:5E:6F:7G:8H:9I",
            Online,
            DeviceType::IotDevice,
            "Google",
            "Nest Thermostat",
            1440,
            (0.1, 0.1),
            None,
        ),
        device(
            "6",
            "Main Router",
            "192.168.1.1",
            "A1:B2:C3:D4:E5:F6",
            Online,
            DeviceType::Router,
            "Huawei",
            "XPON H123",
            10080,
            (0.0, 0.0),
            Some("WifiZen Router"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::services::devices::rank;

    fn ranked_ids(limit: Option<usize>) -> Vec<String> {
        rank(DeviceCatalog::default().all().to_vec(), limit)
            .into_iter()
            .map(|d| d.id)
            .collect()
    }

    mod listing {
        use super::*;

        #[test]
        fn online_devices_come_first_sorted_by_bandwidth() {
            assert_eq!(ranked_ids(None), vec!["2", "1", "3", "5", "6", "4"]);
        }

        #[test]
        fn limit_truncates_the_sorted_list() {
            assert_eq!(ranked_ids(Some(2)), vec!["2", "1"]);
            assert!(ranked_ids(Some(0)).is_empty());
            assert_eq!(ranked_ids(Some(100)).len(), 6);
        }

        #[test]
        fn devices_serialize_in_camel_case() {
            let catalog = DeviceCatalog::default();
            let json = serde_json::to_value(catalog.find("1").unwrap()).unwrap();

            assert_eq!(json["ipAddress"], "192.168.1.101");
            assert_eq!(json["deviceType"], "smart-tv");
            assert_eq!(json["bandwidthUsage"]["download"], 5.2);
            assert_eq!(json["userProvidedName"], "Living Room TV");
        }

        #[test]
        fn absent_user_provided_name_is_omitted() {
            let catalog = DeviceCatalog::default();
            let json = serde_json::to_value(catalog.find("2").unwrap()).unwrap();

            assert!(json.get("userProvidedName").is_none());
        }
    }

    mod aggregation {
        use super::*;

        #[test]
        fn summary_counts_online_and_total() {
            assert_eq!(
                DeviceCatalog::default().summary(),
                DeviceSummary {
                    online: 5,
                    total: 6
                }
            );
        }

        #[test]
        fn distribution_omits_absent_types() {
            let distribution = DeviceCatalog::default().distribution();

            assert_eq!(distribution.len(), 6);
            assert!(
                distribution
                    .iter()
                    .all(|entry| entry.device_type != DeviceType::Unknown && entry.count == 1)
            );
            assert_eq!(distribution[0].device_type, DeviceType::Laptop);
        }

        #[test]
        fn empty_catalog_has_empty_distribution() {
            let catalog = DeviceCatalog::new(vec![]);

            assert!(catalog.distribution().is_empty());
            assert_eq!(catalog.summary(), DeviceSummary { online: 0, total: 0 });
        }
    }

    mod acknowledgements {
        use super::*;

        fn rename_request(name: &str) -> RenameDeviceRequest {
            RenameDeviceRequest {
                name: name.to_string(),
            }
        }

        #[test]
        fn rename_existing_device_is_acknowledged() {
            let catalog = DeviceCatalog::default();

            assert_eq!(
                catalog.rename("2", &rename_request("Work Laptop")).as_deref(),
                Some("Device 2 name updated to Work Laptop (simulated)")
            );
            assert_eq!(catalog.find("2").unwrap().name, "John's MacBook Pro");
        }

        #[test]
        fn rename_requires_known_device_and_name() {
            let catalog = DeviceCatalog::default();

            assert_eq!(catalog.rename("42", &rename_request("Ghost")), None);
            assert_eq!(catalog.rename("2", &rename_request("")), None);
        }

        #[test]
        fn forget_is_acknowledged_without_removing() {
            let catalog = DeviceCatalog::default();

            assert_eq!(
                catalog.forget("4").as_deref(),
                Some("Device 4 forgotten (simulated)")
            );
            assert!(catalog.contains("4"));
            assert_eq!(catalog.forget("42"), None);
        }
    }
}
