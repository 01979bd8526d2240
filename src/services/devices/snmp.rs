//! SNMP ARP table device source

use super::{BoxFuture, Device, DeviceSource};
use crate::{
    config::RouterConfig,
    services::internet_status::snmp::{open_session, parse_oid},
};
use ::snmp::Value;
use anyhow::{Context, Result, anyhow, ensure};
use log::{debug, info};
use std::time::Duration;

/// Upper bound on walked rows, the table of a home router is far smaller
const MAX_ARP_ENTRIES: usize = 1024;
const DEFAULT_DEVICE_NAME: &str = "SNMP Device";

/// IPv4 address encoded in the last four arcs of an ARP table row
fn row_ip(row_oid: &[u32], table_oid: &[u32]) -> Option<String> {
    let index = row_oid.strip_prefix(table_oid)?;
    let octets = index.get(index.len().checked_sub(4)?..)?;

    octets
        .iter()
        .all(|octet| *octet <= 255)
        .then(|| format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3]))
}

fn format_mac(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn device_from_row(ip: String, mac: &[u8]) -> Device {
    let mac = format_mac(mac);
    Device::discovered(mac.replace(':', ""), DEFAULT_DEVICE_NAME, ip, mac)
}

#[derive(Clone, Debug)]
struct ArpTarget {
    host: String,
    port: u16,
    community: String,
    table_oid: Vec<u32>,
    timeout: Duration,
}

impl ArpTarget {
    /// GETNEXT walk over the physical address column of the ARP table
    fn walk(&self) -> Result<Vec<Device>> {
        info!("SNMP walk {}:{}", self.host, self.port);

        let mut session = open_session(&self.host, self.port, &self.community, self.timeout)?;
        let mut cursor = self.table_oid.clone();
        let mut devices = vec![];

        while devices.len() < MAX_ARP_ENTRIES {
            let mut response = session
                .getnext(&cursor)
                .map_err(|e| anyhow!("snmp getnext request failed: {e:?}"))?;

            // end of mib view
            if response.error_status != 0 {
                break;
            }

            let Some((name, value)) = response.varbinds.next() else {
                break;
            };

            let row_oid = parse_oid(&name.to_string())?;
            if !row_oid.starts_with(&self.table_oid) || row_oid <= cursor {
                break;
            }

            match (row_ip(&row_oid, &self.table_oid), value) {
                (Some(ip), Value::OctetString(mac)) if !mac.is_empty() => {
                    debug!("arp entry {ip}");
                    devices.push(device_from_row(ip, mac));
                }
                _ => debug!("skipping arp row {name}"),
            }

            cursor = row_oid;
        }

        ensure!(!devices.is_empty(), "arp table is empty");

        Ok(devices)
    }
}

pub struct ArpTableSource {
    target: ArpTarget,
}

impl ArpTableSource {
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            target: ArpTarget {
                host: config.host.clone(),
                port: config.snmp.port,
                community: config.snmp.community.clone(),
                table_oid: config.snmp.arp_table_oid.clone(),
                timeout: config.snmp.timeout,
            },
        }
    }

    async fn fetch(&self) -> Result<Vec<Device>> {
        let target = self.target.clone();

        tokio::task::spawn_blocking(move || target.walk())
            .await
            .context("snmp walk task failed")?
    }
}

impl DeviceSource for ArpTableSource {
    fn name(&self) -> &'static str {
        "snmp"
    }

    fn timeout(&self) -> Duration {
        self.target.timeout
    }

    fn discover(&self) -> BoxFuture<'_, Result<Vec<Device>>> {
        Box::pin(self.fetch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::devices::DeviceStatus;

    const TABLE: [u32; 10] = [1, 3, 6, 1, 2, 1, 4, 22, 1, 2];

    #[test]
    fn ip_comes_from_the_row_index() {
        let row = [&TABLE[..], &[2, 192, 168, 1, 42]].concat();

        assert_eq!(row_ip(&row, &TABLE), Some("192.168.1.42".to_string()));
    }

    #[test]
    fn rows_outside_the_table_have_no_ip() {
        let short = [&TABLE[..], &[168, 1]].concat();
        let foreign = [1, 3, 6, 1, 2, 1, 4, 21, 1, 2, 2, 10, 0, 0, 1];
        let out_of_range = [&TABLE[..], &[2, 300, 0, 0, 1]].concat();

        assert_eq!(row_ip(&short, &TABLE), None);
        assert_eq!(row_ip(&foreign, &TABLE), None);
        assert_eq!(row_ip(&out_of_range, &TABLE), None);
    }

    #[test]
    fn mac_is_lowercase_hex_with_colons() {
        assert_eq!(
            format_mac(&[0x00, 0x1A, 0x2b, 0xff, 0x04, 0x50]),
            "00:1a:2b:ff:04:50"
        );
    }

    #[test]
    fn row_maps_to_online_device_keyed_by_mac() {
        let device = device_from_row("10.0.0.5".to_string(), &[0xAA, 0xBB, 0xCC, 0, 1, 2]);

        assert_eq!(device.id, "aabbcc000102");
        assert_eq!(device.mac_address, "aa:bb:cc:00:01:02");
        assert_eq!(device.ip_address, "10.0.0.5");
        assert_eq!(device.name, DEFAULT_DEVICE_NAME);
        assert_eq!(device.status, DeviceStatus::Online);
    }

    #[tokio::test]
    async fn unreachable_agent_fails() {
        let source = ArpTableSource {
            target: ArpTarget {
                host: "127.0.0.1".to_string(),
                port: 9,
                community: "public".to_string(),
                table_oid: TABLE.to_vec(),
                timeout: Duration::from_millis(200),
            },
        };

        assert!(source.discover().await.is_err());
    }
}
