//! Connected devices
//!
//! Devices are discovered by trying an ordered list of sources (router API,
//! UPnP search, SNMP ARP table). When no source yields a list, the static
//! catalog is served instead. Rename and forget requests are acknowledged
//! against the catalog, which is never modified.

pub mod api;
pub mod catalog;
pub mod snmp;
pub mod upnp;

pub use self::{
    api::RouterDevicesSource, catalog::DeviceCatalog, snmp::ArpTableSource, upnp::UpnpSource,
};

use super::BoxFuture;
use crate::config::AppConfig;
use anyhow::Result;
use log::{info, warn};
#[cfg(feature = "mock")]
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::{cmp::Ordering, time::Duration};
use tokio::time::timeout;
use trait_variant::make;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum DeviceStatus {
    Online,
    Offline,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    Laptop,
    Smartphone,
    Tablet,
    SmartTv,
    Router,
    IotDevice,
    Unknown,
}

impl DeviceType {
    pub const ALL: [DeviceType; 7] = [
        DeviceType::Laptop,
        DeviceType::Smartphone,
        DeviceType::Tablet,
        DeviceType::SmartTv,
        DeviceType::Router,
        DeviceType::IotDevice,
        DeviceType::Unknown,
    ];
}

/// Per-device throughput in Mbps
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct BandwidthUsage {
    pub download: f64,
    pub upload: f64,
}

impl BandwidthUsage {
    fn total(&self) -> f64 {
        self.download + self.upload
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    pub ip_address: String,
    pub mac_address: String,
    pub status: DeviceStatus,
    pub device_type: DeviceType,
    pub manufacturer: String,
    pub model: String,
    /// Minutes since the device connected
    pub connection_time: u32,
    pub bandwidth_usage: BandwidthUsage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_provided_name: Option<String>,
}

impl Device {
    /// Online device with unknown type and no traffic, as reported by network scans
    fn discovered(id: String, name: &str, ip_address: String, mac_address: String) -> Self {
        Self {
            id,
            name: name.to_string(),
            ip_address,
            mac_address,
            status: DeviceStatus::Online,
            device_type: DeviceType::Unknown,
            manufacturer: "Unknown".to_string(),
            model: "Unknown".to_string(),
            connection_time: 0,
            bandwidth_usage: BandwidthUsage::default(),
            user_provided_name: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DeviceSummary {
    pub online: usize,
    pub total: usize,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DeviceTypeCount {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub count: usize,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameDeviceRequest {
    #[serde(default)]
    #[validate(min_length = 1)]
    pub name: String,
}

/// Online devices first, then by combined bandwidth, highest first
pub fn rank(mut devices: Vec<Device>, limit: Option<usize>) -> Vec<Device> {
    devices.sort_by(|a, b| match (a.status, b.status) {
        (DeviceStatus::Online, DeviceStatus::Offline) => Ordering::Less,
        (DeviceStatus::Offline, DeviceStatus::Online) => Ordering::Greater,
        _ => b
            .bandwidth_usage
            .total()
            .total_cmp(&a.bandwidth_usage.total()),
    });

    if let Some(limit) = limit {
        devices.truncate(limit);
    }

    devices
}

/// One transport-specific way of listing the devices on the network
pub trait DeviceSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Upper bound for a single `discover` call
    fn timeout(&self) -> Duration;

    fn discover(&self) -> BoxFuture<'_, Result<Vec<Device>>>;
}

#[make(Send)]
#[cfg_attr(feature = "mock", automock)]
pub trait DeviceProvider {
    /// Devices currently known on the network, never fails
    async fn devices(&self) -> Vec<Device>;
}

impl DeviceProvider for DeviceCatalog {
    async fn devices(&self) -> Vec<Device> {
        self.all().to_vec()
    }
}

/// Ordered device sources with the static catalog as last resort
pub struct DeviceDiscovery {
    sources: Vec<Box<dyn DeviceSource>>,
    fallback: DeviceCatalog,
}

impl DeviceDiscovery {
    pub fn new(sources: Vec<Box<dyn DeviceSource>>, fallback: DeviceCatalog) -> Self {
        Self { sources, fallback }
    }

    /// Build the router API, UPnP and SNMP ARP chain from the configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let sources: Vec<Box<dyn DeviceSource>> = vec![
            Box::new(RouterDevicesSource::new(&config.router)?),
            Box::new(UpnpSource::new(&config.discovery)),
            Box::new(ArpTableSource::new(&config.router)),
        ];

        Ok(Self::new(sources, DeviceCatalog::default()))
    }
}

impl DeviceProvider for DeviceDiscovery {
    async fn devices(&self) -> Vec<Device> {
        for source in &self.sources {
            match timeout(source.timeout(), source.discover()).await {
                Ok(Ok(devices)) => {
                    info!(
                        "{} devices discovered via {}",
                        devices.len(),
                        source.name()
                    );
                    return devices;
                }
                Ok(Err(e)) => warn!("{} device source failed: {e:#}", source.name()),
                Err(_) => warn!(
                    "{} device source timed out after {:?}",
                    source.name(),
                    source.timeout()
                ),
            }
        }

        warn!("all device sources failed, using device catalog");
        self.fallback.all().to_vec()
    }
}
