//! Router web API device source

use super::{BandwidthUsage, BoxFuture, Device, DeviceSource, DeviceStatus, DeviceType};
use crate::{
    config::RouterConfig,
    http_client::{build_url, handle_http_response, router_client},
};
use anyhow::{Context, Result};
use log::info;
use reqwest::{Client, header::ACCEPT};
use serde::Deserialize;
use std::time::Duration;

/// MAC prefix the router assigns to mobile clients
const MOBILE_MAC_PREFIX: &str = "00:11:22";

#[derive(Debug, Deserialize)]
struct RouterDevicesResponse {
    devices: Vec<RouterDevice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouterDevice {
    mac: Option<String>,
    hostname: Option<String>,
    #[serde(default)]
    connected: bool,
    ip: Option<String>,
    manufacturer: Option<String>,
    model: Option<String>,
    user_agent: Option<String>,
    /// Minutes since the device connected
    connection_time: Option<u32>,
    download_speed: Option<f64>,
    upload_speed: Option<f64>,
}

impl RouterDevice {
    fn device_type(&self) -> DeviceType {
        if self
            .mac
            .as_deref()
            .is_some_and(|mac| mac.to_ascii_uppercase().starts_with(MOBILE_MAC_PREFIX))
        {
            DeviceType::Smartphone
        } else if self
            .user_agent
            .as_deref()
            .is_some_and(|agent| agent.contains("TV"))
        {
            DeviceType::SmartTv
        } else {
            DeviceType::Unknown
        }
    }

    fn into_device(self, index: usize) -> Device {
        let device_type = self.device_type();
        let mac = self.mac.filter(|mac| !mac.is_empty());

        Device {
            id: mac.clone().unwrap_or_else(|| format!("device-{}", index + 1)),
            name: self
                .hostname
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "Unknown Device".to_string()),
            ip_address: self.ip.unwrap_or_default(),
            mac_address: mac.unwrap_or_default(),
            status: if self.connected {
                DeviceStatus::Online
            } else {
                DeviceStatus::Offline
            },
            device_type,
            manufacturer: self.manufacturer.unwrap_or_else(|| "Unknown".to_string()),
            model: self.model.unwrap_or_else(|| "Unknown".to_string()),
            connection_time: self.connection_time.unwrap_or_default(),
            bandwidth_usage: BandwidthUsage {
                download: self.download_speed.unwrap_or_default(),
                upload: self.upload_speed.unwrap_or_default(),
            },
            user_provided_name: None,
        }
    }
}

fn parse_devices(body: &str) -> Result<Vec<Device>> {
    let response: RouterDevicesResponse =
        serde_json::from_str(body).context("failed to parse router device list")?;

    Ok(response
        .devices
        .into_iter()
        .enumerate()
        .map(|(index, device)| device.into_device(index))
        .collect())
}

pub struct RouterDevicesSource {
    client: Client,
    url: String,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
}

impl RouterDevicesSource {
    pub fn new(config: &RouterConfig) -> Result<Self> {
        Ok(Self {
            client: router_client(config.api.timeout)?,
            url: build_url(&config.host, &config.api.devices_endpoint),
            username: config.username.clone(),
            password: config.password.clone(),
            timeout: config.api.timeout,
        })
    }

    async fn fetch(&self) -> Result<Vec<Device>> {
        info!("GET {}", self.url);

        let mut request = self.client.get(&self.url).header(ACCEPT, "application/json");

        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let res = request
            .send()
            .await
            .context(format!("failed to send GET request to {}", self.url))?;

        let body = handle_http_response(res, &format!("GET {}", self.url)).await?;

        parse_devices(&body)
    }
}

impl DeviceSource for RouterDevicesSource {
    fn name(&self) -> &'static str {
        "router api"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn discover(&self) -> BoxFuture<'_, Result<Vec<Device>>> {
        Box::pin(self.fetch())
    }
}
