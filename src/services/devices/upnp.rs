//! UPnP SSDP device source
//!
//! Multicasts an `M-SEARCH` for internet gateway devices and lists every
//! host that answers within the search window.

use super::{BoxFuture, Device, DeviceSource};
use crate::config::DiscoveryConfig;
use anyhow::{Context, Result, ensure};
use log::{debug, info};
use std::time::Duration;
use tokio::{
    net::UdpSocket,
    time::{Instant, timeout_at},
};

const SSDP_MULTICAST_ADDR: &str = "239.255.255.250:1900";
const SEARCH_TARGET: &str = "urn:schemas-upnp-org:device:InternetGatewayDevice:1";
const DEFAULT_DEVICE_NAME: &str = "UPnP Device";

fn search_request(window: Duration) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {SSDP_MULTICAST_ADDR}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {SEARCH_TARGET}\r\n\r\n",
        window.as_secs().max(1)
    )
}

/// Value of a response header, matched case-insensitively
fn header_value<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    response.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim())
            .filter(|value| !value.is_empty())
    })
}

fn device_from_response(ip: String, response: &str) -> Device {
    let server = header_value(response, "SERVER");
    let mut device = Device::discovered(
        ip.clone(),
        server.unwrap_or(DEFAULT_DEVICE_NAME),
        ip,
        String::new(),
    );
    if let Some(server) = server {
        device.manufacturer = server.to_string();
    }
    device
}

pub struct UpnpSource {
    window: Duration,
}

impl UpnpSource {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            window: config.upnp_search_window,
        }
    }

    async fn search(&self) -> Result<Vec<Device>> {
        info!("SSDP M-SEARCH {SEARCH_TARGET}");

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .context("failed to bind ssdp socket")?;
        socket
            .send_to(search_request(self.window).as_bytes(), SSDP_MULTICAST_ADDR)
            .await
            .context("failed to send ssdp search")?;

        let deadline = Instant::now() + self.window;
        let mut devices: Vec<Device> = vec![];
        let mut buf = [0u8; 2048];

        // collect answers until the window closes
        while let Ok(received) = timeout_at(deadline, socket.recv_from(&mut buf)).await {
            let (len, addr) = received.context("failed to receive ssdp response")?;
            let ip = addr.ip().to_string();

            if devices.iter().any(|d| d.ip_address == ip) {
                continue;
            }

            debug!("ssdp response from {ip}");
            devices.push(device_from_response(
                ip,
                &String::from_utf8_lossy(&buf[..len]),
            ));
        }

        ensure!(!devices.is_empty(), "no UPnP devices answered");

        Ok(devices)
    }
}

impl DeviceSource for UpnpSource {
    fn name(&self) -> &'static str {
        "upnp"
    }

    /// Search window plus a grace period for socket setup
    fn timeout(&self) -> Duration {
        self.window + Duration::from_secs(1)
    }

    fn discover(&self) -> BoxFuture<'_, Result<Vec<Device>>> {
        Box::pin(self.search())
    }
}
