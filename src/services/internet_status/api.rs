//! Router web API status source

use super::{BoxFuture, Health, InternetStatus, Speed, StatusSource};
use crate::{
    config::RouterConfig,
    http_client::{build_url, handle_http_response, router_client},
};
use anyhow::{Context, Result, bail, ensure};
use log::info;
use reqwest::{Client, header::ACCEPT};
use serde::Deserialize;
use std::time::Duration;

/// Status payload returned by the router
///
/// Accepts either a nested `speed` object or flat throughput fields.
#[derive(Debug, Deserialize)]
struct RouterStatusResponse {
    speed: Option<Speed>,
    #[serde(alias = "downloadSpeed")]
    download: Option<f64>,
    #[serde(alias = "uploadSpeed")]
    upload: Option<f64>,
    health: Option<Health>,
}

impl RouterStatusResponse {
    fn into_internet_status(self) -> Result<InternetStatus> {
        let speed = match (self.speed, self.download, self.upload) {
            (Some(speed), _, _) => speed,
            (None, Some(download), Some(upload)) => Speed { download, upload },
            _ => bail!("router status response is missing throughput fields"),
        };

        ensure!(
            speed.is_valid(),
            "router reported invalid throughput: {speed:?}"
        );

        Ok(match self.health {
            Some(health) => InternetStatus { speed, health },
            None => InternetStatus::derived(speed),
        })
    }
}

pub struct RouterApiSource {
    client: Client,
    url: String,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
}

impl RouterApiSource {
    pub fn new(config: &RouterConfig) -> Result<Self> {
        Ok(Self {
            client: router_client(config.api.timeout)?,
            url: build_url(&config.host, &config.api.status_endpoint),
            username: config.username.clone(),
            password: config.password.clone(),
            timeout: config.api.timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<InternetStatus> {
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

        serde_json::from_str::<RouterStatusResponse>(&body)
            .context("failed to parse router status")?
            .into_internet_status()
    }
}

impl StatusSource for RouterApiSource {
    fn name(&self) -> &'static str {
        "router api"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn acquire(&self) -> BoxFuture<'_, Result<InternetStatus>> {
        Box::pin(self.fetch())
    }
}
