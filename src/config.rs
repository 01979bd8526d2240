use crate::services::internet_status::{Health, InternetStatus, Speed, snmp::parse_oid};
use anyhow::{Context, Result, ensure};
use std::{env, str::FromStr, time::Duration};

/// Application configuration loaded and validated at startup
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// UI server configuration
    pub ui: UiConfig,

    /// Upstream router access configuration
    pub router: RouterConfig,

    /// Internet status cache and fallback configuration
    pub status: StatusConfig,

    /// Local network device discovery configuration
    pub discovery: DiscoveryConfig,
}

#[derive(Clone, Debug)]
pub struct UiConfig {
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Router address, the API strategy also accepts `host:port`
    pub host: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api: RouterApiConfig,
    pub snmp: SnmpConfig,
    pub ssh: SshConfig,
}

#[derive(Clone, Debug)]
pub struct RouterApiConfig {
    pub status_endpoint: String,
    pub devices_endpoint: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct SnmpConfig {
    pub community: String,
    pub port: u16,
    pub in_octets_oid: Vec<u32>,
    pub out_octets_oid: Vec<u32>,
    /// ARP table physical address column walked for device discovery
    pub arp_table_oid: Vec<u32>,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct SshConfig {
    pub port: u16,
    pub command: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct StatusConfig {
    pub cache_ttl: Duration,
    pub fallback: InternetStatus,
}

#[derive(Clone, Debug)]
pub struct DiscoveryConfig {
    /// How long UPnP search responses are collected
    pub upnp_search_window: Duration,
}

/// Source of raw configuration values, keyed by environment variable name
trait Lookup {
    fn string(&self, key: &str, default: &str) -> String;
    fn optional(&self, key: &str) -> Option<String>;

    fn parsed<T>(&self, key: &str, default: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.string(key, default)
            .trim()
            .parse::<T>()
            .context(format!("failed to parse {key}: invalid format"))
    }

    fn millis(&self, key: &str, default: u64) -> Result<Duration> {
        let millis: u64 = self.parsed(key, &default.to_string())?;
        ensure!(millis > 0, "failed to parse {key}: must be greater than zero");
        Ok(Duration::from_millis(millis))
    }
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str, default: &str) -> String {
        self(key).unwrap_or_else(|| default.to_string())
    }

    fn optional(&self, key: &str) -> Option<String> {
        self(key).filter(|value| !value.is_empty())
    }
}

impl AppConfig {
    pub const DEFAULT_UI_PORT: u16 = 9002;
    pub const DEFAULT_ROUTER_HOST: &str = "192.168.1.1";
    pub const DEFAULT_STATUS_ENDPOINT: &str = "/api/status";
    pub const DEFAULT_DEVICES_ENDPOINT: &str = "/api/devices";
    pub const DEFAULT_SNMP_COMMUNITY: &str = "public";
    pub const DEFAULT_IN_OCTETS_OID: &str = "1.3.6.1.2.1.2.2.1.10.1";
    pub const DEFAULT_OUT_OCTETS_OID: &str = "1.3.6.1.2.1.2.2.1.16.1";
    pub const DEFAULT_ARP_TABLE_OID: &str = "1.3.6.1.2.1.4.22.1.2";
    pub const DEFAULT_SSH_COMMAND: &str = "show internet status";
    pub const DEFAULT_API_TIMEOUT_MS: u64 = 5000;
    pub const DEFAULT_SNMP_TIMEOUT_MS: u64 = 5000;
    pub const DEFAULT_SSH_TIMEOUT_MS: u64 = 10000;
    pub const DEFAULT_CACHE_TTL_MS: u64 = 30000;
    pub const DEFAULT_UPNP_SEARCH_MS: u64 = 2000;

    /// Load and validate the configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::load_from(|key: &str| env::var(key).ok())
    }

    /// Load and validate the configuration from an arbitrary key/value lookup
    ///
    /// Every key is optional; absent keys fall back to their documented default.
    pub fn load_from<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ui = UiConfig::load(&lookup)?;
        let router = RouterConfig::load(&lookup)?;
        let status = StatusConfig::load(&lookup)?;
        let discovery = DiscoveryConfig::load(&lookup)?;

        Ok(Self {
            ui,
            router,
            status,
            discovery,
        })
    }
}

impl UiConfig {
    fn load(lookup: &impl Lookup) -> Result<Self> {
        let port = lookup.parsed("UI_PORT", &AppConfig::DEFAULT_UI_PORT.to_string())?;

        Ok(Self { port })
    }
}

impl RouterConfig {
    fn load(lookup: &impl Lookup) -> Result<Self> {
        let host = lookup.string("ROUTER_HOST", AppConfig::DEFAULT_ROUTER_HOST);
        // SNMP and SSH need a bare address, the router API is plain HTTP
        let host = host
            .trim()
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        ensure!(!host.is_empty(), "failed to parse ROUTER_HOST: empty");
        ensure!(
            !host.contains("://"),
            "failed to parse ROUTER_HOST: only plain http routers are supported"
        );

        Ok(Self {
            host,
            username: lookup.optional("ROUTER_USERNAME"),
            password: lookup.optional("ROUTER_PASSWORD"),
            api: RouterApiConfig::load(lookup)?,
            snmp: SnmpConfig::load(lookup)?,
            ssh: SshConfig::load(lookup)?,
        })
    }
}

impl RouterApiConfig {
    fn load(lookup: &impl Lookup) -> Result<Self> {
        Ok(Self {
            status_endpoint: lookup
                .string("ROUTER_STATUS_ENDPOINT", AppConfig::DEFAULT_STATUS_ENDPOINT),
            devices_endpoint: lookup
                .string("ROUTER_API_ENDPOINT", AppConfig::DEFAULT_DEVICES_ENDPOINT),
            timeout: lookup.millis("ROUTER_API_TIMEOUT_MS", AppConfig::DEFAULT_API_TIMEOUT_MS)?,
        })
    }
}

impl SnmpConfig {
    fn load(lookup: &impl Lookup) -> Result<Self> {
        let in_octets_oid = parse_oid(
            &lookup.string("SNMP_IN_OCTETS_OID", AppConfig::DEFAULT_IN_OCTETS_OID),
        )
        .context("failed to parse SNMP_IN_OCTETS_OID")?;
        let out_octets_oid = parse_oid(
            &lookup.string("SNMP_OUT_OCTETS_OID", AppConfig::DEFAULT_OUT_OCTETS_OID),
        )
        .context("failed to parse SNMP_OUT_OCTETS_OID")?;
        let arp_table_oid = parse_oid(
            &lookup.string("SNMP_ARP_TABLE_OID", AppConfig::DEFAULT_ARP_TABLE_OID),
        )
        .context("failed to parse SNMP_ARP_TABLE_OID")?;

        Ok(Self {
            community: lookup.string("SNMP_COMMUNITY", AppConfig::DEFAULT_SNMP_COMMUNITY),
            port: lookup.parsed("SNMP_PORT", "161")?,
            in_octets_oid,
            out_octets_oid,
            arp_table_oid,
            timeout: lookup.millis("SNMP_TIMEOUT_MS", AppConfig::DEFAULT_SNMP_TIMEOUT_MS)?,
        })
    }
}

impl SshConfig {
    fn load(lookup: &impl Lookup) -> Result<Self> {
        let command = lookup.string("ROUTER_SSH_COMMAND", AppConfig::DEFAULT_SSH_COMMAND);
        ensure!(
            !command.trim().is_empty(),
            "failed to parse ROUTER_SSH_COMMAND: empty"
        );

        Ok(Self {
            port: lookup.parsed("ROUTER_SSH_PORT", "22")?,
            command,
            timeout: lookup.millis("ROUTER_SSH_TIMEOUT_MS", AppConfig::DEFAULT_SSH_TIMEOUT_MS)?,
        })
    }
}

impl StatusConfig {
    fn load(lookup: &impl Lookup) -> Result<Self> {
        // zero disables caching
        let cache_ttl_ms: u64 = lookup.parsed(
            "STATUS_CACHE_TTL_MS",
            &AppConfig::DEFAULT_CACHE_TTL_MS.to_string(),
        )?;

        let speed = Speed {
            download: lookup.parsed("FALLBACK_DOWNLOAD_MBPS", "980.5")?,
            upload: lookup.parsed("FALLBACK_UPLOAD_MBPS", "450.2")?,
        };
        ensure!(
            speed.is_valid(),
            "failed to parse fallback speed: values must be finite and non-negative"
        );
        let health: Health = lookup.parsed("FALLBACK_HEALTH", "Stable")?;

        Ok(Self {
            cache_ttl: Duration::from_millis(cache_ttl_ms),
            fallback: InternetStatus { speed, health },
        })
    }
}

impl DiscoveryConfig {
    fn load(lookup: &impl Lookup) -> Result<Self> {
        Ok(Self {
            upnp_search_window: lookup
                .millis("UPNP_SEARCH_MS", AppConfig::DEFAULT_UPNP_SEARCH_MS)?,
        })
    }
}

#[cfg(test)]
impl AppConfig {
    /// Configuration built from literal key/value pairs instead of the environment
    pub(crate) fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self> {
        let values: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::load_from(move |key: &str| values.get(key).cloned())
    }
}
