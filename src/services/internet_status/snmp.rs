//! SNMP interface counter status source

use super::{BoxFuture, InternetStatus, Speed, StatusSource, bytes_per_sec_to_mbps};
use crate::config::RouterConfig;
use anyhow::{Context, Result, anyhow, bail, ensure};
use log::info;
use ::snmp::{SyncSession, Value};
use std::time::Duration;

/// Parse a dotted-decimal object identifier such as `1.3.6.1.2.1.2.2.1.10.1`
pub fn parse_oid(oid: &str) -> Result<Vec<u32>> {
    let oid = oid.trim().trim_start_matches('.');
    ensure!(!oid.is_empty(), "object identifier is empty");

    oid.split('.')
        .map(|arc| {
            arc.parse::<u32>()
                .context(format!("invalid object identifier arc \"{arc}\""))
        })
        .collect()
}

/// Target of one SNMP query, owned so it can move onto a blocking thread
#[derive(Clone, Debug)]
struct SnmpTarget {
    host: String,
    port: u16,
    community: String,
    in_octets_oid: Vec<u32>,
    out_octets_oid: Vec<u32>,
    timeout: Duration,
}

impl SnmpTarget {
    /// Inbound and outbound octet rates in bytes per second
    fn query_octets(&self) -> Result<(u64, u64)> {
        info!("SNMP GET {}:{}", self.host, self.port);

        let mut session = open_session(&self.host, self.port, &self.community, self.timeout)?;

        let inbound = get_counter(&mut session, &self.in_octets_oid)
            .context("failed to read inbound octets")?;
        let outbound = get_counter(&mut session, &self.out_octets_oid)
            .context("failed to read outbound octets")?;

        Ok((inbound, outbound))
    }
}

pub(crate) fn open_session(
    host: &str,
    port: u16,
    community: &str,
    timeout: Duration,
) -> Result<SyncSession> {
    SyncSession::new((host, port), community.as_bytes(), Some(timeout), 0)
        .context("failed to open snmp session")
}

fn get_counter(session: &mut SyncSession, oid: &[u32]) -> Result<u64> {
    let mut response = session
        .get(oid)
        .map_err(|e| anyhow!("snmp get request failed: {e:?}"))?;

    ensure!(
        response.error_status == 0,
        "snmp agent returned error status {} at index {}",
        response.error_status,
        response.error_index
    );

    let (_, value) = response
        .varbinds
        .next()
        .context("snmp response has no value")?;

    counter_value(&value)
}

fn counter_value(value: &Value) -> Result<u64> {
    match *value {
        Value::Counter32(v) | Value::Unsigned32(v) => Ok(u64::from(v)),
        Value::Counter64(v) => Ok(v),
        Value::Integer(v) if v >= 0 => Ok(v as u64),
        _ => bail!("unexpected snmp value type for octet counter"),
    }
}

pub struct SnmpSource {
    target: SnmpTarget,
}

impl SnmpSource {
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            target: SnmpTarget {
                host: config.host.clone(),
                port: config.snmp.port,
                community: config.snmp.community.clone(),
                in_octets_oid: config.snmp.in_octets_oid.clone(),
                out_octets_oid: config.snmp.out_octets_oid.clone(),
                timeout: config.snmp.timeout,
            },
        }
    }

    async fn fetch(&self) -> Result<InternetStatus> {
        let target = self.target.clone();

        let (inbound, outbound) = tokio::task::spawn_blocking(move || target.query_octets())
            .await
            .context("snmp query task failed")??;

        // SNMP never reports health, always classify
        Ok(InternetStatus::derived(Speed {
            download: bytes_per_sec_to_mbps(inbound),
            upload: bytes_per_sec_to_mbps(outbound),
        }))
    }
}

impl StatusSource for SnmpSource {
    fn name(&self) -> &'static str {
        "snmp"
    }

    fn timeout(&self) -> Duration {
        self.target.timeout
    }

    fn acquire(&self) -> BoxFuture<'_, Result<InternetStatus>> {
        Box::pin(self.fetch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod oid {
        use super::*;

        #[test]
        fn parses_dotted_decimal() {
            assert_eq!(
                parse_oid("1.3.6.1.2.1.2.2.1.10.1").unwrap(),
                vec![1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 1]
            );
        }

        #[test]
        fn accepts_leading_dot() {
            assert_eq!(parse_oid(".1.3.6").unwrap(), vec![1, 3, 6]);
        }

        #[test]
        fn rejects_non_numeric_arcs() {
            assert!(parse_oid("1.3.six").is_err());
            assert!(parse_oid("1..3").is_err());
        }

        #[test]
        fn rejects_empty() {
            assert!(parse_oid("").is_err());
        }
    }

    mod counters {
        use super::*;

        #[test]
        fn counter_types_are_widened() {
            assert_eq!(counter_value(&Value::Counter32(1_250_000)).unwrap(), 1_250_000);
            assert_eq!(counter_value(&Value::Unsigned32(7)).unwrap(), 7);
            assert_eq!(counter_value(&Value::Counter64(u64::MAX)).unwrap(), u64::MAX);
            assert_eq!(counter_value(&Value::Integer(42)).unwrap(), 42);
        }

        #[test]
        fn negative_and_non_counter_values_are_rejected() {
            assert!(counter_value(&Value::Integer(-1)).is_err());
            assert!(counter_value(&Value::Null).is_err());
            assert!(counter_value(&Value::OctetString(b"1250000")).is_err());
        }
    }

    #[tokio::test]
    async fn unreachable_agent_fails() {
        let source = SnmpSource {
            target: SnmpTarget {
                host: "127.0.0.1".to_string(),
                port: 9,
                community: "public".to_string(),
                in_octets_oid: vec![1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 1],
                out_octets_oid: vec![1, 3, 6, 1, 2, 1, 2, 2, 1, 16, 1],
                timeout: Duration::from_millis(200),
            },
        };

        assert!(source.acquire().await.is_err());
    }
}
