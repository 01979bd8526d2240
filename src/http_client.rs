use anyhow::{Context, Result, ensure};
use reqwest::{Client, Response};
use std::time::Duration;

/// Create an HTTP client for talking to the router's web API
///
/// The timeout bounds the whole request including connection setup.
///
/// # Arguments
/// * `timeout` - Upper bound for a single request
///
/// # Examples
/// ```no_run
/// use std::time::Duration;
/// use wifizen::http_client::router_client;
///
/// let client = router_client(Duration::from_secs(5))
///     .expect("failed to create client");
/// ```
pub fn router_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .context("failed to create router HTTP client")
}

/// Build a router URL from a host (optionally `host:port`) and a path
///
/// The path is normalized to start with a single "/".
pub fn build_url(host: &str, path: &str) -> String {
    let host = host
        .trim_start_matches("http://")
        .trim_end_matches('/');
    let normalized_path = path.trim_start_matches('/');
    format!("http://{host}/{normalized_path}")
}

/// Body of a router response, or an error carrying status and body
///
/// `context_msg` names the request in the error, e.g. "GET http://192.168.1.1/api/status".
pub async fn handle_http_response(res: Response, context_msg: &str) -> Result<String> {
    let status = res.status();
    let body = res.text().await.context("failed to read response body")?;

    ensure!(
        status.is_success(),
        "{context_msg} failed with status {status} and body: {body}"
    );

    Ok(body)
}


#[cfg(test)]
pub(crate) mod testing {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    /// Answer a single request on an ephemeral local port
    ///
    /// Returns the `host:port` to connect to and a handle yielding the raw
    /// request head that was received.
    pub(crate) async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];

            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();

            String::from_utf8_lossy(&request).to_string()
        });

        (addr, handle)
    }
}
