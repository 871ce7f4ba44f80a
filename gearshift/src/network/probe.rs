use {
    std::{
        net::{SocketAddr, TcpStream},
        time::Duration,
    },
    tracing::debug,
};

pub trait ConnectivityProber: Send + Sync {
    fn is_online(&self, timeout: Duration) -> bool;
}

/// Reports online if a public DNS resolver accepts a TCP connection, falling back to
/// an HTTP connectivity check.
#[derive(Debug, Clone)]
pub struct DnsHttpProber {
    dns_addrs: Vec<SocketAddr>,
    http_url: Option<String>,
}

impl DnsHttpProber {
    pub fn new(dns_addrs: Vec<SocketAddr>, http_url: Option<String>) -> Self {
        Self {
            dns_addrs,
            http_url,
        }
    }

    fn dns_reachable(&self, timeout: Duration) -> bool {
        self.dns_addrs.iter().any(|addr| {
            match TcpStream::connect_timeout(addr, timeout) {
                Ok(_stream) => true,
                Err(err) => {
                    debug!("dns probe to {} failed: {}", addr, err);
                    false
                }
            }
        })
    }

    fn http_reachable(&self, url: &str, timeout: Duration) -> bool {
        let client = match reqwest::blocking::Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(err) => {
                debug!("failed to build http client: {}", err);
                return false;
            }
        };
        match client.get(url).send() {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!("http probe to {} failed: {}", url, err);
                false
            }
        }
    }
}

impl ConnectivityProber for DnsHttpProber {
    fn is_online(&self, timeout: Duration) -> bool {
        if self.dns_reachable(timeout) {
            return true;
        }
        self.http_url
            .as_deref()
            .is_some_and(|url| self.http_reachable(url, timeout))
    }
}
