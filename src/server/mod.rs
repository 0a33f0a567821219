//! TCP serving surface.
//!
//! Binds a listener, drives each connection on its own task, and drains
//! in-flight connections under a configurable deadline on shutdown.

use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::body::Body;
use crate::error::{BoxError, Error};
use crate::extension::ClientIp;
use crate::service::{ArcService, Request, Service};

/// Listener configuration, loadable from YAML.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Take the client address from `X-Forwarded-For` instead of the
    /// socket peer. Enable only behind a proxy that sets the header.
    #[serde(default)]
    pub trust_proxy: bool,
    /// How long to wait for in-flight connections on shutdown.
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub graceful_shutdown_timeout: Duration,
}

fn default_bind_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().expect("valid default address")
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            trust_proxy: false,
            graceful_shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

/// Serves a [`Service`] over TCP.
pub struct Server {
    config: ServerConfig,
    service: ArcService,
}

impl Server {
    pub fn new<S>(config: ServerConfig, service: S) -> Self
    where
        S: Service + 'static,
    {
        Self {
            config,
            service: Arc::new(service),
        }
    }

    /// Accept connections until `shutdown` is cancelled, then drain
    /// in-flight connections under the configured deadline.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), Error> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "listening");

        let tracker = TaskTracker::new();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => {
                    let (stream, remote_addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(error) => {
                            warn!(%error, "accept failed");
                            continue;
                        }
                    };
                    let app = AppService {
                        service: Arc::clone(&self.service),
                        remote_addr,
                        trust_proxy: self.config.trust_proxy,
                    };
                    let shutdown = shutdown.clone();
                    tracker.spawn(async move {
                        let io = TokioIo::new(stream);
                        let builder = auto::Builder::new(TokioExecutor::new());
                        let conn = builder.serve_connection_with_upgrades(io, app);
                        tokio::pin!(conn);
                        tokio::select! {
                            result = conn.as_mut() => {
                                if let Err(error) = result {
                                    debug!(%remote_addr, %error, "connection error");
                                }
                            }
                            _ = shutdown.cancelled() => {
                                conn.as_mut().graceful_shutdown();
                                let _ = conn.as_mut().await;
                            }
                        }
                    });
                }
            }
        }

        tracker.close();
        info!("draining connections");
        if tokio::time::timeout(self.config.graceful_shutdown_timeout, tracker.wait())
            .await
            .is_err()
        {
            warn!(
                timeout = ?self.config.graceful_shutdown_timeout,
                "graceful shutdown deadline reached with connections still open"
            );
        }
        Ok(())
    }
}

/// Adapter between hyper's per-connection service and this crate's
/// [`Service`]. Inserts a [`ClientIp`] extension before dispatch.
#[derive(Clone)]
struct AppService {
    service: ArcService,
    remote_addr: SocketAddr,
    trust_proxy: bool,
}

impl hyper::service::Service<http::Request<Incoming>> for AppService {
    type Response = http::Response<Body>;
    type Error = BoxError;
    type Future =
        Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = Arc::clone(&self.service);
        let client_ip = resolve_client_ip(req.headers(), self.remote_addr, self.trust_proxy);

        let (parts, body) = req.into_parts();
        let mut req = Request::from_parts(parts, Body::new(body));
        req.extensions_mut().insert(ClientIp(client_ip));

        Box::pin(async move { service.call(req).await })
    }
}

/// The first `X-Forwarded-For` entry when proxies are trusted, otherwise
/// the socket peer address.
fn resolve_client_ip(
    headers: &http::HeaderMap,
    remote_addr: SocketAddr,
    trust_proxy: bool,
) -> IpAddr {
    if trust_proxy {
        if let Some(forwarded) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
        {
            return forwarded;
        }
    }
    remote_addr.ip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderMap;
    use http::HeaderValue;

    fn remote() -> SocketAddr {
        "10.0.0.1:55000".parse().unwrap()
    }

    #[test]
    fn peer_address_is_used_without_trust_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let ip = resolve_client_ip(&headers, remote(), false);
        assert_eq!(ip, "10.0.0.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn forwarded_for_wins_when_proxies_are_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let ip = resolve_client_ip(&headers, remote(), true);
        assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn malformed_forwarded_for_falls_back_to_the_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        let ip = resolve_client_ip(&headers, remote(), true);
        assert_eq!(ip, "10.0.0.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn config_parses_from_yaml() {
        let config: ServerConfig = serde_yaml::from_str(
            "bind_addr: 0.0.0.0:9000\ntrust_proxy: true\ngraceful_shutdown_timeout: 10s\n",
        )
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000".parse().unwrap());
        assert!(config.trust_proxy);
        assert_eq!(config.graceful_shutdown_timeout, Duration::from_secs(10));
    }

    #[test]
    fn config_defaults_apply() {
        let config: ServerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.bind_addr, default_bind_addr());
        assert!(!config.trust_proxy);
        assert_eq!(config.graceful_shutdown_timeout, Duration::from_secs(30));
    }
}
