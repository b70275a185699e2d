//! Outbound probes against a node's declared domain
//!
//! Nodes expose two endpoints: `/healthz` answering `{"status":"ok"}` and
//! `/api/nodeinfo` answering any subset of [`NodeInfo`]. Probes never return
//! errors; every failure collapses into `false` or `None`.

use std::time::Duration;

use async_trait::async_trait;
use rollcall_common::{DEFAULT_USER_AGENT, HEALTH_PATH, NODE_INFO_PATH, host_of, is_loopback_host};
use serde::{Deserialize, Deserializer};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Self-reported node metadata from `/api/nodeinfo`
///
/// Each field is read on its own: a value of the wrong type is treated as
/// absent and the remaining fields are kept.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct NodeInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub track_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub user_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub open_registration: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub p2p_enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub p2p_node_id: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Deserialize)]
struct HealthBody {
    status: Option<String>,
}

/// Liveness and info checks against a remote node
#[async_trait]
pub trait NodeProbe: Send + Sync {
    /// `true` only for a 2xx response whose JSON `status` is `"ok"`
    async fn probe_health(&self, domain: &str) -> bool;

    /// Parsed `/api/nodeinfo`, or `None` if no scheme produced one
    async fn fetch_info(&self, domain: &str) -> Option<NodeInfo>;
}

/// Probe client configuration
#[derive(Clone, Debug)]
pub struct ProbeConfig {
    /// Per-attempt timeout (default: 8 seconds)
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(8),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Schemes to try, in order, for a domain
///
/// Loopback nodes never terminate TLS, so they only get plain HTTP.
pub fn scheme_candidates(domain: &str) -> &'static [&'static str] {
    if is_loopback_host(host_of(domain)) {
        &["http"]
    } else {
        &["https", "http"]
    }
}

/// reqwest-backed [`NodeProbe`]
#[derive(Clone)]
pub struct HttpNodeProbe {
    client: reqwest::Client,
}

impl HttpNodeProbe {
    pub fn new(config: &ProbeConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }

    /// GET `path` on each candidate scheme until one yields an accepted body
    async fn fetch_json<T, F>(&self, domain: &str, path: &str, accept: F) -> Option<T>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        for scheme in scheme_candidates(domain) {
            let url = format!("{}://{}{}", scheme, domain, path);
            match self.get_json::<T>(&url).await {
                Ok(body) if accept(&body) => return Some(body),
                Ok(_) => debug!(url = %url, "Probe response rejected"),
                Err(e) => debug!(url = %url, error = %e, "Probe attempt failed"),
            }
        }
        None
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await
    }
}

#[async_trait]
impl NodeProbe for HttpNodeProbe {
    async fn probe_health(&self, domain: &str) -> bool {
        self.fetch_json::<HealthBody, _>(domain, HEALTH_PATH, |body| {
            body.status.as_deref() == Some("ok")
        })
        .await
        .is_some()
    }

    async fn fetch_info(&self, domain: &str) -> Option<NodeInfo> {
        self.fetch_json::<NodeInfo, _>(domain, NODE_INFO_PATH, |_| true)
            .await
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, HttpResponse, HttpServer, web};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_scheme_candidates() {
        assert_eq!(scheme_candidates("localhost:3000"), &["http"]);
        assert_eq!(scheme_candidates("127.0.0.1"), &["http"]);
        assert_eq!(scheme_candidates("[::1]:8080"), &["http"]);
        assert_eq!(scheme_candidates("a.example"), &["https", "http"]);
        assert_eq!(scheme_candidates("10.0.0.5:80"), &["https", "http"]);
    }

    #[test]
    fn test_node_info_ignores_unknown_fields() {
        let info: NodeInfo = serde_json::from_value(json!({
            "name": "Node A",
            "track_count": 12,
            "software": "whatever",
        }))
        .unwrap();

        assert_eq!(info.name.as_deref(), Some("Node A"));
        assert_eq!(info.track_count, Some(12));
        assert_eq!(info.version, None);
    }

    #[test]
    fn test_node_info_drops_only_mistyped_fields() {
        let info: NodeInfo = serde_json::from_value(json!({
            "name": "Node A",
            "version": 2,
            "track_count": 12.5,
            "user_count": 7,
            "open_registration": "yes",
            "p2p_enabled": null,
        }))
        .unwrap();

        assert_eq!(
            info,
            NodeInfo {
                name: Some("Node A".to_string()),
                user_count: Some(7),
                ..Default::default()
            }
        );
    }

    fn probe() -> HttpNodeProbe {
        HttpNodeProbe::new(&ProbeConfig {
            timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap()
    }

    /// Start a local node stub; returns its `127.0.0.1:port` domain
    fn spawn_node(health: serde_json::Value, health_ok: bool) -> (String, actix_web::dev::ServerHandle) {
        let server = HttpServer::new(move || {
            let health = health.clone();
            App::new()
                .route(
                    "/healthz",
                    web::get().to(move || {
                        let health = health.clone();
                        async move {
                            if health_ok {
                                HttpResponse::Ok().json(health)
                            } else {
                                HttpResponse::ServiceUnavailable().json(health)
                            }
                        }
                    }),
                )
                .route(
                    "/api/nodeinfo",
                    web::get().to(|req: actix_web::HttpRequest| async move {
                        let agent = req
                            .headers()
                            .get("user-agent")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        HttpResponse::Ok().json(json!({
                            "name": "Stub",
                            "version": agent,
                            "track_count": 7,
                        }))
                    }),
                )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);
        (format!("127.0.0.1:{}", addr.port()), handle)
    }

    #[actix_web::test]
    async fn test_probe_health_ok() {
        let (domain, handle) = spawn_node(json!({"status": "ok"}), true);

        assert!(probe().probe_health(&domain).await);

        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn test_probe_health_requires_ok_status() {
        let (domain, handle) = spawn_node(json!({"status": "degraded"}), true);
        assert!(!probe().probe_health(&domain).await);
        handle.stop(true).await;

        let (domain, handle) = spawn_node(json!({"status": "ok"}), false);
        assert!(!probe().probe_health(&domain).await);
        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn test_fetch_info_sends_user_agent() {
        let (domain, handle) = spawn_node(json!({"status": "ok"}), true);

        let info = probe().fetch_info(&domain).await.unwrap();
        assert_eq!(info.name.as_deref(), Some("Stub"));
        assert_eq!(info.track_count, Some(7));
        assert!(
            info.version
                .unwrap_or_default()
                .starts_with("rollcall-registry/")
        );

        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn test_unreachable_node() {
        // Port 9 (discard) is closed on loopback in any sane test environment
        let probe = probe();
        assert!(!probe.probe_health("127.0.0.1:9").await);
        assert!(probe.fetch_info("127.0.0.1:9").await.is_none());
    }
}
