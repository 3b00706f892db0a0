//! Deployment service client
//!
//! The deployment service owns release storage and applies charts to the
//! cluster. It speaks JSON over HTTP:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | history   | `GET /v1/releases/{name}/history?max=N` |
//! | install   | `POST /v1/releases` |
//! | upgrade   | `PUT /v1/releases/{name}` |
//! | status    | `GET /v1/releases/{name}/status` |
//! | content   | `GET /v1/releases/{name}/content` |
//!
//! Unknown releases answer 404; other failures carry `{"error": "..."}`.

use async_trait::async_trait;
use deckhand_core::{Chart, Release};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{KubeError, Result};

/// Install a chart as a new release
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRequest<'a> {
    pub chart: &'a Chart,
    pub namespace: &'a str,
    pub name: &'a str,
    /// Override Document, serialized as YAML
    pub values: &'a str,
    pub dry_run: bool,
}

/// Upgrade an existing release to a chart
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest<'a> {
    #[serde(skip)]
    pub name: &'a str,
    pub chart: &'a Chart,
    /// Override Document, serialized as YAML
    pub values: &'a str,
    pub dry_run: bool,
}

/// Operations offered by the deployment service
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait DeployService: Send + Sync {
    /// Up to `max` most recent revisions of a release
    ///
    /// Fails with `ReleaseNotFound` when the service has never seen it.
    async fn release_history(&self, name: &str, max: u32) -> Result<Vec<Release>>;

    async fn install_release(&self, request: InstallRequest<'_>) -> Result<Release>;

    async fn update_release(&self, request: UpdateRequest<'_>) -> Result<Release>;

    /// Identity, namespace and lifecycle info of a release
    async fn release_status(&self, name: &str) -> Result<Release>;

    /// The full release, including its rendered manifest
    async fn release_content(&self, name: &str) -> Result<Release>;
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    releases: Vec<Release>,
}

#[derive(Deserialize)]
struct ReleaseResponse {
    release: Release,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// HTTP client for the deployment service
#[derive(Debug, Clone)]
pub struct HttpDeployService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDeployService {
    /// Client for the service at `endpoint` (`host:port` or a full URL)
    pub fn new(endpoint: &str, connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        let base_url = if endpoint.contains("://") {
            endpoint.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", endpoint)
        };

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn release_url(&self, name: &str, suffix: &str) -> String {
        format!("{}/v1/releases/{}{}", self.base_url, name, suffix)
    }
}

/// Turn a non-success answer into an error
///
/// A 404 for a named release means the service does not know it.
async fn check(response: reqwest::Response, release: Option<&str>) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        if let Some(name) = release {
            return Err(KubeError::ReleaseNotFound {
                name: name.to_string(),
            });
        }
    }

    let body = response.text().await?;
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error)
        .unwrap_or(body);

    Err(KubeError::Service {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DeployService for HttpDeployService {
    async fn release_history(&self, name: &str, max: u32) -> Result<Vec<Release>> {
        let response = self
            .client
            .get(self.release_url(name, "/history"))
            .query(&[("max", max)])
            .send()
            .await?;

        let history: HistoryResponse = check(response, Some(name)).await?.json().await?;
        Ok(history.releases)
    }

    async fn install_release(&self, request: InstallRequest<'_>) -> Result<Release> {
        let response = self
            .client
            .post(format!("{}/v1/releases", self.base_url))
            .json(&request)
            .send()
            .await?;

        let body: ReleaseResponse = check(response, None).await?.json().await?;
        Ok(body.release)
    }

    async fn update_release(&self, request: UpdateRequest<'_>) -> Result<Release> {
        let response = self
            .client
            .put(self.release_url(request.name, ""))
            .json(&request)
            .send()
            .await?;

        let body: ReleaseResponse = check(response, Some(request.name)).await?.json().await?;
        Ok(body.release)
    }

    async fn release_status(&self, name: &str) -> Result<Release> {
        let response = self
            .client
            .get(self.release_url(name, "/status"))
            .send()
            .await?;

        Ok(check(response, Some(name)).await?.json().await?)
    }

    async fn release_content(&self, name: &str) -> Result<Release> {
        let response = self
            .client
            .get(self.release_url(name, "/content"))
            .send()
            .await?;

        let body: ReleaseResponse = check(response, Some(name)).await?.json().await?;
        Ok(body.release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckhand_core::{ChartMetadata, ReleaseStatus, Values};
    use semver::Version;
    use serde_json::json;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chart() -> Chart {
        Chart {
            metadata: ChartMetadata {
                name: "demo".to_string(),
                version: Version::new(0, 1, 0),
                description: None,
                app_version: None,
            },
            values: Values::new(),
            templates: BTreeMap::new(),
            root: Default::default(),
        }
    }

    fn service(server: &MockServer) -> HttpDeployService {
        HttpDeployService::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_base_url() {
        let svc = HttpDeployService::new("10.0.0.7:44134", Duration::from_secs(5)).unwrap();
        assert_eq!(svc.base_url(), "http://10.0.0.7:44134");
    }

    #[tokio::test]
    async fn test_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/releases/web/history"))
            .and(query_param("max", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "releases": [{"name": "web", "namespace": "apps", "version": 3}]
            })))
            .mount(&server)
            .await;

        let history = service(&server).release_history("web", 1).await.unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].version, 3);
    }

    #[tokio::test]
    async fn test_history_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/releases/web/history"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = service(&server).release_history("web", 1).await.unwrap_err();

        assert!(matches!(err, KubeError::ReleaseNotFound { ref name } if name == "web"));
    }

    #[tokio::test]
    async fn test_install_sends_overrides() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/releases"))
            .and(body_partial_json(json!({
                "namespace": "apps",
                "name": "web",
                "values": "replicas: 3\n",
                "dryRun": true,
                "chart": {"metadata": {"name": "demo"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "release": {
                    "name": "web",
                    "namespace": "apps",
                    "info": {"status": {"code": "PENDING_INSTALL"}},
                    "manifest": "kind: Service\n"
                }
            })))
            .mount(&server)
            .await;

        let chart = chart();
        let release = service(&server)
            .install_release(InstallRequest {
                chart: &chart,
                namespace: "apps",
                name: "web",
                values: "replicas: 3\n",
                dry_run: true,
            })
            .await
            .unwrap();

        assert_eq!(release.status(), &ReleaseStatus::PendingInstall);
        assert_eq!(release.manifest, "kind: Service\n");
    }

    #[tokio::test]
    async fn test_update_uses_release_path() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/releases/web"))
            .and(body_partial_json(json!({"dryRun": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "release": {"name": "web", "namespace": "apps", "version": 2}
            })))
            .mount(&server)
            .await;

        let chart = chart();
        let release = service(&server)
            .update_release(UpdateRequest {
                name: "web",
                chart: &chart,
                values: "{}\n",
                dry_run: false,
            })
            .await
            .unwrap();

        assert_eq!(release.version, 2);
    }

    #[tokio::test]
    async fn test_status_body_is_release() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/releases/web/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "web",
                "namespace": "apps",
                "info": {"status": {"code": "DEPLOYED"}}
            })))
            .mount(&server)
            .await;

        let release = service(&server).release_status("web").await.unwrap();

        assert_eq!(release.namespace, "apps");
        assert_eq!(release.status(), &ReleaseStatus::Deployed);
    }

    #[tokio::test]
    async fn test_service_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/releases/web/content"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"error": "storage unavailable"})),
            )
            .mount(&server)
            .await;

        let err = service(&server).release_content("web").await.unwrap_err();

        match err {
            KubeError::Service { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "storage unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_plain_text_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/releases/web/status"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = service(&server).release_status("web").await.unwrap_err();

        match err {
            KubeError::Service { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
