// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP client for the node registry.

use animaflow_editor_graph::{CatalogError, NodeCatalog, NodeDefinition};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

/// Node registry reached over HTTP
///
/// `GET {base}/api/nodes` lists every kind and `GET {base}/api/nodes/{kind}`
/// returns one definition, 404 when unknown.
#[derive(Debug, Clone)]
pub struct HttpNodeCatalog {
    /// HTTP client for API requests
    http_client: reqwest::Client,
    /// Registry root, without trailing slash
    base_url: String,
}

impl HttpNodeCatalog {
    /// Create a client for the registry at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Registry root
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/{segments...}`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, CatalogError> {
        let invalid = |reason: String| {
            CatalogError::Unavailable(format!("Registry URL {}: {reason}", self.base_url))
        };
        let mut url = Url::parse(&self.base_url).map_err(|err| invalid(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        kind: Option<&str>,
    ) -> Result<T, CatalogError> {
        let url = self.endpoint(segments)?;
        tracing::debug!("GET {url}");

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| CatalogError::Unavailable(err.to_string()))?;

        match (response.status(), kind) {
            (StatusCode::NOT_FOUND, Some(kind)) => {
                return Err(CatalogError::UnknownKind(kind.to_string()));
            }
            (status, _) if !status.is_success() => {
                return Err(CatalogError::Unavailable(format!("{url} answered {status}")));
            }
            _ => {}
        }

        response
            .json::<T>()
            .await
            .map_err(|err| CatalogError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl NodeCatalog for HttpNodeCatalog {
    async fn list(&self) -> Result<Vec<NodeDefinition>, CatalogError> {
        self.fetch(&["api", "nodes"], None).await
    }

    async fn get(&self, kind: &str) -> Result<NodeDefinition, CatalogError> {
        self.fetch(&["api", "nodes", kind], Some(kind)).await
    }
}
