use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("catalog returned unexpected status {0}")]
    UnexpectedStatus(StatusCode),
    #[error("invalid catalog URL: {0}")]
    InvalidUrl(String),
}

/// Identifies an entity in the software catalog.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl EntityRef {
    pub fn new<K, N, M>(kind: K, namespace: N, name: M) -> Self
    where
        K: Into<String>,
        N: Into<String>,
        M: Into<String>,
    {
        EntityRef {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{}",
            self.kind.to_lowercase(),
            self.namespace,
            self.name
        )
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct EntityMetadata {
    pub name: String,
    pub namespace: Option<String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

/// The parts of a catalog entity this plugin reads. Other fields are ignored.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub api_version: String,
    pub kind: String,
    pub metadata: EntityMetadata,
}

impl Entity {
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata.annotations.get(key).map(String::as_str)
    }
}

/// Read access to the software catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Looks up an entity, forwarding the caller's token when present.
    /// Returns `Ok(None)` if the catalog has no such entity.
    async fn get_entity_by_ref(
        &self,
        entity_ref: &EntityRef,
        token: Option<&str>,
    ) -> Result<Option<Entity>, CatalogError>;
}

/// Catalog client talking to the catalog's REST API.
#[derive(Clone)]
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCatalogClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self, CatalogError> {
        let base_url = Url::parse(base_url).map_err(|e| CatalogError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(CatalogError::InvalidUrl(base_url.to_string()));
        }

        Ok(HttpCatalogClient { client, base_url })
    }

    fn entity_url(&self, entity_ref: &EntityRef) -> Result<Url, CatalogError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([
                "entities",
                "by-name",
                entity_ref.kind.as_str(),
                entity_ref.namespace.as_str(),
                entity_ref.name.as_str(),
            ]);
        Ok(url)
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    async fn get_entity_by_ref(
        &self,
        entity_ref: &EntityRef,
        token: Option<&str>,
    ) -> Result<Option<Entity>, CatalogError> {
        let url = self.entity_url(entity_ref)?;

        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::debug!(entity = %entity_ref, "Entity not found in catalog");
                Ok(None)
            }
            status if status.is_success() => Ok(Some(response.json::<Entity>().await?)),
            status => Err(CatalogError::UnexpectedStatus(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::spawn_server;
    use axum::Json;
    use axum::Router;
    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use serde_json::json;

    async fn entity_handler(
        Path((kind, namespace, name)): Path<(String, String, String)>,
        headers: HeaderMap,
    ) -> Result<Json<serde_json::Value>, StatusCode> {
        if name == "broken" {
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        if name != "web" {
            return Err(StatusCode::NOT_FOUND);
        }

        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none")
            .to_string();

        Ok(Json(json!({
            "apiVersion": "backstage.io/v1alpha1",
            "kind": kind,
            "metadata": {
                "name": name,
                "namespace": namespace,
                "annotations": {
                    "sentry.io/project-slug": "acme:web",
                    "seen-auth": auth,
                },
            },
            "spec": { "type": "service" },
        })))
    }

    async fn start_catalog() -> String {
        let app = Router::new().route(
            "/api/catalog/entities/by-name/{kind}/{namespace}/{name}",
            get(entity_handler),
        );
        let addr = spawn_server(app).await;
        format!("http://{addr}/api/catalog/")
    }

    #[test]
    fn test_entity_ref_display() {
        let entity_ref = EntityRef::new("Component", "default", "web");
        assert_eq!(entity_ref.to_string(), "component:default/web");
    }

    #[tokio::test]
    async fn test_get_entity_by_ref() {
        let base_url = start_catalog().await;
        let client = HttpCatalogClient::new(reqwest::Client::new(), &base_url).unwrap();
        let entity_ref = EntityRef::new("Component", "default", "web");

        let entity = client
            .get_entity_by_ref(&entity_ref, Some("user-token"))
            .await
            .unwrap()
            .expect("entity exists");
        assert_eq!(entity.kind, "Component");
        assert_eq!(entity.metadata.namespace.as_deref(), Some("default"));
        assert_eq!(entity.annotation("sentry.io/project-slug"), Some("acme:web"));
        assert_eq!(entity.annotation("seen-auth"), Some("Bearer user-token"));

        // No token, no Authorization header
        let entity = client
            .get_entity_by_ref(&entity_ref, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entity.annotation("seen-auth"), Some("none"));
    }

    #[tokio::test]
    async fn test_missing_entity_and_errors() {
        let base_url = start_catalog().await;
        let client = HttpCatalogClient::new(reqwest::Client::new(), &base_url).unwrap();

        let missing = client
            .get_entity_by_ref(&EntityRef::new("Component", "default", "other"), None)
            .await
            .unwrap();
        assert!(missing.is_none());

        let err = client
            .get_entity_by_ref(&EntityRef::new("Component", "default", "broken"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::UnexpectedStatus(StatusCode::INTERNAL_SERVER_ERROR)
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HttpCatalogClient::new(reqwest::Client::new(), "catalog").is_err());
        assert!(HttpCatalogClient::new(reqwest::Client::new(), "mailto:someone").is_err());
    }
}
