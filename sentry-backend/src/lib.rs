//! Sentry backend plugin
//!
//! Serves the Sentry issues of catalog entities:
//!
//! ```text
//! GET /v1/entity/{namespace}/{kind}/{name}/issues
//!   → catalog lookup (caller's token forwarded)
//!   → `sentry.io/project-slug` annotation → instance + project
//!   → GET {baseUrl}/0/projects/{organization}/{project}/issues/
//! ```
//!
//! The plugin registers itself with a [`shared::plugin::PluginHost`], which
//! mounts it under `/api/sentry`.

pub mod catalog;
pub mod config;
pub mod errors;
pub mod info_provider;
pub mod metrics_defs;
pub mod router;
pub mod sentry_api;

#[cfg(test)]
mod testutils;

use catalog::CatalogApi;
use config::{ConfigError, InstanceRegistry, RawSentryConfig};
use info_provider::{DefaultSentryInfoProvider, SentryInfoProvider};
use router::{RouterOptions, create_router};
use sentry_api::SentryApi;
use shared::plugin::{BackendPlugin, PluginRegistrar};
use std::sync::Arc;

pub const PLUGIN_ID: &str = "sentry";

pub struct SentryPlugin {
    sentry_info_provider: Arc<dyn SentryInfoProvider>,
    sentry_api: SentryApi,
}

impl SentryPlugin {
    pub fn new(sentry_info_provider: Arc<dyn SentryInfoProvider>, sentry_api: SentryApi) -> Self {
        SentryPlugin {
            sentry_info_provider,
            sentry_api,
        }
    }

    /// Builds the plugin from the `sentry` config section using the default
    /// annotation based instance resolution.
    pub fn from_config(
        config: &RawSentryConfig,
        catalog: Arc<dyn CatalogApi>,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let registry = Arc::new(InstanceRegistry::from_config(config)?);
        tracing::info!(
            instances = ?registry.instances().iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            "Loaded sentry instances"
        );

        let provider = DefaultSentryInfoProvider::new(registry, catalog);
        Ok(SentryPlugin::new(Arc::new(provider), SentryApi::new(client)))
    }
}

impl BackendPlugin for SentryPlugin {
    fn id(&self) -> &str {
        PLUGIN_ID
    }

    fn register(self: Box<Self>, registrar: &mut dyn PluginRegistrar) {
        registrar.register_router(create_router(RouterOptions {
            sentry_info_provider: self.sentry_info_provider,
            sentry_api: self.sentry_api,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogError, Entity, EntityMetadata, EntityRef};
    use crate::info_provider::SENTRY_ANNOTATION;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use shared::plugin::PluginHost;
    use std::collections::HashMap;
    use tower::ServiceExt;

    struct SingleEntityCatalog;

    #[async_trait]
    impl CatalogApi for SingleEntityCatalog {
        async fn get_entity_by_ref(
            &self,
            entity_ref: &EntityRef,
            _token: Option<&str>,
        ) -> Result<Option<Entity>, CatalogError> {
            Ok(Some(Entity {
                api_version: "backstage.io/v1alpha1".into(),
                kind: entity_ref.kind.clone(),
                metadata: EntityMetadata {
                    name: entity_ref.name.clone(),
                    namespace: None,
                    annotations: HashMap::from([(
                        SENTRY_ANNOTATION.to_string(),
                        "no-project".to_string(),
                    )]),
                },
            }))
        }
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let config = RawSentryConfig {
            base_url: Some("https://s.io".into()),
            ..Default::default()
        };
        let result = SentryPlugin::from_config(
            &config,
            Arc::new(SingleEntityCatalog),
            reqwest::Client::new(),
        );
        assert!(matches!(result, Err(ConfigError::PartialDefault)));
    }

    #[tokio::test]
    async fn test_plugin_is_mounted_by_host() {
        let config = RawSentryConfig {
            instances: vec![config::RawInstanceConfig {
                name: "no-project".into(),
                base_url: "https://sentry.example.com/api".into(),
                auth_token: "T".into(),
                organization: None,
            }],
            ..Default::default()
        };
        let plugin = SentryPlugin::from_config(
            &config,
            Arc::new(SingleEntityCatalog),
            reqwest::Client::new(),
        )
        .unwrap();

        let mut host = PluginHost::new();
        host.add(plugin).unwrap();
        let router = host.into_router();

        let response = router
            .oneshot(
                Request::get("/api/sentry/v1/entity/default/component/web/issues")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"[]");
    }
}
