//! Maps catalog entities to Sentry instances.
//!
//! An entity opts in with the `sentry.io/project-slug` annotation, whose value
//! has the form `[instance ':'] project`. When the value contains a colon the
//! part before it names the instance and the part after it is the project
//! slug. A value without a colon is taken as an instance name as a whole and
//! carries no project, so the issues lookup for it is empty.

use crate::catalog::{CatalogApi, EntityRef};
use crate::config::InstanceRegistry;
use crate::errors::SentryError;
use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};
use std::sync::Arc;

pub const SENTRY_ANNOTATION: &str = "sentry.io/project-slug";

/// Connection details for one request against a Sentry instance.
#[derive(Clone, Debug)]
pub struct ResolvedInstance {
    pub instance_name: String,
    pub base_url: String,
    pub headers: HeaderMap,
    pub organization: Option<String>,
}

/// The instance an entity's annotation points at and the project it names.
#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub instance: ResolvedInstance,
    pub project: Option<String>,
}

#[async_trait]
pub trait SentryInfoProvider: Send + Sync {
    async fn resolve(
        &self,
        entity_ref: &EntityRef,
        backstage_token: Option<&str>,
    ) -> Result<ResolvedEntity, SentryError>;
}

/// Splits an annotation value into the instance name and the project slug.
pub fn parse_annotation(value: &str) -> (&str, Option<&str>) {
    match value.split_once(':') {
        Some((instance, project)) => (instance, Some(project)),
        None => (value, None),
    }
}

pub struct DefaultSentryInfoProvider {
    registry: Arc<InstanceRegistry>,
    catalog: Arc<dyn CatalogApi>,
}

impl DefaultSentryInfoProvider {
    pub fn new(registry: Arc<InstanceRegistry>, catalog: Arc<dyn CatalogApi>) -> Self {
        DefaultSentryInfoProvider { registry, catalog }
    }
}

#[async_trait]
impl SentryInfoProvider for DefaultSentryInfoProvider {
    async fn resolve(
        &self,
        entity_ref: &EntityRef,
        backstage_token: Option<&str>,
    ) -> Result<ResolvedEntity, SentryError> {
        let entity = self
            .catalog
            .get_entity_by_ref(entity_ref, backstage_token)
            .await?
            .ok_or_else(|| SentryError::EntityNotFound(entity_ref.to_string()))?;

        let annotation = entity
            .annotation(SENTRY_ANNOTATION)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| SentryError::MissingAnnotation {
                annotation: SENTRY_ANNOTATION,
                entity: entity_ref.to_string(),
            })?;

        let (instance_name, project) = parse_annotation(annotation);
        let instance = self.registry.get_instance_config(Some(instance_name))?;

        tracing::debug!(
            entity = %entity_ref,
            instance = %instance.name,
            project = ?project,
            "Resolved sentry instance"
        );

        let mut headers = HeaderMap::new();
        let authorization = HeaderValue::from_str(&format!("Bearer {}", instance.auth_token))
            .map_err(|_| SentryError::InvalidAuthToken(instance.name.clone()))?;
        headers.insert(AUTHORIZATION, authorization);

        Ok(ResolvedEntity {
            instance: ResolvedInstance {
                instance_name: instance.name.clone(),
                base_url: instance.base_url.clone(),
                headers,
                organization: instance.organization.clone(),
            },
            project: project.map(String::from),
        })
    }
}
