use crate::catalog::EntityRef;
use crate::errors::SentryError;
use crate::info_provider::SentryInfoProvider;
use crate::metrics_defs::ISSUES_REQUESTS;
use crate::sentry_api::{DEFAULT_STATS_PERIOD, FetchOptions, SentryApi, SentryIssue};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use shared::auth::bearer_token;
use shared::counter;
use std::sync::Arc;

pub struct RouterOptions {
    pub sentry_info_provider: Arc<dyn SentryInfoProvider>,
    pub sentry_api: SentryApi,
}

#[derive(Clone)]
struct RouterState {
    sentry_info_provider: Arc<dyn SentryInfoProvider>,
    sentry_api: SentryApi,
}

#[derive(Deserialize, Debug)]
struct EntityPath {
    namespace: String,
    kind: String,
    name: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct IssuesQuery {
    stats_period: Option<String>,
    organization: Option<String>,
}

pub fn create_router(options: RouterOptions) -> Router {
    let state = RouterState {
        sentry_info_provider: options.sentry_info_provider,
        sentry_api: options.sentry_api,
    };

    Router::new()
        .route("/v1/entity/{namespace}/{kind}/{name}/issues", get(issues))
        .with_state(state)
}

async fn issues(
    State(state): State<RouterState>,
    Path(path): Path<EntityPath>,
    Query(query): Query<IssuesQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<SentryIssue>>, SentryError> {
    let result = fetch_entity_issues(&state, path, query, &headers).await;

    let status = match &result {
        Ok(_) => "200".to_string(),
        Err(e) => e.status_code().as_u16().to_string(),
    };
    counter!(ISSUES_REQUESTS, "status" => status).increment(1);

    result.map(Json)
}

async fn fetch_entity_issues(
    state: &RouterState,
    path: EntityPath,
    query: IssuesQuery,
    headers: &HeaderMap,
) -> Result<Vec<SentryIssue>, SentryError> {
    let token = bearer_token(headers);
    let entity_ref = EntityRef::new(path.kind, path.namespace, path.name);

    let resolved = state
        .sentry_info_provider
        .resolve(&entity_ref, token)
        .await?;
    let instance = resolved.instance;

    let project = resolved.project.as_deref().filter(|p| !p.is_empty());
    // The configured organization always wins over the caller's choice
    let organization = instance
        .organization
        .clone()
        .filter(|o| !o.is_empty())
        .or(query.organization.filter(|o| !o.is_empty()));
    let organization = match organization {
        Some(organization) => organization,
        // Nothing will be fetched, so the organization is irrelevant
        None if project.is_none() => String::new(),
        None => {
            return Err(SentryError::MissingOrganization(instance.instance_name));
        }
    };

    let options = FetchOptions {
        stats_period: query
            .stats_period
            .unwrap_or_else(|| DEFAULT_STATS_PERIOD.to_string()),
    };

    state
        .sentry_api
        .fetch_issues(&instance, project, &organization, &options)
        .await
}
