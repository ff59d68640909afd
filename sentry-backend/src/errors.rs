use crate::catalog::CatalogError;
use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;

/// Errors raised while serving an issues request.
#[derive(thiserror::Error, Debug)]
pub enum SentryError {
    #[error(
        "couldn't find a default sentry instance in the config. Either configure an instance with name default or add a prefix to your annotation value"
    )]
    NoDefaultInstance,

    #[error("couldn't find a sentry instance in the config with name {0}")]
    InstanceNotFound(String),

    #[error("couldn't find entity with name: {0}")]
    EntityNotFound(String),

    #[error("couldn't find sentry annotation ({annotation}) on entity with name {entity}")]
    MissingAnnotation {
        annotation: &'static str,
        entity: String,
    },

    #[error("no sentry organization configured or requested for instance {0}")]
    MissingOrganization(String),

    #[error("failed fetching sentry issues: upstream returned {status}")]
    Upstream { status: StatusCode },

    #[error("sentry request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("invalid sentry url: {0}")]
    InvalidUrl(String),

    #[error("auth token of sentry instance {0} is not a valid header value")]
    InvalidAuthToken(String),
}

impl SentryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SentryError::NoDefaultInstance
            | SentryError::InstanceNotFound(_)
            | SentryError::EntityNotFound(_) => StatusCode::NOT_FOUND,
            SentryError::MissingAnnotation { .. } | SentryError::MissingOrganization(_) => {
                StatusCode::BAD_REQUEST
            }
            SentryError::Upstream { .. } | SentryError::Request(_) | SentryError::Catalog(_) => {
                StatusCode::BAD_GATEWAY
            }
            SentryError::InvalidUrl(_) | SentryError::InvalidAuthToken(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error_message: String,
}

impl IntoResponse for SentryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Issues request failed");
        } else {
            tracing::debug!(error = %self, "Issues request rejected");
        }

        let body = Json(ApiErrorResponse {
            error_message: self.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_status_codes() {
        let request_error = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();

        let cases = [
            (SentryError::NoDefaultInstance, StatusCode::NOT_FOUND),
            (
                SentryError::InstanceNotFound("acme".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                SentryError::EntityNotFound("component:default/web".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                SentryError::MissingAnnotation {
                    annotation: "sentry.io/project-slug",
                    entity: "component:default/web".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                SentryError::MissingOrganization("acme".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                SentryError::Upstream {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                },
                StatusCode::BAD_GATEWAY,
            ),
            (SentryError::Request(request_error), StatusCode::BAD_GATEWAY),
            (
                SentryError::Catalog(CatalogError::UnexpectedStatus(
                    StatusCode::SERVICE_UNAVAILABLE,
                )),
                StatusCode::BAD_GATEWAY,
            ),
            (
                SentryError::InvalidUrl("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SentryError::InvalidAuthToken("acme".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "{error}");
        }
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = SentryError::InstanceNotFound("acme".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body["error_message"],
            "couldn't find a sentry instance in the config with name acme"
        );
    }
}
