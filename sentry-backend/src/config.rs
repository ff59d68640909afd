//! Sentry instance configuration
//!
//! Two styles are accepted under the `sentry` section:
//!
//! ```yaml
//! sentry:
//!   # a single unnamed instance, registered as "default"
//!   baseUrl: https://sentry.io/api
//!   authToken: abc
//!   instances:
//!     # any number of named instances, selected by annotation prefix
//!     - name: acme
//!       baseUrl: https://acme.sentry.io/api
//!       authToken: def
//! ```
//!
//! A named instance called `default` and the top level shorthand are mutually
//! exclusive. The resulting [`InstanceRegistry`] is built once at startup and
//! never mutated.

use crate::errors::SentryError;
use http::HeaderValue;
use serde::Deserialize;
use std::collections::HashSet;
use url::Url;

pub const DEFAULT_INSTANCE_NAME: &str = "default";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error(
        "found both a named sentry instance with name default and top level baseUrl or authToken config. Use only one style of config"
    )]
    ConflictingDefault,

    #[error(
        "found partial default sentry config. All (or none) of baseUrl and authToken must be provided"
    )]
    PartialDefault,

    #[error("duplicate sentry instance name: {0}")]
    DuplicateInstance(String),

    #[error("empty sentry instance name")]
    EmptyInstanceName,

    #[error("invalid baseUrl for sentry instance {name}: {reason}")]
    InvalidBaseUrl { name: String, reason: String },

    #[error("authToken of sentry instance {0} is not a valid header value")]
    InvalidAuthToken(String),
}

/// A named instance as it appears in the `instances` list.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawInstanceConfig {
    pub name: String,
    pub base_url: String,
    pub auth_token: String,
    pub organization: Option<String>,
}

/// The `sentry` configuration section, before validation.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawSentryConfig {
    #[serde(default)]
    pub instances: Vec<RawInstanceConfig>,
    pub base_url: Option<String>,
    pub auth_token: Option<String>,
    /// Organization of the unnamed default instance
    pub organization: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstanceConfig {
    pub name: String,
    pub base_url: String,
    pub auth_token: String,
    pub organization: Option<String>,
}

impl InstanceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyInstanceName);
        }

        let url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            name: self.name.clone(),
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl {
                name: self.name.clone(),
                reason: "not a hierarchical URL".into(),
            });
        }

        HeaderValue::from_str(&format!("Bearer {}", self.auth_token))
            .map_err(|_| ConfigError::InvalidAuthToken(self.name.clone()))?;

        Ok(())
    }
}

impl From<&RawInstanceConfig> for InstanceConfig {
    fn from(raw: &RawInstanceConfig) -> Self {
        InstanceConfig {
            name: raw.name.clone(),
            base_url: raw.base_url.clone(),
            auth_token: raw.auth_token.clone(),
            organization: raw.organization.clone(),
        }
    }
}

/// All configured Sentry instances, in configuration order.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceRegistry {
    instances: Vec<InstanceConfig>,
}

impl InstanceRegistry {
    pub fn from_config(config: &RawSentryConfig) -> Result<Self, ConfigError> {
        let mut instances: Vec<InstanceConfig> =
            config.instances.iter().map(InstanceConfig::from).collect();

        let has_named_default = instances.iter().any(|i| i.name == DEFAULT_INSTANCE_NAME);

        // Empty strings are treated the same as missing values
        let base_url = config.base_url.as_deref().filter(|s| !s.is_empty());
        let auth_token = config.auth_token.as_deref().filter(|s| !s.is_empty());

        if has_named_default && (base_url.is_some() || auth_token.is_some()) {
            return Err(ConfigError::ConflictingDefault);
        }

        match (base_url, auth_token) {
            (Some(base_url), Some(auth_token)) => instances.push(InstanceConfig {
                name: DEFAULT_INSTANCE_NAME.into(),
                base_url: base_url.into(),
                auth_token: auth_token.into(),
                organization: config.organization.clone(),
            }),
            (None, None) => {}
            _ => return Err(ConfigError::PartialDefault),
        }

        let mut names = HashSet::new();
        for instance in &instances {
            instance.validate()?;
            if !names.insert(instance.name.as_str()) {
                return Err(ConfigError::DuplicateInstance(instance.name.clone()));
            }
        }

        Ok(InstanceRegistry { instances })
    }

    /// Returns the instance with the given name, or the `default` instance
    /// when no name (or an empty one) is given.
    pub fn get_instance_config(&self, name: Option<&str>) -> Result<&InstanceConfig, SentryError> {
        match name {
            None | Some("") | Some(DEFAULT_INSTANCE_NAME) => self
                .find(DEFAULT_INSTANCE_NAME)
                .ok_or(SentryError::NoDefaultInstance),
            Some(name) => self
                .find(name)
                .ok_or_else(|| SentryError::InstanceNotFound(name.to_string())),
        }
    }

    pub fn instances(&self) -> &[InstanceConfig] {
        &self.instances
    }

    fn find(&self, name: &str) -> Option<&InstanceConfig> {
        self.instances.iter().find(|i| i.name == name)
    }
}
