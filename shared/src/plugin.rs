//! Plugin registration
//!
//! Plugins don't know how the backend is assembled. They are handed a
//! [`PluginRegistrar`] and report the routers they provide; the [`PluginHost`]
//! decides where those routers are mounted.
//!
//! ```text
//! PluginHost
//!   ├─ /health
//!   └─ /api/{plugin_id}/...  (routers registered by the plugin)
//! ```

use axum::Router;
use axum::routing::get;
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PluginHostError {
    #[error("plugin id cannot be empty")]
    EmptyPluginId,
    #[error("plugin {0} is already registered")]
    DuplicatePlugin(String),
}

/// Capability handed to a plugin while it registers itself.
pub trait PluginRegistrar {
    fn register_router(&mut self, router: Router);
}

pub trait BackendPlugin: Send {
    /// Identifier the plugin is mounted under, e.g. `sentry` → `/api/sentry`.
    fn id(&self) -> &str;

    fn register(self: Box<Self>, registrar: &mut dyn PluginRegistrar);
}

struct PluginRoutes {
    router: Router,
}

impl PluginRegistrar for PluginRoutes {
    fn register_router(&mut self, router: Router) {
        let current = std::mem::take(&mut self.router);
        self.router = current.merge(router);
    }
}

#[derive(Default)]
pub struct PluginHost {
    plugin_ids: HashSet<String>,
    router: Router,
}

impl PluginHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<P>(&mut self, plugin: P) -> Result<(), PluginHostError>
    where
        P: BackendPlugin + 'static,
    {
        self.add_boxed(Box::new(plugin))
    }

    pub fn add_boxed(&mut self, plugin: Box<dyn BackendPlugin>) -> Result<(), PluginHostError> {
        let id = plugin.id().to_string();
        if id.is_empty() {
            return Err(PluginHostError::EmptyPluginId);
        }
        if !self.plugin_ids.insert(id.clone()) {
            return Err(PluginHostError::DuplicatePlugin(id));
        }

        let mut routes = PluginRoutes {
            router: Router::new(),
        };
        plugin.register(&mut routes);

        tracing::info!(plugin = %id, "Registered plugin");

        let current = std::mem::take(&mut self.router);
        self.router = current.nest(&format!("/api/{id}"), routes.router);
        Ok(())
    }

    pub fn plugin_ids(&self) -> impl Iterator<Item = &str> {
        self.plugin_ids.iter().map(String::as_str)
    }

    /// Consumes the host and returns the router serving every plugin.
    pub fn into_router(self) -> Router {
        self.router.route("/health", get(|| async { "ok\n" }))
    }
}
