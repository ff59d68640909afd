pub mod auth;
pub mod http;
pub mod metrics_defs;
pub mod plugin;
