//! Metrics definitions for the sentry plugin.

use shared::metrics_defs::{MetricDef, MetricType};

pub const ISSUES_REQUESTS: MetricDef = MetricDef {
    name: "sentry.issues.requests",
    metric_type: MetricType::Counter,
    description: "Number of issues requests handled, tagged by response status",
};

pub const ISSUES_EMPTY_PROJECT: MetricDef = MetricDef {
    name: "sentry.issues.empty_project",
    metric_type: MetricType::Counter,
    description: "Number of issues requests answered without a project slug",
};

pub const UPSTREAM_DURATION: MetricDef = MetricDef {
    name: "sentry.upstream.duration",
    metric_type: MetricType::Histogram,
    description: "Time taken by the sentry issues API in seconds",
};

pub const UPSTREAM_ERRORS: MetricDef = MetricDef {
    name: "sentry.upstream.errors",
    metric_type: MetricType::Counter,
    description: "Number of failed calls to the sentry issues API",
};

pub const ALL_METRICS: &[MetricDef] = &[
    ISSUES_REQUESTS,
    ISSUES_EMPTY_PROJECT,
    UPSTREAM_DURATION,
    UPSTREAM_ERRORS,
];
